/*
This code is part of the WhiteboxTools geospatial analysis library.
Created: 16/10/2026
Last Modified: 16/10/2026
License: MIT
*/

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The parameter JSON returned by `--toolparameters` could not be understood.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("invalid parameter JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parameter '{name}' declares no flags")]
    NoFlags { name: String },
}

/// A single problem with a user-supplied parameter value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unspecified non-optional parameter {name} ({flag}).")]
    MissingRequiredParameter { flag: String, name: String },

    #[error("Error parsing parameter {name} ({flag}): '{value}' is not a valid {expected}.")]
    TypeCoercion {
        flag: String,
        name: String,
        value: String,
        expected: &'static str,
    },
}

impl ValidationError {
    /// The canonical flag of the offending parameter.
    pub fn flag(&self) -> &str {
        match self {
            ValidationError::MissingRequiredParameter { flag, .. } => flag,
            ValidationError::TypeCoercion { flag, .. } => flag,
        }
    }
}

/// Every validation problem found in one pass over a tool's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("could not execute the WhiteboxTools binary '{}': {source}", exe.display())]
    ProcessSpawn {
        exe: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading tool output: {0}")]
    ProcessRead(#[source] io::Error),

    #[error("error reading settings file '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<Vec<ValidationError>> for RunnerError {
    fn from(errors: Vec<ValidationError>) -> Self {
        RunnerError::Validation(ValidationErrors(errors))
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
