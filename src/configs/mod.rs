use crate::errors::RunnerError;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";

/// Environment settings for tool runs. Backed by an optional settings.json file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configs {
    #[serde(deserialize_with = "bool_or_string")]
    pub verbose_mode: bool,
    pub working_directory: String,
    pub compress_rasters: bool,
    pub max_procs: isize,
    /// Echo the assembled command line into the tool output before each run.
    pub output_command: bool,
}

impl Default for Configs {
    fn default() -> Configs {
        Configs {
            verbose_mode: true,
            working_directory: String::new(),
            compress_rasters: false,
            max_procs: -1,
            output_command: false,
        }
    }
}

impl Configs {
    pub fn new() -> Configs {
        Configs::default()
    }

    /// Parses settings JSON. Keys that are absent keep their defaults.
    pub fn from_json(contents: &str) -> Result<Configs, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Reads `settings.json` from `dir`, failing if it is missing or invalid.
    pub fn read<P: AsRef<Path>>(dir: P) -> crate::errors::Result<Configs> {
        let path = dir.as_ref().join(SETTINGS_FILE);
        let contents = fs::read_to_string(&path).map_err(|source| RunnerError::Config {
            path: path.clone(),
            source,
        })?;
        Configs::from_json(&contents).map_err(|e| RunnerError::Config {
            path,
            source: Error::new(ErrorKind::InvalidData, e),
        })
    }

    /// Reads `settings.json` from `dir`. A missing or unparsable file yields the defaults.
    pub fn load<P: AsRef<Path>>(dir: P) -> Configs {
        match Configs::read(dir) {
            Ok(configs) => configs,
            Err(RunnerError::Config { path, source }) if source.kind() == ErrorKind::NotFound => {
                debug!("No settings file at {}", path.display());
                Configs::default()
            }
            Err(e) => {
                warn!("{}; using default settings", e);
                Configs::default()
            }
        }
    }
}

/// Reads the settings file from the current directory.
pub fn get_configs() -> Result<Configs, Error> {
    let dir = std::env::current_dir()?;
    Ok(Configs::load(dir))
}

/// The WhiteboxTools executable expected to sit beside the running program.
pub fn default_exe_path() -> Result<PathBuf, Error> {
    let ext = if cfg!(target_os = "windows") { ".exe" } else { "" };
    let mut dir = std::env::current_exe()?;
    if !dir.pop() {
        return Err(Error::new(ErrorKind::NotFound, "No exe path found."));
    }
    Ok(dir.join(format!("whitebox_tools{}", ext)))
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid verbose_mode value '{}'",
                other
            ))),
        },
    }
}
