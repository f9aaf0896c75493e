pub mod argument;
pub mod form;

pub use self::argument::{build_argument, build_arguments, ArgumentValue, ParameterValues};
pub use self::form::ToolForm;

use crate::errors::SchemaError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Describes one parameter of one tool, as emitted by `--toolparameters`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolParameterDescriptor {
    pub name: String,
    pub flags: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub parameter_type: ParameterType,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub default_value: Option<String>,
    pub optional: bool,
}

impl ToolParameterDescriptor {
    /// The flag used when emitting arguments; always the last spelling.
    pub fn canonical_flag(&self) -> &str {
        self.flags.last().map(String::as_str).unwrap_or("")
    }

    /// True if `key` names this parameter, either as one of its flags or
    /// as a flag with the leading dashes removed (`input` for `--input`).
    pub fn matches_key(&self, key: &str) -> bool {
        let key = normalize_key(key);
        !key.is_empty() && self.flags.iter().any(|f| normalize_key(f) == key)
    }

    pub fn file_type(&self) -> Option<&ParameterFileType> {
        match &self.parameter_type {
            ParameterType::ExistingFile(ft)
            | ParameterType::ExistingFileOrFloat(ft)
            | ParameterType::NewFile(ft)
            | ParameterType::FileList(ft) => Some(ft),
            _ => None,
        }
    }

    /// Help text for a parameter label.
    pub fn tooltip(&self) -> String {
        let param_nm = if !self.optional {
            self.name.clone()
        } else {
            format!("{} [Optional]", self.name)
        };
        match self.file_type() {
            Some(ParameterFileType::Vector(geometry_type))
            | Some(ParameterFileType::RasterAndVector(geometry_type)) => format!(
                "{}:  {} (Geometry Type={:?})",
                param_nm, self.description, geometry_type
            ),
            _ => format!("{}:  {}", param_nm, self.description),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ParameterType {
    Boolean,
    String,
    StringList,
    Integer,
    Float,
    Double,
    VectorAttributeField(AttributeType, String),
    StringOrNumber,
    ExistingFile(ParameterFileType),
    ExistingFileOrFloat(ParameterFileType),
    NewFile(ParameterFileType),
    FileList(ParameterFileType),
    Directory,
    OptionList(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ParameterFileType {
    Any,
    Lidar,
    Raster,
    RasterAndVector(VectorGeometryType),
    Vector(VectorGeometryType),
    Text,
    Html,
    Csv,
    Dat,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum VectorGeometryType {
    Any,
    Point,
    Line,
    Polygon,
    LineOrPolygon,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum AttributeType {
    Any,
    Integer,
    Float,
    Number,
    Text,
    Boolean,
    Date,
}

/// Parses the parameter descriptors of a tool. Accepts either the
/// `{"parameters": [...]}` document WhiteboxTools prints or a bare array.
pub fn parse_descriptors(json_text: &str) -> Result<Vec<ToolParameterDescriptor>, SchemaError> {
    let mut document: Value = serde_json::from_str(json_text)?;
    let parameters = if document.get("parameters").is_some() {
        document["parameters"].take()
    } else {
        document
    };
    let descriptors: Vec<ToolParameterDescriptor> = serde_json::from_value(parameters)?;
    if let Some(d) = descriptors.iter().find(|d| d.flags.is_empty()) {
        return Err(SchemaError::NoFlags {
            name: d.name.clone(),
        });
    }
    Ok(descriptors)
}

pub(crate) fn normalize_key(key: &str) -> String {
    key.trim().trim_start_matches('-').to_string()
}

// Defaults are usually strings, but numbers and booleans turn up too.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "default_value must be a scalar, found {}",
            other
        ))),
    }
}
