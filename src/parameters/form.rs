use super::argument::collect_arguments;
use super::{parse_descriptors, ArgumentValue, ToolParameterDescriptor};
use crate::errors::{SchemaError, ValidationError};

/// The editable parameter values of one tool, paired with its descriptors.
///
/// A form is built fresh each time a tool is selected and starts out holding
/// each parameter's default value.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolForm {
    tool_name: String,
    descriptors: Vec<ToolParameterDescriptor>,
    values: Vec<ArgumentValue>,
}

impl ToolForm {
    pub fn new(tool_name: &str, descriptors: Vec<ToolParameterDescriptor>) -> ToolForm {
        let values = descriptors.iter().map(ArgumentValue::initial).collect();
        ToolForm {
            tool_name: tool_name.to_string(),
            descriptors,
            values,
        }
    }

    pub fn from_json(tool_name: &str, json_text: &str) -> Result<ToolForm, SchemaError> {
        Ok(ToolForm::new(tool_name, parse_descriptors(json_text)?))
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn descriptors(&self) -> &[ToolParameterDescriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ToolParameterDescriptor, &ArgumentValue)> {
        self.descriptors.iter().zip(self.values.iter())
    }

    /// Index of the parameter named by `key` (any flag spelling, dashes optional).
    pub fn position(&self, key: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.matches_key(key))
    }

    pub fn value(&self, key: &str) -> Option<&ArgumentValue> {
        self.position(key).map(|i| &self.values[i])
    }

    /// Replaces the value of the parameter named by `key`. Returns false if
    /// the tool has no such parameter.
    pub fn set<V: Into<ArgumentValue>>(&mut self, key: &str, value: V) -> bool {
        match self.position(key) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// Restores every parameter to its default.
    pub fn reset(&mut self) {
        self.values = self.descriptors.iter().map(ArgumentValue::initial).collect();
    }

    /// The validated argument tokens, or every problem found.
    pub fn arguments(&self) -> Result<Vec<String>, Vec<ValidationError>> {
        collect_arguments(self.descriptors.iter().zip(self.values.iter().map(Some)))
    }
}
