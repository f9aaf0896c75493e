use super::{normalize_key, ParameterType, ToolParameterDescriptor};
use crate::errors::ValidationError;
use std::collections::HashMap;
use std::fmt;

/// The live, editable value of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Text(String),
    Flag(bool),
    /// The two independent fields of an `ExistingFileOrFloat` parameter.
    FileOrFloat { file: String, number: String },
    FileList(Vec<String>),
    Choice(Option<String>),
}

impl ArgumentValue {
    /// The value a freshly opened tool starts with, taken from the descriptor's default.
    pub fn initial(descriptor: &ToolParameterDescriptor) -> ArgumentValue {
        let default_value = descriptor.default_value.clone();
        match &descriptor.parameter_type {
            ParameterType::Boolean => ArgumentValue::Flag(default_flag(default_value.as_deref())),
            ParameterType::ExistingFileOrFloat(_) => {
                let s = default_value.unwrap_or_default();
                if s.trim().parse::<f64>().is_ok() {
                    ArgumentValue::FileOrFloat {
                        file: String::new(),
                        number: s.trim().to_string(),
                    }
                } else {
                    ArgumentValue::FileOrFloat {
                        file: s,
                        number: String::new(),
                    }
                }
            }
            ParameterType::FileList(_) => {
                ArgumentValue::FileList(split_file_list(&default_value.unwrap_or_default()))
            }
            ParameterType::OptionList(choices) => ArgumentValue::Choice(
                default_value
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| choices.first().cloned()),
            ),
            _ => ArgumentValue::Text(default_value.unwrap_or_default()),
        }
    }

    /// True if nothing has been entered.
    pub fn is_blank(&self) -> bool {
        match self {
            ArgumentValue::Text(s) => s.trim().is_empty(),
            ArgumentValue::Flag(_) => false,
            ArgumentValue::FileOrFloat { file, number } => {
                file.trim().is_empty() && number.trim().is_empty()
            }
            ArgumentValue::FileList(files) => files.iter().all(|f| f.trim().is_empty()),
            ArgumentValue::Choice(c) => c.as_deref().map_or(true, |s| s.trim().is_empty()),
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Text(s) => write!(f, "{}", s),
            ArgumentValue::Flag(b) => write!(f, "{}", b),
            ArgumentValue::FileOrFloat { file, number } => {
                if !file.trim().is_empty() {
                    write!(f, "{}", file)
                } else {
                    write!(f, "{}", number)
                }
            }
            ArgumentValue::FileList(files) => write!(f, "{}", files.join(";")),
            ArgumentValue::Choice(c) => write!(f, "{}", c.as_deref().unwrap_or("")),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(s: &str) -> Self {
        ArgumentValue::Text(s.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(s: String) -> Self {
        ArgumentValue::Text(s)
    }
}

impl From<bool> for ArgumentValue {
    fn from(b: bool) -> Self {
        ArgumentValue::Flag(b)
    }
}

impl From<Vec<String>> for ArgumentValue {
    fn from(files: Vec<String>) -> Self {
        ArgumentValue::FileList(files)
    }
}

/// User-supplied values keyed by parameter flag. Keys may be any flag spelling,
/// with or without the leading dashes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    values: HashMap<String, ArgumentValue>,
}

impl ParameterValues {
    pub fn new() -> ParameterValues {
        ParameterValues::default()
    }

    pub fn insert<K: AsRef<str>, V: Into<ArgumentValue>>(&mut self, key: K, value: V) -> &mut Self {
        self.values.insert(normalize_key(key.as_ref()), value.into());
        self
    }

    pub fn get_for(&self, descriptor: &ToolParameterDescriptor) -> Option<&ArgumentValue> {
        descriptor
            .flags
            .iter()
            .rev()
            .find_map(|flag| self.values.get(&normalize_key(flag)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<ArgumentValue>> FromIterator<(K, V)> for ParameterValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = ParameterValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

/// Formats one parameter as a command-line token.
///
/// Returns `Ok(None)` when nothing should be emitted: a false boolean, or an
/// absent value for an optional parameter. An absent value for a required
/// parameter is a `MissingRequiredParameter` error.
pub fn build_argument(
    descriptor: &ToolParameterDescriptor,
    value: Option<&ArgumentValue>,
) -> Result<Option<String>, ValidationError> {
    let token = match value {
        Some(v) if !v.is_blank() => format_value(descriptor, v)?,
        _ => None,
    };

    match token {
        Some(t) => Ok(Some(t)),
        // booleans are never missing
        None if descriptor.optional || descriptor.parameter_type == ParameterType::Boolean => Ok(None),
        None => Err(ValidationError::MissingRequiredParameter {
            flag: descriptor.canonical_flag().to_string(),
            name: descriptor.name.clone(),
        }),
    }
}

/// Builds the argument tokens for every descriptor, in descriptor order.
/// All problems are collected before returning, so the caller sees each one.
pub fn build_arguments(
    descriptors: &[ToolParameterDescriptor],
    values: &ParameterValues,
) -> Result<Vec<String>, Vec<ValidationError>> {
    collect_arguments(descriptors.iter().map(|d| (d, values.get_for(d))))
}

pub(crate) fn collect_arguments<'a, I>(pairs: I) -> Result<Vec<String>, Vec<ValidationError>>
where
    I: Iterator<Item = (&'a ToolParameterDescriptor, Option<&'a ArgumentValue>)>,
{
    let mut args = vec![];
    let mut errors = vec![];
    for (descriptor, value) in pairs {
        match build_argument(descriptor, value) {
            Ok(Some(token)) => args.push(token),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(args)
    } else {
        Err(errors)
    }
}

fn format_value(
    descriptor: &ToolParameterDescriptor,
    value: &ArgumentValue,
) -> Result<Option<String>, ValidationError> {
    let flag = descriptor.canonical_flag();
    let token = match &descriptor.parameter_type {
        ParameterType::Boolean => {
            if as_flag(descriptor, value)? {
                Some(flag.to_string())
            } else {
                None
            }
        }
        ParameterType::Integer => {
            let s = as_text(descriptor, value, "integer")?;
            let s = s.trim();
            if s.parse::<i64>().is_err() {
                return Err(coercion_error(descriptor, s, "integer"));
            }
            Some(format!("{}={}", flag, s))
        }
        ParameterType::Float | ParameterType::Double => {
            let s = as_text(descriptor, value, "number")?;
            let s = s.trim();
            if !is_number(s) {
                return Err(coercion_error(descriptor, s, "number"));
            }
            Some(format!("{}={}", flag, s))
        }
        ParameterType::String
        | ParameterType::StringOrNumber
        | ParameterType::StringList
        | ParameterType::VectorAttributeField(_, _) => {
            let s = as_text(descriptor, value, "text value")?;
            Some(format!("{}='{}'", flag, s))
        }
        ParameterType::ExistingFile(_) | ParameterType::NewFile(_) | ParameterType::Directory => {
            let s = as_text(descriptor, value, "file path")?;
            Some(format!("{}='{}'", flag, s.trim()))
        }
        ParameterType::ExistingFileOrFloat(_) => {
            let (file, number) = match value {
                ArgumentValue::FileOrFloat { file, number } => (file.trim(), number.trim()),
                ArgumentValue::Text(s) => {
                    let s = s.trim();
                    if is_number(s) {
                        ("", s)
                    } else {
                        (s, "")
                    }
                }
                other => return Err(coercion_error(descriptor, &other.to_string(), "file path or number")),
            };
            if !file.is_empty() {
                Some(format!("{}='{}'", flag, file))
            } else if !number.is_empty() {
                if !is_number(number) {
                    return Err(coercion_error(descriptor, number, "number"));
                }
                Some(format!("{}={}", flag, number))
            } else {
                None
            }
        }
        ParameterType::FileList(_) => {
            let files = match value {
                ArgumentValue::FileList(files) => files
                    .iter()
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect::<Vec<String>>(),
                ArgumentValue::Text(s) => split_file_list(s),
                other => return Err(coercion_error(descriptor, &other.to_string(), "list of files")),
            };
            if files.is_empty() {
                None
            } else {
                Some(format!("{}='{}'", flag, files.join(";")))
            }
        }
        ParameterType::OptionList(choices) => {
            let selected = match value {
                ArgumentValue::Choice(Some(s)) | ArgumentValue::Text(s) => s.trim(),
                ArgumentValue::Choice(None) => return Ok(None),
                other => return Err(coercion_error(descriptor, &other.to_string(), "listed option")),
            };
            if !choices.iter().any(|c| c == selected) {
                return Err(coercion_error(descriptor, selected, "listed option"));
            }
            Some(format!("{}='{}'", flag, selected))
        }
    };
    Ok(token)
}

fn as_text<'a>(
    descriptor: &ToolParameterDescriptor,
    value: &'a ArgumentValue,
    expected: &'static str,
) -> Result<&'a str, ValidationError> {
    match value {
        ArgumentValue::Text(s) => Ok(s.as_str()),
        ArgumentValue::Choice(Some(s)) => Ok(s.as_str()),
        other => Err(coercion_error(descriptor, &other.to_string(), expected)),
    }
}

fn as_flag(descriptor: &ToolParameterDescriptor, value: &ArgumentValue) -> Result<bool, ValidationError> {
    match value {
        ArgumentValue::Flag(b) => Ok(*b),
        ArgumentValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "" | "false" => Ok(false),
            "true" => Ok(true),
            _ => Err(coercion_error(descriptor, s, "boolean")),
        },
        other => Err(coercion_error(descriptor, &other.to_string(), "boolean")),
    }
}

fn coercion_error(descriptor: &ToolParameterDescriptor, value: &str, expected: &'static str) -> ValidationError {
    ValidationError::TypeCoercion {
        flag: descriptor.canonical_flag().to_string(),
        name: descriptor.name.clone(),
        value: value.to_string(),
        expected,
    }
}

// NaN and infinities parse as f64 but are not usable values.
fn is_number(s: &str) -> bool {
    s.parse::<f64>().map_or(false, |v| v.is_finite())
}

// A null or "false" default leaves a boolean unset; anything else sets it.
fn default_flag(default_value: Option<&str>) -> bool {
    match default_value {
        None => false,
        Some(s) => {
            let s = s.trim();
            !(s.is_empty() || s.eq_ignore_ascii_case("false"))
        }
    }
}

fn split_file_list(s: &str) -> Vec<String> {
    s.split(|c| c == ';' || c == '\n')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parameters::{parse_descriptors, ParameterFileType};

    fn descriptor(flags: &[&str], parameter_type: ParameterType, optional: bool) -> ToolParameterDescriptor {
        ToolParameterDescriptor {
            name: "Param".to_string(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
            description: String::new(),
            parameter_type,
            default_value: None,
            optional,
        }
    }

    #[test]
    fn test_boolean_emits_bare_flag() {
        for optional in [true, false] {
            let d = descriptor(&["-v", "--vlr"], ParameterType::Boolean, optional);
            assert_eq!(
                build_argument(&d, Some(&ArgumentValue::Flag(true))).unwrap(),
                Some("--vlr".to_string())
            );
            assert_eq!(build_argument(&d, Some(&ArgumentValue::Flag(false))).unwrap(), None);
            assert_eq!(build_argument(&d, None).unwrap(), None);
            assert_eq!(build_argument(&d, Some(&"TRUE".into())).unwrap(), Some("--vlr".to_string()));
        }
    }

    #[test]
    fn test_numeric_values() {
        let d = descriptor(&["--filter"], ParameterType::Integer, false);
        assert_eq!(
            build_argument(&d, Some(&" 11 ".into())).unwrap(),
            Some("--filter=11".to_string())
        );
        let d = descriptor(&["--zfactor"], ParameterType::Float, true);
        assert_eq!(
            build_argument(&d, Some(&"1.5".into())).unwrap(),
            Some("--zfactor=1.5".to_string())
        );
        let d = descriptor(&["--weight"], ParameterType::Double, true);
        assert_eq!(
            build_argument(&d, Some(&"-0.25".into())).unwrap(),
            Some("--weight=-0.25".to_string())
        );
    }

    #[test]
    fn test_non_numeric_values_are_coercion_errors() {
        for parameter_type in [ParameterType::Integer, ParameterType::Float, ParameterType::Double] {
            let d = descriptor(&["--n"], parameter_type, true);
            for bad in ["abc", "1,000", "12x"] {
                match build_argument(&d, Some(&bad.into())) {
                    Err(ValidationError::TypeCoercion { flag, value, .. }) => {
                        assert_eq!(flag, "--n");
                        assert_eq!(value, bad);
                    }
                    other => panic!("expected a coercion error, got {:?}", other),
                }
            }
        }
        let d = descriptor(&["--n"], ParameterType::Integer, true);
        assert!(build_argument(&d, Some(&"2.5".into())).is_err());
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let d = descriptor(&["--zfactor"], ParameterType::Float, true);
        for bad in ["NaN", "inf", "-infinity"] {
            assert!(matches!(
                build_argument(&d, Some(&bad.into())),
                Err(ValidationError::TypeCoercion { .. })
            ));
        }
        let d = descriptor(&["--input2"], ParameterType::ExistingFileOrFloat(ParameterFileType::Raster), false);
        let nan = ArgumentValue::FileOrFloat {
            file: String::new(),
            number: "nan".to_string(),
        };
        assert!(matches!(
            build_argument(&d, Some(&nan)),
            Err(ValidationError::TypeCoercion { .. })
        ));
    }

    #[test]
    fn test_boolean_text_is_validated() {
        let d = descriptor(&["--fill"], ParameterType::Boolean, false);
        assert_eq!(build_argument(&d, Some(&"false".into())).unwrap(), None);
        assert_eq!(build_argument(&d, Some(&"".into())).unwrap(), None);
        assert!(matches!(
            build_argument(&d, Some(&"maybe".into())),
            Err(ValidationError::TypeCoercion { .. })
        ));
    }

    #[test]
    fn test_strings_are_quoted_verbatim() {
        let d = descriptor(&["--statement"], ParameterType::String, false);
        assert_eq!(
            build_argument(&d, Some(&"value > 10 ".into())).unwrap(),
            Some("--statement='value > 10 '".to_string())
        );
        let d = descriptor(&["--file"], ParameterType::ExistingFile(ParameterFileType::Raster), false);
        assert_eq!(
            build_argument(&d, Some(&" dem.tif ".into())).unwrap(),
            Some("--file='dem.tif'".to_string())
        );
    }

    #[test]
    fn test_file_or_float() {
        let d = descriptor(&["--input2"], ParameterType::ExistingFileOrFloat(ParameterFileType::Raster), false);
        let file = ArgumentValue::FileOrFloat {
            file: "b.tif".to_string(),
            number: "3".to_string(),
        };
        assert_eq!(build_argument(&d, Some(&file)).unwrap(), Some("--input2='b.tif'".to_string()));
        let number = ArgumentValue::FileOrFloat {
            file: String::new(),
            number: " 3.5".to_string(),
        };
        assert_eq!(build_argument(&d, Some(&number)).unwrap(), Some("--input2=3.5".to_string()));
        let bad = ArgumentValue::FileOrFloat {
            file: String::new(),
            number: "x".to_string(),
        };
        assert!(matches!(
            build_argument(&d, Some(&bad)),
            Err(ValidationError::TypeCoercion { .. })
        ));
        let empty = ArgumentValue::FileOrFloat {
            file: String::new(),
            number: String::new(),
        };
        assert!(matches!(
            build_argument(&d, Some(&empty)),
            Err(ValidationError::MissingRequiredParameter { .. })
        ));
        assert_eq!(build_argument(&d, Some(&"42".into())).unwrap(), Some("--input2=42".to_string()));
    }

    #[test]
    fn test_file_list_is_semicolon_joined() {
        let d = descriptor(&["-i", "--inputs"], ParameterType::FileList(ParameterFileType::Raster), false);
        let files = ArgumentValue::FileList(vec!["a.tif".to_string(), " ".to_string(), "b.tif".to_string()]);
        assert_eq!(
            build_argument(&d, Some(&files)).unwrap(),
            Some("--inputs='a.tif;b.tif'".to_string())
        );
        assert_eq!(
            build_argument(&d, Some(&"a.tif\nb.tif\n".into())).unwrap(),
            Some("--inputs='a.tif;b.tif'".to_string())
        );
    }

    #[test]
    fn test_option_list() {
        let choices = vec!["degrees".to_string(), "percent".to_string()];
        let d = descriptor(&["--units"], ParameterType::OptionList(choices), false);
        assert_eq!(
            build_argument(&d, Some(&ArgumentValue::Choice(Some("percent".to_string())))).unwrap(),
            Some("--units='percent'".to_string())
        );
        assert!(matches!(
            build_argument(&d, Some(&"radians".into())),
            Err(ValidationError::TypeCoercion { .. })
        ));
        assert!(matches!(
            build_argument(&d, Some(&ArgumentValue::Choice(None))),
            Err(ValidationError::MissingRequiredParameter { .. })
        ));
    }

    #[test]
    fn test_initial_values_from_defaults() {
        let mut d = descriptor(&["--flag"], ParameterType::Boolean, true);
        assert_eq!(ArgumentValue::initial(&d), ArgumentValue::Flag(false));
        d.default_value = Some("false".to_string());
        assert_eq!(ArgumentValue::initial(&d), ArgumentValue::Flag(false));
        d.default_value = Some("true".to_string());
        assert_eq!(ArgumentValue::initial(&d), ArgumentValue::Flag(true));

        let mut d = descriptor(
            &["--units"],
            ParameterType::OptionList(vec!["a".to_string(), "b".to_string()]),
            true,
        );
        assert_eq!(ArgumentValue::initial(&d), ArgumentValue::Choice(Some("a".to_string())));
        d.default_value = Some("b".to_string());
        assert_eq!(ArgumentValue::initial(&d), ArgumentValue::Choice(Some("b".to_string())));

        let mut d = descriptor(&["--z"], ParameterType::ExistingFileOrFloat(ParameterFileType::Raster), true);
        d.default_value = Some("0.0".to_string());
        assert_eq!(
            ArgumentValue::initial(&d),
            ArgumentValue::FileOrFloat {
                file: String::new(),
                number: "0.0".to_string()
            }
        );
    }

    const SCENARIO: &str = r#"[
        {"name": "Input raster", "flags": ["-i", "--input"], "parameter_type": {"ExistingFile": "Raster"}, "optional": false},
        {"name": "Z factor", "flags": ["--zfactor"], "parameter_type": "Float", "optional": true, "default_value": null}
    ]"#;

    #[test]
    fn test_build_arguments_omits_unset_optional() {
        let descriptors = parse_descriptors(SCENARIO).unwrap();
        let values: ParameterValues = vec![("input", "dem.tif")].into_iter().collect();
        assert_eq!(
            build_arguments(&descriptors, &values).unwrap(),
            vec!["--input='dem.tif'".to_string()]
        );
    }

    #[test]
    fn test_build_arguments_reports_missing_input() {
        let descriptors = parse_descriptors(SCENARIO).unwrap();
        let errors = build_arguments(&descriptors, &ParameterValues::new()).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingRequiredParameter {
                flag: "--input".to_string(),
                name: "Input raster".to_string(),
            }]
        );
    }

    #[test]
    fn test_build_arguments_collects_every_error() {
        let json = r#"[
            {"name": "A", "flags": ["--a"], "parameter_type": "String", "optional": false},
            {"name": "B", "flags": ["--b"], "parameter_type": "Integer", "optional": true},
            {"name": "C", "flags": ["--c"], "parameter_type": {"NewFile": "Raster"}, "optional": false},
            {"name": "D", "flags": ["--d"], "parameter_type": "Boolean", "optional": false}
        ]"#;
        let descriptors = parse_descriptors(json).unwrap();
        let mut values = ParameterValues::new();
        values.insert("--b", "seven");
        let errors = build_arguments(&descriptors, &values).unwrap_err();
        let flags: Vec<&str> = errors.iter().map(|e| e.flag()).collect();
        assert_eq!(flags, vec!["--a", "--b", "--c"]);
        assert!(matches!(errors[1], ValidationError::TypeCoercion { .. }));
    }

    #[test]
    fn test_argument_order_follows_descriptors() {
        let json = r#"[
            {"name": "Input", "flags": ["--input"], "parameter_type": {"ExistingFile": "Raster"}, "optional": false},
            {"name": "Output", "flags": ["--output"], "parameter_type": {"NewFile": "Raster"}, "optional": false},
            {"name": "Filter", "flags": ["--filter"], "parameter_type": "Integer", "optional": true},
            {"name": "Fill", "flags": ["--fill"], "parameter_type": "Boolean", "optional": true}
        ]"#;
        let descriptors = parse_descriptors(json).unwrap();
        let mut values = ParameterValues::new();
        values
            .insert("fill", true)
            .insert("filter", "5")
            .insert("output", "out.tif")
            .insert("input", "in.tif");
        assert_eq!(
            build_arguments(&descriptors, &values).unwrap(),
            vec!["--input='in.tif'", "--output='out.tif'", "--filter=5", "--fill"]
        );
    }
}
