//! Options for inferring a schema from lines of text.
use serde::Deserialize;

use crate::converter::split_missing_values;
use crate::dtype::Names;
use crate::errors::Result;
use crate::names::ValidatorOptions;
use crate::splitter::SplitterOptions;

/// Whether the first record is a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// Treat the first record as a header if it doesn't fit the types
    /// inferred from the remaining records.
    #[default]
    Auto,
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    pub splitter: SplitterOptions,
    pub validator: ValidatorOptions,
    /// Field names, taking precedence over a header.
    pub names: Option<Names>,
    /// Template for synthesized field names.
    pub default_format: String,
    /// Tokens treated as missing in every column. Accepts a list or a comma
    /// separated string.
    #[serde(deserialize_with = "deserialize_missing_values")]
    pub missing_values: Vec<String>,
    pub has_header: HeaderMode,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        InferenceOptions {
            splitter: SplitterOptions::default(),
            validator: ValidatorOptions::default(),
            names: None,
            default_format: "f%i".to_string(),
            missing_values: Vec::new(),
            has_header: HeaderMode::Auto,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MissingValuesConfig {
    Delimited(String),
    List(Vec<String>),
}

fn deserialize_missing_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match MissingValuesConfig::deserialize(deserializer)? {
        MissingValuesConfig::Delimited(s) => split_missing_values(&s),
        MissingValuesConfig::List(values) => values,
    })
}

impl InferenceOptions {
    /// Load options from json. Missing keys use their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IoToolsError;
    use crate::names::CaseSensitivity;
    use crate::splitter::Delimiter;

    #[test]
    fn from_json_empty() {
        let opts = InferenceOptions::from_json("{}").unwrap();
        assert_eq!(InferenceOptions::default(), opts);
    }

    #[test]
    fn from_json_full() {
        let opts = InferenceOptions::from_json(
            r#"{
                "splitter": {"delimiter": ",", "comments": null},
                "validator": {"case_sensitivity": "upper", "excludelist": ["id"]},
                "names": "a, b",
                "default_format": "col_%02i",
                "missing_values": ["N/A", "-"],
                "has_header": "present"
            }"#,
        )
        .unwrap();

        assert_eq!(Delimiter::Text(",".to_string()), opts.splitter.delimiter);
        assert_eq!(None, opts.splitter.comments);
        assert!(opts.splitter.autostrip);
        assert_eq!(CaseSensitivity::Upper, opts.validator.case_sensitivity);
        assert_eq!(vec!["id".to_string()], opts.validator.excludelist);
        assert_eq!(Some('_'), opts.validator.replace_space);
        assert_eq!(Some(Names::Delimited("a, b".to_string())), opts.names);
        assert_eq!("col_%02i", opts.default_format);
        assert_eq!(vec!["N/A".to_string(), "-".to_string()], opts.missing_values);
        assert_eq!(HeaderMode::Present, opts.has_header);
    }

    #[test]
    fn from_json_names_list() {
        let opts = InferenceOptions::from_json(r#"{"names": ["x", "y"]}"#).unwrap();
        assert_eq!(
            Some(Names::List(vec!["x".to_string(), "y".to_string()])),
            opts.names
        );
    }

    #[test]
    fn from_json_missing_values_string() {
        let opts = InferenceOptions::from_json(r#"{"missing_values": "N/A,-"}"#).unwrap();
        assert_eq!(vec!["N/A".to_string(), "-".to_string()], opts.missing_values);
    }

    #[test]
    fn from_json_invalid() {
        let got = InferenceOptions::from_json(r#"{"has_header": "maybe"}"#);
        assert!(matches!(got, Err(IoToolsError::Json(_))), "got: {got:?}");
    }
}
