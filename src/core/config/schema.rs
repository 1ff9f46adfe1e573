//! core::config::schema
//!
//! Typed views over configuration sections.
//!
//! # Translator settings
//!
//! ```toml
//! [translator]
//! root = "translator"
//! functions_dir = "functions"
//! function_prefix = "func"
//! ```
//!
//! # Linking table
//!
//! Each alias names a function path and optional default arguments:
//!
//! ```toml
//! [links.exp]
//! function = "mosfire.expose"
//! arguments = { exptime = 10, coadds = 1 }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::OperationPath;

/// Settings for discovery and the namespace root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorSettings {
    /// Label of the command tree root.
    pub root: String,

    /// Directory scanned for function files.
    pub functions_dir: PathBuf,

    /// File name prefix of function files.
    pub function_prefix: String,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            root: "translator".to_string(),
            functions_dir: PathBuf::from("functions"),
            function_prefix: "func".to_string(),
        }
    }
}

impl TranslatorSettings {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the root label is not a valid
    /// path segment or the prefix is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if OperationPath::new([self.root.as_str()]).is_err() {
            return Err(ConfigError::InvalidValue {
                section: "translator".to_string(),
                key: "root".to_string(),
                message: format!("'{}' is not a valid path segment", self.root),
            });
        }
        if self.function_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                section: "translator".to_string(),
                key: "function_prefix".to_string(),
                message: "prefix cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// One entry of the linking table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LinkEntry {
    /// Dotted function path the alias expands to.
    pub function: String,

    /// Default arguments; explicit tokens override them.
    #[serde(default)]
    pub arguments: toml::Table,
}

impl LinkEntry {
    /// Validate the entry.
    pub fn validate(&self, alias: &str) -> Result<(), ConfigError> {
        self.path().map(|_| ()).map_err(|e| ConfigError::InvalidValue {
            section: format!("links.{}", alias),
            key: "function".to_string(),
            message: e.to_string(),
        })
    }

    /// The target path.
    pub fn path(&self) -> Result<OperationPath, crate::core::types::TypeError> {
        OperationPath::parse(&self.function)
    }

    /// Default arguments as JSON values.
    pub fn json_arguments(&self) -> serde_json::Map<String, serde_json::Value> {
        self.arguments
            .iter()
            .map(|(k, v)| (k.clone(), toml_to_json(v)))
            .collect()
    }
}

/// Convert a TOML value to the JSON value model used for arguments.
pub fn toml_to_json(value: &toml::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use serde_json::json;

    #[test]
    fn translator_section_overrides_defaults() {
        let config = Config::parse_str(
            r#"
            [translator]
            root = "kpf"
            function_prefix = "tm_"
            "#,
        )
        .unwrap();
        let settings = config.translator().unwrap();
        assert_eq!(settings.root, "kpf");
        assert_eq!(settings.function_prefix, "tm_");
        assert_eq!(settings.functions_dir, PathBuf::from("functions"));
    }

    #[test]
    fn unknown_translator_fields_rejected() {
        let config = Config::parse_str("[translator]\nbogus = 1\n").unwrap();
        assert!(config.translator().is_err());
    }

    #[test]
    fn invalid_root_rejected() {
        let config = Config::parse_str("[translator]\nroot = \"a.b\"\n").unwrap();
        assert!(matches!(
            config.translator(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn links_parse() {
        let config = Config::parse_str(
            r#"
            [links.exp]
            function = "mosfire.expose"
            arguments = { exptime = 10, object = "M31", nested = { a = [1, 2] } }

            [links.go]
            function = "kpf.go"
            "#,
        )
        .unwrap();
        let links = config.links().unwrap();
        assert_eq!(links.len(), 2);

        let exp = &links["exp"];
        assert_eq!(exp.path().unwrap().to_string(), "mosfire.expose");
        let args = exp.json_arguments();
        assert_eq!(args["exptime"], json!(10));
        assert_eq!(args["object"], json!("M31"));
        assert_eq!(args["nested"], json!({"a": [1, 2]}));
        assert!(links["go"].arguments.is_empty());
    }

    #[test]
    fn link_with_bad_function_rejected() {
        let config = Config::parse_str("[links.bad]\nfunction = \"a..b\"\n").unwrap();
        assert!(config.links().is_err());
    }

    #[test]
    fn no_links_section_is_empty() {
        assert!(Config::new().links().unwrap().is_empty());
    }
}
