//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`OperationPath`] - Validated, dot-separated identity of an operation
//! - [`ArgumentSet`] - Parameter name to value mapping handed to every phase
//!
//! # Validation
//!
//! Operation paths enforce validity at construction time, so the command
//! tree and the registry never see empty or ambiguous segments.
//!
//! # Examples
//!
//! ```
//! use translator_module::core::types::{ArgumentSet, OperationPath};
//!
//! let path = OperationPath::parse("mosfire.expose").unwrap();
//! assert_eq!(path.segments(), ["mosfire", "expose"]);
//! assert_eq!(path.to_string(), "mosfire.expose");
//!
//! assert!(OperationPath::parse("mosfire..expose").is_err());
//!
//! let mut args = ArgumentSet::new();
//! args.insert("exptime", 10.0);
//! assert_eq!(args.f64_arg("exptime").unwrap(), 10.0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("operation path cannot be empty")]
    EmptyPath,

    #[error("invalid path segment '{0}'")]
    InvalidSegment(String),
}

/// Errors from reading typed values out of an [`ArgumentSet`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgsError {
    /// A required argument is absent (or null).
    #[error("{0} argument not defined")]
    Missing(String),

    /// The argument exists but has an unusable shape.
    #[error("argument '{key}' must be {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
    },
}

/// The identity of an operation: an ordered, non-empty list of segments.
///
/// Segments cannot be empty and cannot contain `.`, `/` or whitespace, which
/// keeps the dotted display form unambiguous for re-dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationPath(Vec<String>);

impl OperationPath {
    /// Create a path from individual segments.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::EmptyPath` for zero segments and
    /// `TypeError::InvalidSegment` for any malformed segment.
    pub fn new<I, S>(segments: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(TypeError::EmptyPath);
        }
        for segment in &segments {
            Self::validate_segment(segment)?;
        }
        Ok(Self(segments))
    }

    /// Parse a dotted path such as `instrument.mosfire.expose`.
    pub fn parse(dotted: &str) -> Result<Self, TypeError> {
        if dotted.is_empty() {
            return Err(TypeError::EmptyPath);
        }
        Self::new(dotted.split('.'))
    }

    fn validate_segment(segment: &str) -> Result<(), TypeError> {
        if segment.is_empty()
            || segment.contains('.')
            || segment.contains('/')
            || segment.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(TypeError::InvalidSegment(segment.to_string()));
        }
        Ok(())
    }

    /// The segments, root-most first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The final segment (the operation's own name).
    pub fn name(&self) -> &str {
        // Construction guarantees at least one segment.
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OperationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl TryFrom<String> for OperationPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OperationPath> for String {
    fn from(path: OperationPath) -> Self {
        path.to_string()
    }
}

/// Mapping from parameter name to a structurally arbitrary value.
///
/// Keys are kept sorted, so iteration order, display and fingerprints are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentSet(Map<String, Value>);

impl ArgumentSet {
    /// Create an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge `other` into this set; keys in `other` overwrite existing ones.
    pub fn merge(&mut self, other: ArgumentSet) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Merge every entry of a JSON object, overwriting existing keys.
    pub fn merge_map(&mut self, other: &Map<String, Value>) {
        for (key, value) in other {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Get a value that must be present and non-null.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError::Missing` naming the key.
    pub fn require(&self, key: &str) -> Result<&Value, ArgsError> {
        match self.0.get(key) {
            Some(Value::Null) | None => Err(ArgsError::Missing(key.to_string())),
            Some(value) => Ok(value),
        }
    }

    /// Get a required string argument.
    pub fn str_arg(&self, key: &str) -> Result<&str, ArgsError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| ArgsError::WrongType {
                key: key.to_string(),
                expected: "a string",
            })
    }

    /// Get a required numeric argument. Numeric strings are accepted.
    pub fn f64_arg(&self, key: &str) -> Result<f64, ArgsError> {
        let value = self.require(key)?;
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        number.ok_or_else(|| ArgsError::WrongType {
            key: key.to_string(),
            expected: "a number",
        })
    }

    /// Get a required integer argument. Integer strings are accepted.
    pub fn i64_arg(&self, key: &str) -> Result<i64, ArgsError> {
        let value = self.require(key)?;
        let number = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        number.ok_or_else(|| ArgsError::WrongType {
            key: key.to_string(),
            expected: "an integer",
        })
    }
}

impl From<Map<String, Value>> for ArgumentSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<ArgumentSet> for Value {
    fn from(args: ArgumentSet) -> Self {
        Value::Object(args.0)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ArgumentSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for ArgumentSet {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod operation_path {
        use super::*;

        #[test]
        fn parse_and_display() {
            let path = OperationPath::parse("instrument.mosfire.expose").unwrap();
            assert_eq!(path.segments(), ["instrument", "mosfire", "expose"]);
            assert_eq!(path.name(), "expose");
            assert_eq!(path.len(), 3);
            assert_eq!(path.to_string(), "instrument.mosfire.expose");
        }

        #[test]
        fn rejects_empty() {
            assert_eq!(OperationPath::parse(""), Err(TypeError::EmptyPath));
            assert_eq!(
                OperationPath::new(Vec::<String>::new()),
                Err(TypeError::EmptyPath)
            );
        }

        #[test]
        fn rejects_bad_segments() {
            assert!(OperationPath::parse("a..b").is_err());
            assert!(OperationPath::new(["a", "b/c"]).is_err());
            assert!(OperationPath::new(["a", "has space"]).is_err());
            assert!(OperationPath::new(["a.b"]).is_err());
        }

        #[test]
        fn serde_uses_dotted_form() {
            let path = OperationPath::parse("util.echo").unwrap();
            let json = serde_json::to_string(&path).unwrap();
            assert_eq!(json, "\"util.echo\"");
            let back: OperationPath = serde_json::from_str(&json).unwrap();
            assert_eq!(back, path);
            assert!(serde_json::from_str::<OperationPath>("\"bad..path\"").is_err());
        }
    }

    mod argument_set {
        use super::*;

        #[test]
        fn merge_overwrites() {
            let mut base: ArgumentSet = [("a", json!(1)), ("b", json!(2))].into_iter().collect();
            let top: ArgumentSet = [("b", json!(20)), ("c", json!(30))].into_iter().collect();
            base.merge(top);
            assert_eq!(base.get("a"), Some(&json!(1)));
            assert_eq!(base.get("b"), Some(&json!(20)));
            assert_eq!(base.get("c"), Some(&json!(30)));
        }

        #[test]
        fn require_reports_missing_key() {
            let mut args = ArgumentSet::new();
            args.insert("nothing", Value::Null);
            assert_eq!(
                args.require("instrument").unwrap_err().to_string(),
                "instrument argument not defined"
            );
            assert!(matches!(
                args.require("nothing"),
                Err(ArgsError::Missing(_))
            ));
        }

        #[test]
        fn typed_accessors() {
            let args: ArgumentSet = [
                ("name", json!("KPF")),
                ("exptime", json!("2.5")),
                ("coadds", json!(4)),
                ("dark", json!(true)),
            ]
            .into_iter()
            .collect();

            assert_eq!(args.str_arg("name").unwrap(), "KPF");
            assert_eq!(args.f64_arg("exptime").unwrap(), 2.5);
            assert_eq!(args.i64_arg("coadds").unwrap(), 4);
            assert_eq!(args.require("dark").unwrap(), &json!(true));
            assert!(matches!(
                args.str_arg("coadds"),
                Err(ArgsError::WrongType { .. })
            ));
        }

        #[test]
        fn keys_are_sorted() {
            let args: ArgumentSet = [("z", 1), ("a", 2), ("m", 3)].into_iter().collect();
            let keys: Vec<_> = args.keys().cloned().collect();
            assert_eq!(keys, ["a", "m", "z"]);
        }
    }
}
