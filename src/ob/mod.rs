//! ob
//!
//! Flattening of Observing Blocks (OBs) into argument sets.
//!
//! # Precedence
//!
//! Sources are merged in this order, each overwriting keys of the previous
//! ones:
//!
//! 1. `target.parameters`
//! 2. `metadata`
//! 3. `acquisition.parameters`
//! 4. `acquisition.metadata`
//! 5. `common_parameters.detector_parameters`
//! 6. `common_parameters.instrument_parameters`
//! 7. `common_parameters.tcs_parameters`
//! 8. the selected observation's `parameters`, then its `metadata`
//!
//! Absent sources are skipped. Finally every key listed in the
//! [`RenameTable`] is moved to its operation-native name.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use translator_module::ob::{map_ob, RenameTable};
//!
//! let ob = json!({
//!     "target": { "parameters": { "a": 1 } },
//!     "common_parameters": { "tcs_parameters": { "a": 2 } },
//!     "observations": [ { "metadata": { "sequence_number": 0 } } ]
//! });
//!
//! let args = map_ob(&ob, 0, &RenameTable::new()).unwrap();
//! assert_eq!(args.get("a"), Some(&json!(2)));
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::config::{Config, ConfigError};
use crate::core::snapshot::value_kind;
use crate::core::types::ArgumentSet;

/// Config section holding the rename table.
pub const RENAME_SECTION: &str = "ob_keys";

/// OB sources in increasing precedence.
pub const SOURCE_PRECEDENCE: [&[&str]; 7] = [
    &["target", "parameters"],
    &["metadata"],
    &["acquisition", "parameters"],
    &["acquisition", "metadata"],
    &["common_parameters", "detector_parameters"],
    &["common_parameters", "instrument_parameters"],
    &["common_parameters", "tcs_parameters"],
];

/// Errors from OB mapping.
#[derive(Debug, Error)]
pub enum ObError {
    #[error("observing block must be a mapping, found {0}")]
    NotAMapping(&'static str),

    /// No observation carries the requested sequence number.
    #[error("no observation with sequence number {0}")]
    SequenceNotFound(i64),

    #[error("failed to read observing block '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse observing block '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Mapping from OB-native key to operation-native key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable(BTreeMap<String, String>);

impl RenameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `[ob_keys]` section. A missing section is an empty table.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for non-string entries.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let Some(section) = config.section(RENAME_SECTION) else {
            return Ok(Self::new());
        };
        let mut table = BTreeMap::new();
        for (key, value) in section {
            match value.as_str() {
                Some(target) if !target.is_empty() => {
                    table.insert(key.clone(), target.to_string());
                }
                _ => {
                    return Err(ConfigError::InvalidValue {
                        section: RENAME_SECTION.to_string(),
                        key: key.clone(),
                        message: "expected a non-empty string".to_string(),
                    })
                }
            }
        }
        Ok(Self(table))
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply the table to a mapping.
    ///
    /// Keys without an entry pass through first; renamed keys are written
    /// afterwards, so a renamed value wins over a pass-through key of the
    /// same name.
    pub fn apply(&self, args: ArgumentSet) -> ArgumentSet {
        let mut out = ArgumentSet::new();
        let mut renamed = Vec::new();
        for (key, value) in args {
            match self.0.get(&key) {
                Some(target) => renamed.push((target.clone(), value)),
                None => {
                    out.insert(key, value);
                }
            }
        }
        for (key, value) in renamed {
            out.insert(key, value);
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RenameTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Flatten `ob` into the arguments of the observation numbered `sequence`.
///
/// # Errors
///
/// - `ObError::NotAMapping` if `ob` is not a mapping
/// - `ObError::SequenceNotFound` if no observation matches `sequence`
pub fn map_ob(ob: &Value, sequence: i64, renames: &RenameTable) -> Result<ArgumentSet, ObError> {
    if !ob.is_object() {
        return Err(ObError::NotAMapping(value_kind(ob)));
    }

    let mut merged = ArgumentSet::new();
    for path in SOURCE_PRECEDENCE {
        if let Some(source) = lookup(ob, path) {
            merged.merge_map(source);
        }
    }

    let observation = find_observation(ob, sequence).ok_or(ObError::SequenceNotFound(sequence))?;
    if let Some(parameters) = observation.get("parameters").and_then(Value::as_object) {
        merged.merge_map(parameters);
    }
    if let Some(metadata) = observation.get("metadata").and_then(Value::as_object) {
        merged.merge_map(metadata);
    }

    tracing::debug!(
        sequence,
        keys = merged.len(),
        renames = renames.len(),
        "mapped observing block"
    );
    Ok(renames.apply(merged))
}

/// Read an OB from a JSON file.
pub fn load(path: &Path) -> Result<Value, ObError> {
    let contents = fs::read_to_string(path).map_err(|source| ObError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ObError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Follow `path` through nested mappings; `None` if any step is missing or
/// the destination is not a mapping.
fn lookup<'a>(ob: &'a Value, path: &[&str]) -> Option<&'a Map<String, Value>> {
    let mut current = ob;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_object()
}

fn find_observation(ob: &Value, sequence: i64) -> Option<&Map<String, Value>> {
    let observations = ob.get("observations")?.as_array()?;
    let mut matches = observations.iter().filter_map(Value::as_object).filter(|obs| {
        obs.get("metadata")
            .and_then(|m| m.get("sequence_number"))
            .is_some_and(|n| sequence_matches(n, sequence))
    });
    let first = matches.next()?;
    if matches.next().is_some() {
        tracing::warn!(sequence, "several observations share a sequence number, using the first");
    }
    Some(first)
}

fn sequence_matches(value: &Value, sequence: i64) -> bool {
    match value {
        Value::Number(n) => {
            n.as_i64() == Some(sequence) || n.as_f64() == Some(sequence as f64)
        }
        Value::String(s) => s.trim().parse::<i64>().ok() == Some(sequence),
        _ => false,
    }
}
