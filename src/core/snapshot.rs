//! core::snapshot
//!
//! Deep snapshots of argument sets and the asymmetric comparison used to
//! detect phases that tamper with their input.
//!
//! # Semantics
//!
//! A [`Snapshot`] owns a structural copy of the arguments: later changes to
//! the original never reach the snapshot and vice versa.
//!
//! [`Snapshot::diff`] only inspects keys present in the *first* set. A key
//! that exists only in the second set is ignored, so values stashed under new
//! keys while an operation runs are not reported. Loss or alteration of a
//! pre-existing key always is.
//!
//! # Example
//!
//! ```
//! use translator_module::core::snapshot::Snapshot;
//! use translator_module::core::types::ArgumentSet;
//!
//! let mut args = ArgumentSet::new();
//! args.insert("exptime", 30);
//! let before = Snapshot::of(&args);
//!
//! args.insert("derived", true);
//! assert!(before.diff_live(&args).is_empty());
//!
//! args.insert("exptime", 60);
//! assert_eq!(before.diff_live(&args).changed_keys(), ["exptime"]);
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::types::ArgumentSet;

/// Errors from capturing a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The value could not be turned into plain data.
    #[error("arguments are not structurally comparable: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The value serialized to something other than a mapping.
    #[error("arguments must serialize to a mapping, found {0}")]
    NotAMapping(&'static str),
}

/// An immutable structural copy of an argument set.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    entries: Map<String, Value>,
    fingerprint: String,
}

impl Snapshot {
    /// Snapshot an [`ArgumentSet`]. Argument sets hold plain data only, so
    /// this cannot fail.
    pub fn of(args: &ArgumentSet) -> Self {
        Self::from_entries(args.as_map().clone())
    }

    /// Snapshot any serializable mapping-shaped value.
    ///
    /// # Errors
    ///
    /// - `SnapshotError::Serialization` if a value refuses to serialize or
    ///   has non-string map keys
    /// - `SnapshotError::NotAMapping` if the value is not a mapping
    pub fn capture<T: Serialize + ?Sized>(value: &T) -> Result<Self, SnapshotError> {
        match serde_json::to_value(value)? {
            Value::Object(entries) => Ok(Self::from_entries(entries)),
            other => Err(SnapshotError::NotAMapping(value_kind(&other))),
        }
    }

    fn from_entries(entries: Map<String, Value>) -> Self {
        let fingerprint = compute_fingerprint(&entries);
        Self {
            entries,
            fingerprint,
        }
    }

    /// The captured entries.
    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 of the canonical JSON form, hex encoded.
    ///
    /// Keys are sorted at every level, so equal snapshots always share a
    /// fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Rebuild an argument set from the snapshot.
    pub fn to_arguments(&self) -> ArgumentSet {
        ArgumentSet::from(self.entries.clone())
    }

    /// Compare against another snapshot (asymmetric: only keys in `self`).
    pub fn diff(&self, other: &Snapshot) -> ArgDiff {
        diff_maps(&self.entries, &other.entries)
    }

    /// Compare against a live argument set without copying it.
    pub fn diff_live(&self, live: &ArgumentSet) -> ArgDiff {
        diff_maps(&self.entries, live.as_map())
    }

    /// Keys present in `live` that the snapshot does not have.
    pub fn added_keys(&self, live: &ArgumentSet) -> Vec<String> {
        live.keys()
            .filter(|k| !self.entries.contains_key(k.as_str()))
            .cloned()
            .collect()
    }
}

/// A key whose value differs between two argument sets.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedValue {
    pub key: String,
    pub before: Value,
    pub after: Value,
}

/// Structured result of an asymmetric comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgDiff {
    /// Keys present in both sets with different values.
    pub changed: Vec<ChangedValue>,
    /// Keys present in the first set but missing from the second.
    pub removed: Vec<String>,
}

impl ArgDiff {
    /// True when no pre-existing key was lost or altered.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    pub fn changed_keys(&self) -> Vec<&str> {
        self.changed.iter().map(|c| c.key.as_str()).collect()
    }
}

impl fmt::Display for ArgDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes");
        }
        let mut parts = Vec::new();
        for change in &self.changed {
            parts.push(format!(
                "'{}' changed from {} to {}",
                change.key, change.before, change.after
            ));
        }
        for key in &self.removed {
            parts.push(format!("'{}' removed", key));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Compare two maps, reporting only keys present in `first`.
pub fn diff_maps(first: &Map<String, Value>, second: &Map<String, Value>) -> ArgDiff {
    let mut diff = ArgDiff::default();
    for (key, before) in first {
        match second.get(key) {
            None => diff.removed.push(key.clone()),
            Some(after) if after != before => diff.changed.push(ChangedValue {
                key: key.clone(),
                before: before.clone(),
                after: after.clone(),
            }),
            Some(_) => {}
        }
    }
    diff
}

fn compute_fingerprint(entries: &Map<String, Value>) -> String {
    let mut hasher = Sha256::new();
    // serde_json maps are ordered, so this encoding is canonical.
    for (key, value) in entries {
        hasher.update(key.as_bytes());
        hasher.update(b"\0");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Short name of a JSON value's shape, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
