//! engine::registry
//!
//! Typed registry of operations keyed by their path.
//!
//! Operations are registered once at startup and only read afterwards. The
//! registry answers "does this path expose the execute contract", which is
//! how the router tells an invokable leaf from a malformed one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::operation::Operation;
use crate::core::types::{OperationPath, TypeError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation '{0}' is already registered")]
    Duplicate(OperationPath),

    #[error(transparent)]
    InvalidPath(#[from] TypeError),
}

/// Operations by path.
#[derive(Clone, Default)]
pub struct Registry {
    operations: BTreeMap<OperationPath, Arc<dyn Operation>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under `path`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Duplicate` if the path is taken.
    pub fn register<O: Operation + 'static>(
        &mut self,
        path: OperationPath,
        operation: O,
    ) -> Result<(), RegistryError> {
        self.register_arc(path, Arc::new(operation))
    }

    /// Register an already shared operation.
    pub fn register_arc(
        &mut self,
        path: OperationPath,
        operation: Arc<dyn Operation>,
    ) -> Result<(), RegistryError> {
        if self.operations.contains_key(&path) {
            return Err(RegistryError::Duplicate(path));
        }
        self.operations.insert(path, operation);
        Ok(())
    }

    pub fn get(&self, path: &OperationPath) -> Option<Arc<dyn Operation>> {
        self.operations.get(path).cloned()
    }

    pub fn contains(&self, path: &OperationPath) -> bool {
        self.operations.contains_key(path)
    }

    /// Registered paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &OperationPath> {
        self.operations.keys()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("paths", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ArgumentSet;
    use crate::engine::operation::{PhaseContext, PhaseError};
    use serde_json::Value;

    struct Noop;

    impl Operation for Noop {
        fn precondition(
            &self,
            _: &mut ArgumentSet,
            _: &PhaseContext<'_>,
        ) -> Result<(), PhaseError> {
            Ok(())
        }
        fn perform(&self, _: &mut ArgumentSet, _: &PhaseContext<'_>) -> Result<Value, PhaseError> {
            Ok(Value::Null)
        }
        fn postcondition(
            &self,
            _: &mut ArgumentSet,
            _: &PhaseContext<'_>,
        ) -> Result<(), PhaseError> {
            Ok(())
        }
    }

    fn path(s: &str) -> OperationPath {
        OperationPath::parse(s).unwrap()
    }

    #[test]
    fn register_and_get() {
        let mut registry = Registry::new();
        registry.register(path("mosfire.expose"), Noop).unwrap();
        assert!(registry.contains(&path("mosfire.expose")));
        assert!(registry.get(&path("mosfire.expose")).is_some());
        assert!(registry.get(&path("mosfire")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicates_rejected() {
        let mut registry = Registry::new();
        registry.register(path("a.b"), Noop).unwrap();
        assert_eq!(
            registry.register(path("a.b"), Noop),
            Err(RegistryError::Duplicate(path("a.b")))
        );
    }

    #[test]
    fn paths_are_sorted() {
        let mut registry = Registry::new();
        registry.register(path("z.last"), Noop).unwrap();
        registry.register(path("a.first"), Noop).unwrap();
        let paths: Vec<_> = registry.paths().map(ToString::to_string).collect();
        assert_eq!(paths, ["a.first", "z.last"]);
        assert!(format!("{:?}", registry).contains("a.first"));
    }
}
