//! builtin
//!
//! Generic operations shipped with the binary. Instrument-specific
//! operations live with each instrument package and register themselves the
//! same way.
//!
//! | Path               | Operation                          |
//! |--------------------|------------------------------------|
//! | `util.echo`        | [`echo::Echo`]                     |
//! | `keywords.read`    | [`keyword_ops::ReadKeyword`]       |
//! | `keywords.write`   | [`keyword_ops::WriteKeyword`]      |
//! | `keywords.waitfor` | [`keyword_ops::WaitForKeyword`]    |

pub mod echo;
pub mod keyword_ops;

use std::sync::Arc;

use crate::core::types::OperationPath;
use crate::engine::{Registry, RegistryError};
use crate::keywords::KeywordService;

pub use echo::Echo;
pub use keyword_ops::{ReadKeyword, WaitForKeyword, WriteKeyword};

/// Register every builtin into `registry`.
///
/// # Errors
///
/// Returns `RegistryError::Duplicate` if a builtin path is already taken.
pub fn register_all(
    registry: &mut Registry,
    keywords: Arc<dyn KeywordService>,
) -> Result<(), RegistryError> {
    registry.register(OperationPath::parse("util.echo")?, Echo)?;
    registry.register(
        OperationPath::parse("keywords.read")?,
        ReadKeyword::new(keywords.clone()),
    )?;
    registry.register(
        OperationPath::parse("keywords.write")?,
        WriteKeyword::new(keywords.clone()),
    )?;
    registry.register(
        OperationPath::parse("keywords.waitfor")?,
        WaitForKeyword::new(keywords),
    )?;
    Ok(())
}

/// A registry holding only the builtins.
pub fn registry(keywords: Arc<dyn KeywordService>) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    register_all(&mut registry, keywords)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::MemoryKeywords;

    #[test]
    fn all_builtins_registered() {
        let registry = registry(Arc::new(MemoryKeywords::new())).unwrap();
        let paths: Vec<_> = registry.paths().map(ToString::to_string).collect();
        assert_eq!(
            paths,
            ["keywords.read", "keywords.waitfor", "keywords.write", "util.echo"]
        );
        let waitfor = registry
            .get(&OperationPath::parse("keywords.waitfor").unwrap())
            .unwrap();
        assert!(waitfor.abortable());
    }

    #[test]
    fn registering_twice_fails() {
        let keywords: Arc<dyn KeywordService> = Arc::new(MemoryKeywords::new());
        let mut registry = registry(keywords.clone()).unwrap();
        assert!(register_all(&mut registry, keywords).is_err());
    }
}
