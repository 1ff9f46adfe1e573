//! cli::discovery
//!
//! Builds the catalogue of function paths from a directory tree.
//!
//! Every regular file whose name starts with the configured prefix becomes
//! one path: its directories relative to the root, then its file stem. A
//! file `mosfire/func_expose.py` under the root yields
//! `mosfire.func_expose`. Files whose path does not form valid segments are
//! skipped with a warning. Symlinked directories are not descended into.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::OperationPath;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read functions directory '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Discover function paths under `root`. A missing root yields nothing.
///
/// # Errors
///
/// Returns `DiscoveryError::Read` if a directory cannot be listed.
pub fn discover(root: &Path, prefix: &str) -> Result<Vec<OperationPath>, DiscoveryError> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "functions directory not present");
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| DiscoveryError::Read {
            path: dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| DiscoveryError::Read {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|source| DiscoveryError::Read {
                path: path.clone(),
                source,
            })?;
            if file_type.is_symlink() && path.is_dir() {
                tracing::debug!(dir = %path.display(), "not following symlinked directory");
                continue;
            }
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            let matches_prefix = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix));
            if !matches_prefix {
                continue;
            }
            match to_operation_path(root, &path) {
                Some(op) => found.push(op),
                None => tracing::warn!(
                    file = %path.display(),
                    "skipping function file with unusable name"
                ),
            }
        }
    }

    found.sort();
    found.dedup();
    tracing::debug!(root = %root.display(), count = found.len(), "discovered functions");
    Ok(found)
}

fn to_operation_path(root: &Path, file: &Path) -> Option<OperationPath> {
    let relative = file.strip_prefix(root).ok()?;
    let mut segments: Vec<String> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| c.as_os_str().to_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or(Some(Vec::new()))?;
    segments.push(file.file_stem()?.to_str()?.to_string());
    OperationPath::new(segments).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn nested_files_become_paths() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "mosfire/func_expose.py");
        touch(temp.path(), "mosfire/status/func_read.py");
        touch(temp.path(), "func_top.py");
        touch(temp.path(), "mosfire/helper.py");

        let paths: Vec<_> = discover(temp.path(), "func")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            paths,
            ["func_top", "mosfire.func_expose", "mosfire.status.func_read"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "mosfire/func_expose.py");
        std::os::unix::fs::symlink(temp.path(), temp.path().join("mosfire").join("loop"))
            .unwrap();
        std::os::unix::fs::symlink(
            temp.path().join("mosfire").join("func_expose.py"),
            temp.path().join("func_linked.py"),
        )
        .unwrap();

        let paths: Vec<_> = discover(temp.path(), "func")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(paths, ["func_linked", "mosfire.func_expose"]);
    }

    #[test]
    fn missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(discover(&temp.path().join("nope"), "func").unwrap().is_empty());
    }

    #[test]
    fn unusable_names_are_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "func.v2.py");
        touch(temp.path(), "my dir/func_x.py");
        touch(temp.path(), "func_ok.py");
        let paths = discover(temp.path(), "func").unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].to_string(), "func_ok");
    }
}
