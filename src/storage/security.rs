//! Path validation for the media sandbox

use std::path::{Component, Path};

use crate::errors::{StorageError, StorageResult};

/// Reject relative paths that are absolute, contain `..` or null bytes
pub fn validate_relative_path(path: &Path) -> StorageResult<()> {
    let path_str = path.to_string_lossy();
    if path_str.contains('\0') {
        return Err(StorageError::PathValidation {
            path: path.to_path_buf(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(StorageError::PathValidation {
                    path: path.to_path_buf(),
                    reason: "Path must be relative and stay inside the media directory"
                        .to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Verify that a resolved path is inside the sandbox base.
/// Symlinks and `..` are resolved through the OS before comparing.
pub fn validate_path_within_sandbox(resolved_path: &Path, sandbox_base: &Path) -> StorageResult<()> {
    let canonical_base = sandbox_base
        .canonicalize()
        .map_err(|e| StorageError::PathValidation {
            path: sandbox_base.to_path_buf(),
            reason: format!("Failed to resolve sandbox base: {e}"),
        })?;

    let canonical_path = if resolved_path.exists() {
        resolved_path
            .canonicalize()
            .map_err(|e| StorageError::PathValidation {
                path: resolved_path.to_path_buf(),
                reason: format!("Failed to resolve path: {e}"),
            })?
    } else {
        let parent = resolved_path
            .parent()
            .ok_or_else(|| StorageError::PathValidation {
                path: resolved_path.to_path_buf(),
                reason: "Path has no parent directory".to_string(),
            })?;
        let canonical_parent = parent
            .canonicalize()
            .map_err(|e| StorageError::PathValidation {
                path: parent.to_path_buf(),
                reason: format!("Failed to resolve parent: {e}"),
            })?;
        let filename = resolved_path
            .file_name()
            .ok_or_else(|| StorageError::PathValidation {
                path: resolved_path.to_path_buf(),
                reason: "Invalid filename".to_string(),
            })?;
        canonical_parent.join(filename)
    };

    if !canonical_path.starts_with(&canonical_base) {
        return Err(StorageError::PathValidation {
            path: resolved_path.to_path_buf(),
            reason: format!(
                "Path escapes sandbox: resolves to '{}' (outside '{}')",
                canonical_path.display(),
                canonical_base.display()
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_relative_path() {
        assert!(validate_relative_path(Path::new("images/a.jpg")).is_ok());
        assert!(validate_relative_path(Path::new("../etc/passwd")).is_err());
        assert!(validate_relative_path(Path::new("/etc/passwd")).is_err());
        assert!(validate_relative_path(Path::new("a\0.jpg")).is_err());
    }

    #[test]
    fn test_validate_path_within_sandbox() {
        let sandbox = tempfile::tempdir().unwrap();
        let inside = sandbox.path().join("inside.jpg");
        std::fs::write(&inside, b"x").unwrap();
        assert!(validate_path_within_sandbox(&inside, sandbox.path()).is_ok());
        assert!(validate_path_within_sandbox(&sandbox.path().join("new.jpg"), sandbox.path()).is_ok());

        let outside_dir = tempfile::tempdir().unwrap();
        let outside = outside_dir.path().join("outside.jpg");
        std::fs::write(&outside, b"x").unwrap();
        assert!(validate_path_within_sandbox(&outside, sandbox.path()).is_err());
    }
}
