//! Utility functions for error handling
//!
//! Small checks shared by the stages so that missing inputs fail early with a
//! path in the message instead of a bare IO error.

use std::fs;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Fail with `MissingInput` unless `path` is an existing file
///
/// # Arguments
/// * `path` - The file that must exist
/// * `what` - Name of the input, used in the error message
pub fn ensure_file_exists(path: &Path, what: &'static str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Create the parent directory of an output file if needed
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("present.csv");
        fs::write(&file, "a\n1\n").unwrap();

        assert!(ensure_file_exists(&file, "clean file").is_ok());

        let err = ensure_file_exists(&dir.path().join("absent.csv"), "clean file").unwrap_err();
        assert!(err.is_missing_input());
        assert!(err.to_string().starts_with("clean file not found"));

        // A directory is not a file
        assert!(ensure_file_exists(dir.path(), "clean file").is_err());
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("out.csv");
        ensure_parent_dir(&target).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }
}
