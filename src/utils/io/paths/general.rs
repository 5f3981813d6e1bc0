//! General path utilities for locating input files
//!
//! This module provides helpers for finding data files in a directory
//! without assuming their exact name.

use std::path::{Path, PathBuf};

/// Get all CSV files directly inside a directory
///
/// Matching is on the `.csv` extension, case-insensitively. The result is
/// sorted so callers see a stable order. A missing or unreadable directory
/// yields an empty list.
///
/// # Arguments
/// * `dir` - The directory to scan (not recursively)
///
/// # Returns
/// A sorted vector of paths to CSV files
#[must_use]
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()
        .map(|entries| {
            entries
                .filter_map(|res: std::io::Result<std::fs::DirEntry>| res.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && path
                            .extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
                })
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_csv_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(dir.path().join("a.CSV"), "").unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("d.csv")).unwrap();

        let files = find_csv_files(dir.path());
        assert_eq!(
            files,
            vec![dir.path().join("a.CSV"), dir.path().join("b.csv")]
        );
    }

    #[test]
    fn test_find_csv_files_missing_dir() {
        assert!(find_csv_files(Path::new("/definitely/not/here")).is_empty());
    }
}
