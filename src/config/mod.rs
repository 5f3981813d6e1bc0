//! Configuration for the pipeline stages.
//!
//! Every location is derived from a single project root. The value is built
//! once and handed to each stage; nothing here is global or mutable.

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::utils::io::find_csv_files;

/// Conventional name of the raw export
pub const RAW_FILENAME: &str = "stages_2023_2025_raw.csv";
/// Name of the anonymized output of the cleaner
pub const CLEAN_FILENAME: &str = "stages_2023_2025_clean.csv";
/// Name of the warehouse database file
pub const WAREHOUSE_FILENAME: &str = "stages.duckdb";
/// Name of the per-column profile table
pub const PROFILE_CSV_FILENAME: &str = "profiling_columns.csv";
/// Name of the Markdown profiling report
pub const PROFILE_REPORT_FILENAME: &str = "profiling_report.md";

/// Paths used by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Project root all other paths are relative to
    pub project_root: PathBuf,
    /// Directory holding the raw export(s)
    pub raw_dir: PathBuf,
    /// Directory holding the clean file
    pub processed_dir: PathBuf,
    /// Directory holding the warehouse file
    pub warehouse_dir: PathBuf,
    /// Directory receiving the profiling artifacts
    pub reports_dir: PathBuf,
    /// Conventional raw filename inside `raw_dir`
    pub raw_filename: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl PipelineConfig {
    /// Build the standard layout under `project_root`
    #[must_use]
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let data = root.join("data");
        Self {
            raw_dir: data.join("raw"),
            processed_dir: data.join("processed"),
            warehouse_dir: data.join("warehouse"),
            reports_dir: root.join("reports"),
            raw_filename: RAW_FILENAME.to_string(),
            project_root: root,
        }
    }

    /// Use a different conventional raw filename
    #[must_use]
    pub fn with_raw_filename(mut self, filename: impl Into<String>) -> Self {
        self.raw_filename = filename.into();
        self
    }

    /// Location of the raw export, with the single-CSV fallback applied
    pub fn raw_path(&self) -> Result<PathBuf> {
        resolve_raw_path(&self.raw_dir, &self.raw_filename)
    }

    #[must_use]
    pub fn clean_path(&self) -> PathBuf {
        self.processed_dir.join(CLEAN_FILENAME)
    }

    #[must_use]
    pub fn warehouse_path(&self) -> PathBuf {
        self.warehouse_dir.join(WAREHOUSE_FILENAME)
    }

    #[must_use]
    pub fn profile_csv_path(&self) -> PathBuf {
        self.reports_dir.join(PROFILE_CSV_FILENAME)
    }

    #[must_use]
    pub fn profile_report_path(&self) -> PathBuf {
        self.reports_dir.join(PROFILE_REPORT_FILENAME)
    }
}

/// Resolve the raw export location
///
/// Returns `raw_dir/filename` when it exists. Otherwise, if `raw_dir` holds
/// exactly one `.csv` file, that file is used. No candidate yields
/// `MissingInput`; several yield `AmbiguousInput`.
pub fn resolve_raw_path(raw_dir: &Path, filename: &str) -> Result<PathBuf> {
    let expected = raw_dir.join(filename);
    if expected.is_file() {
        return Ok(expected);
    }

    let mut candidates = find_csv_files(raw_dir);
    match candidates.len() {
        0 => Err(PipelineError::MissingInput {
            what: "raw file",
            path: expected,
        }),
        1 => {
            let fallback = candidates.remove(0);
            log::info!(
                "{} not found, using the only CSV in {}: {}",
                filename,
                raw_dir.display(),
                fallback.display()
            );
            Ok(fallback)
        }
        count => Err(PipelineError::AmbiguousInput {
            expected,
            dir: raw_dir.to_path_buf(),
            count,
        }),
    }
}
