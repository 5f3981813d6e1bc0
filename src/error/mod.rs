//! Error handling for the stages pipeline.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;

/// Errors produced by the pipeline stages
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing or writing CSV data through Arrow
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error raised by the embedded warehouse
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] duckdb::Error),

    /// An input file of an upstream stage does not exist
    #[error("{what} not found: {}", path.display())]
    MissingInput {
        /// Which input was expected ("raw file", "clean file", ...)
        what: &'static str,
        /// Where it was expected
        path: PathBuf,
    },

    /// The raw directory holds several CSV candidates and none has the conventional name
    #[error(
        "raw file not found: {} (found {count} CSV files in {}, cannot pick one)",
        expected.display(),
        dir.display()
    )]
    AmbiguousInput {
        /// Conventional raw file path
        expected: PathBuf,
        /// Directory that was searched
        dir: PathBuf,
        /// Number of CSV files found there
        count: usize,
    },

    /// A relation the stage reads from is absent from the warehouse
    #[error("table {table} not found in warehouse")]
    MissingTable {
        /// Name of the missing table or view
        table: String,
    },

    /// None of the accepted names of a required column exist in the table
    #[error("required {role} column missing from {table}: expected one of {candidates:?}")]
    RequiredColumn {
        /// Role of the column ("company", "country")
        role: &'static str,
        /// Table that was probed
        table: String,
        /// Accepted column names, in priority order
        candidates: Vec<String>,
    },
}

impl PipelineError {
    /// Whether the error means an upstream stage has not produced its output yet
    #[must_use]
    pub const fn is_missing_input(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. } | Self::AmbiguousInput { .. } | Self::MissingTable { .. }
        )
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
