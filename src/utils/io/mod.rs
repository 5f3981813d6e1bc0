//! IO utilities for file operations
//!
//! This module provides utilities for locating input files and for reading
//! and writing the CSV formats used by the pipeline.

pub mod csv;
pub mod paths;

// Re-export commonly used functions for convenience
pub use csv::{CsvFormat, decode_latin1, read_csv, write_csv};
pub use paths::find_csv_files;
