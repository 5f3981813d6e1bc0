//! Path utilities for file and directory operations

pub mod general;

pub use general::find_csv_files;
