//! CSV file operations
//!
//! This module reads the two CSV dialects of the pipeline into a single Arrow
//! record batch and writes record batches back out. Column types are inferred
//! by the Arrow CSV reader; empty fields become nulls.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::error::util::{ensure_file_exists, ensure_parent_dir};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Default batch size for CSV reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// The CSV dialects handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvFormat {
    /// The raw export: `;` delimited, Latin-1 encoded
    RawExport,
    /// The anonymized file: `,` delimited, UTF-8
    Clean,
}

impl CsvFormat {
    /// Field delimiter of the dialect
    #[must_use]
    pub const fn delimiter(self) -> u8 {
        match self {
            Self::RawExport => b';',
            Self::Clean => b',',
        }
    }

    /// Decode file bytes into text according to the dialect's encoding
    fn decode(self, bytes: Vec<u8>) -> Result<String> {
        match self {
            Self::RawExport => Ok(decode_latin1(&bytes)),
            Self::Clean => String::from_utf8(bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into()),
        }
    }
}

/// Decode ISO-8859-1 bytes; every byte maps to the code point of the same value
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Read a CSV file into one record batch
///
/// # Arguments
/// * `path` - Path to the CSV file
/// * `format` - Dialect of the file
///
/// # Errors
/// Returns `MissingInput` if the file does not exist, or an Arrow error if the
/// content cannot be parsed
pub fn read_csv(path: &Path, format: CsvFormat) -> Result<RecordBatch> {
    let start = Instant::now();
    ensure_file_exists(path, "CSV file")?;
    log_operation_start("Reading CSV file", path);

    let text = format.decode(fs::read(path)?)?;
    let batch = parse_csv(&text, format.delimiter())?;

    log_operation_complete("read", path, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Parse CSV text with a header row into one record batch
///
/// Rows with fewer fields than the header are accepted; the missing trailing
/// fields are null.
pub fn parse_csv(text: &str, delimiter: u8) -> Result<RecordBatch> {
    let csv_format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter)
        .with_truncated_rows(true);
    let (schema, _) = csv_format.infer_schema(Cursor::new(text.as_bytes()), None)?;
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_format(csv_format)
        .with_batch_size(DEFAULT_BATCH_SIZE)
        .with_truncated_rows(true)
        .build(Cursor::new(text.as_bytes()))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(concat_batches(&schema, &batches)?)
}

/// Write a record batch as CSV with a header row, replacing any existing file
///
/// The header is written even when the batch has no rows.
pub fn write_csv(path: &Path, batch: &RecordBatch, delimiter: u8) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(delimiter)
        .build(file);
    writer.write(batch)?;
    Ok(())
}
