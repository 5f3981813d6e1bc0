//! Quality and PII profiling of the raw export.
//!
//! The profile describes columns only. Cell values never appear in either
//! artifact, so the report can be shared before the data is anonymized.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::Local;
use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::error::util::ensure_parent_dir;
use crate::schema::{
    column_names, is_expected, is_pii, missing_expected_columns, unresolved_roles,
};
use crate::utils::io::{CsvFormat, read_csv, write_csv};
use crate::utils::logging::log_warning;

/// Number of columns listed in the report's quality table
pub const REPORT_WORST_COLUMNS: usize = 10;

/// Profile of one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub column: String,
    /// Arrow type inferred by the CSV reader
    pub dtype: String,
    /// Share of null values, in percent, rounded to 2 decimals
    pub missing_pct: f64,
    /// Number of distinct non-null values
    pub n_unique: u64,
    pub is_expected: bool,
    pub is_pii: bool,
}

/// Row/column counts plus the per-column profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub rows: usize,
    pub columns: usize,
    /// Sorted PII first, then by descending `missing_pct`
    pub profiles: Vec<ColumnProfile>,
}

impl ProfileReport {
    /// Build the report for a dataset
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        Ok(Self {
            rows: batch.num_rows(),
            columns: batch.num_columns(),
            profiles: profile_columns(batch)?,
        })
    }

    /// Names of the PII columns present in the dataset
    #[must_use]
    pub fn pii_columns(&self) -> Vec<&str> {
        self.profiles
            .iter()
            .filter(|p| p.is_pii)
            .map(|p| p.column.as_str())
            .collect()
    }

    /// The `n` columns with the highest missing percentage
    #[must_use]
    pub fn worst_columns(&self, n: usize) -> Vec<&ColumnProfile> {
        self.profiles
            .iter()
            .sorted_by(|a, b| b.missing_pct.total_cmp(&a.missing_pct))
            .take(n)
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn distinct_non_null(array: &ArrayRef) -> Result<u64> {
    let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
    let mut seen = FxHashSet::default();
    for i in 0..array.len() {
        if array.is_valid(i) {
            seen.insert(formatter.value(i).to_string());
        }
    }
    Ok(seen.len() as u64)
}

/// Compute the profile of every column of `batch`
pub fn profile_columns(batch: &RecordBatch) -> Result<Vec<ColumnProfile>> {
    let rows = batch.num_rows();
    let schema = batch.schema();

    let mut profiles = Vec::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let missing_pct = if rows == 0 {
            0.0
        } else {
            round2(column.null_count() as f64 / rows as f64 * 100.0)
        };
        profiles.push(ColumnProfile {
            column: field.name().clone(),
            dtype: field.data_type().to_string(),
            missing_pct,
            n_unique: distinct_non_null(column)?,
            is_expected: is_expected(field.name()),
            is_pii: is_pii(field.name()),
        });
    }

    // Stable sort keeps file order among equal keys
    profiles.sort_by(|a, b| {
        b.is_pii
            .cmp(&a.is_pii)
            .then_with(|| b.missing_pct.total_cmp(&a.missing_pct))
    });
    Ok(profiles)
}

/// The profile table as a record batch, in the column order of the CSV artifact
pub fn profile_to_batch(profiles: &[ColumnProfile]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("column", DataType::Utf8, false),
        Field::new("dtype", DataType::Utf8, false),
        Field::new("missing_pct", DataType::Float64, false),
        Field::new("n_unique", DataType::UInt64, false),
        Field::new("is_expected", DataType::Boolean, false),
        Field::new("is_pii", DataType::Boolean, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(profiles.iter().map(|p| p.column.as_str()))),
        Arc::new(StringArray::from_iter_values(profiles.iter().map(|p| p.dtype.as_str()))),
        Arc::new(Float64Array::from_iter_values(profiles.iter().map(|p| p.missing_pct))),
        Arc::new(UInt64Array::from_iter_values(profiles.iter().map(|p| p.n_unique))),
        Arc::new(BooleanArray::from(profiles.iter().map(|p| p.is_expected).collect::<Vec<_>>())),
        Arc::new(BooleanArray::from(profiles.iter().map(|p| p.is_pii).collect::<Vec<_>>())),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Render the human-readable report
///
/// `generated` is the timestamp printed in the header.
#[must_use]
pub fn render_markdown(report: &ProfileReport, generated: &str) -> String {
    let mut md = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(md, "# Profiling report - Stages (2023-2025)\n");
    let _ = writeln!(md, "- Generated: **{generated}**");
    let _ = writeln!(md, "- Rows: **{}**", report.rows);
    let _ = writeln!(md, "- Columns: **{}**\n", report.columns);

    let _ = writeln!(md, "## PII scan\n");
    let pii = report.pii_columns();
    if pii.is_empty() {
        let _ = writeln!(md, "No declared PII column detected.");
    } else {
        let _ = writeln!(md, "Columns identified as PII (dropped by the cleaning stage):\n");
        for column in pii {
            let _ = writeln!(md, "- PII: {column}");
        }
    }

    let _ = writeln!(md, "\n## Quality overview\n");
    let _ = writeln!(md, "| column | dtype | missing_pct | n_unique | is_expected | is_pii |");
    let _ = writeln!(md, "|:-------|:------|------------:|---------:|:------------|:-------|");
    for p in report.worst_columns(REPORT_WORST_COLUMNS) {
        let _ = writeln!(
            md,
            "| {} | {} | {:.2} | {} | {} | {} |",
            p.column.replace('|', "\\|"),
            p.dtype,
            p.missing_pct,
            p.n_unique,
            p.is_expected,
            p.is_pii
        );
    }

    let _ = writeln!(md, "\n## Notes\n");
    let _ = writeln!(
        md,
        "- This report shows no example values to avoid leaking personal data."
    );
    let _ = writeln!(md, "- PII columns are removed by `stages clean`.");
    md
}

/// Paths written by the profiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileArtifacts {
    pub raw_path: PathBuf,
    pub profile_csv: PathBuf,
    pub report_md: PathBuf,
    /// Expected columns the export lacks
    pub missing_expected: Vec<&'static str>,
    /// Required roles (company, country) no column can fill; the mart build will fail
    pub missing_roles: Vec<&'static str>,
}

/// Profile the raw export and write both report artifacts
pub fn run_profiler(config: &PipelineConfig) -> Result<ProfileArtifacts> {
    let raw_path = config.raw_path()?;
    let raw = read_csv(&raw_path, CsvFormat::RawExport)?;

    let missing_expected = missing_expected_columns(&raw.schema());
    if !missing_expected.is_empty() {
        log_warning(
            &format!("Expected columns missing from export: {missing_expected:?}"),
            Some(&raw_path),
        );
    }

    let missing_roles = unresolved_roles(&column_names(&raw.schema()));
    if !missing_roles.is_empty() {
        log_warning(
            &format!("No column for required roles {missing_roles:?}; building marts will fail"),
            Some(&raw_path),
        );
    }

    let report = ProfileReport::from_batch(&raw)?;

    let profile_csv = config.profile_csv_path();
    write_csv(&profile_csv, &profile_to_batch(&report.profiles)?, CsvFormat::Clean.delimiter())?;

    let report_md = config.profile_report_path();
    ensure_parent_dir(&report_md)?;
    let generated = Local::now().format("%Y-%m-%d %H:%M").to_string();
    fs::write(&report_md, render_markdown(&report, &generated))?;

    log::info!(
        "Profiling done: {} rows, {} columns, {} PII column(s)",
        report.rows,
        report.columns,
        report.pii_columns().len()
    );
    Ok(ProfileArtifacts {
        raw_path,
        profile_csv,
        report_md,
        missing_expected,
        missing_roles,
    })
}
