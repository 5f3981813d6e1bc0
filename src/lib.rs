//! Batch pipeline and dashboard for the internship ("stages") export.
//!
//! The raw CSV export is profiled, stripped of personal data, loaded into an
//! embedded DuckDB warehouse and aggregated into marts that a small web
//! dashboard charts. Stages communicate only through files under the project
//! root described by [`PipelineConfig`].

pub mod clean;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod marts;
pub mod pipeline;
pub mod profile;
pub mod schema;
pub mod utils;
pub mod warehouse;

// Core types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Stage, StageReport, run_all};

// Stage entry points
pub use clean::{anonymize, run_cleaner};
pub use marts::{build_marts, run_mart_builder};
pub use profile::{ProfileReport, run_profiler};
pub use warehouse::{load_clean_file, run_loader};

// Dashboard
pub use dashboard::{Dashboard, DashboardSession, DashboardView, build_view};

// Arrow types
pub use arrow::record_batch::RecordBatch;
