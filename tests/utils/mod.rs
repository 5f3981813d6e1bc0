//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use duckdb::Connection;
use stages_pipeline::PipelineConfig;
use tempfile::TempDir;

/// Header of the export, in the order the source system writes it
pub const RAW_HEADER: &str = "Nom étudiant;email étudiant;Programme;Promotion;Sujet;\
    Domaine de stage;Société;Adresse société;Ville;Code postal;Pays";

/// Two students, one per cohort, both at Capgemini in France
pub const SCENARIO_ROWS: [&str; 2] = [
    "Dupont;j@x.fr;M2;Promo2024;SujetA;IT;Capgemini;1 rue de la Paix;Paris;75000;FR",
    "Martin;k@x.fr;M2;Promo2023;SujetB;IT;cap gemini;2 quai Perrache;Lyon;69000;fr",
];

/// Encode text the way the source system does: one byte per code point
///
/// # Panics
/// When `text` holds a character outside Latin-1
#[must_use]
pub fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).expect("character outside Latin-1"))
        .collect()
}

/// Raw export text from a header and data lines
#[must_use]
pub fn raw_csv(header: &str, rows: &[&str]) -> String {
    let mut text = header.to_string();
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

/// Temporary project root with an empty standard layout
pub struct TestProject {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

impl TestProject {
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = PipelineConfig::new(dir.path());
        Self { dir, config }
    }

    /// Project whose raw export holds `rows` under `header`
    #[must_use]
    pub fn with_raw(header: &str, rows: &[&str]) -> Self {
        let project = Self::new();
        project.write_raw(&project.config.raw_filename, &raw_csv(header, rows));
        project
    }

    /// Project holding the two-row scenario export
    #[must_use]
    pub fn scenario() -> Self {
        Self::with_raw(RAW_HEADER, &SCENARIO_ROWS)
    }

    /// Write a Latin-1 encoded file into the raw directory
    pub fn write_raw(&self, filename: &str, text: &str) -> PathBuf {
        fs::create_dir_all(&self.config.raw_dir).expect("raw dir");
        let path = self.config.raw_dir.join(filename);
        fs::write(&path, latin1(text)).expect("raw file");
        path
    }

    /// Text of the clean file
    #[must_use]
    pub fn clean_text(&self) -> String {
        fs::read_to_string(self.config.clean_path()).expect("clean file")
    }

    /// Read-only connection to the warehouse
    #[must_use]
    pub fn warehouse(&self) -> Connection {
        stages_pipeline::warehouse::open_read_only(&self.config.warehouse_path())
            .expect("warehouse")
    }
}

/// Rows of a two-column query, as (key, count) pairs
pub fn counts<K: duckdb::types::FromSql>(conn: &Connection, sql: &str) -> Vec<(K, i64)> {
    let mut stmt = conn.prepare(sql).expect("prepare");
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("rows");
    rows
}

/// Every row of a table rendered as text, sorted
pub fn table_dump(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("SELECT CAST(r AS VARCHAR) AS line FROM {table} AS r ORDER BY line"))
        .expect("prepare");
    let rows = stmt
        .query_map([], |row| row.get(0))
        .expect("query")
        .collect::<Result<Vec<String>, _>>()
        .expect("rows");
    rows
}
