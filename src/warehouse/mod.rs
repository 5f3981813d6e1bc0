//! Embedded analytical warehouse.
//!
//! One DuckDB file holds the `stages_clean` base table and the views built on
//! top of it. The loader replaces the table wholesale; nothing is appended or
//! merged.

use std::path::{Path, PathBuf};
use std::time::Instant;

use duckdb::{AccessMode, Config, Connection, params};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::error::util::{ensure_file_exists, ensure_parent_dir};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Base table holding the clean records
pub const CLEAN_TABLE: &str = "stages_clean";

/// Quote an identifier for use in SQL text
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for use in SQL text
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Open the warehouse for writing, creating the file and its directory if needed
pub fn open_read_write(path: &Path) -> Result<Connection> {
    ensure_parent_dir(path)?;
    Ok(Connection::open(path)?)
}

/// Open an existing warehouse without write access
pub fn open_read_only(path: &Path) -> Result<Connection> {
    ensure_file_exists(path, "warehouse")?;
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    Ok(Connection::open_with_flags(path, config)?)
}

/// Replace `stages_clean` with the contents of the clean CSV file
///
/// Column types are inferred by DuckDB from the file. The replacement happens
/// in one transaction, so a failed load leaves the previous table in place.
/// Returns the number of rows loaded.
pub fn load_clean_file(conn: &mut Connection, clean_path: &Path) -> Result<usize> {
    ensure_file_exists(clean_path, "clean file")?;
    let source = quote_literal(&clean_path.to_string_lossy());

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {CLEAN_TABLE} AS \
         SELECT * FROM read_csv_auto({source}, sep=',', header=true)"
    ))?;
    let rows: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM {CLEAN_TABLE}"), [], |row| {
        row.get(0)
    })?;
    tx.commit()?;

    Ok(usize::try_from(rows).unwrap_or_default())
}

/// Outcome of a loader run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub warehouse_path: PathBuf,
    pub rows: usize,
}

/// Load the clean file into the warehouse file named by `config`
///
/// Fails without touching the warehouse when the clean file is absent.
pub fn run_loader(config: &PipelineConfig) -> Result<LoadSummary> {
    let start = Instant::now();
    let clean_path = config.clean_path();
    ensure_file_exists(&clean_path, "clean file")?;

    let warehouse_path = config.warehouse_path();
    log_operation_start("Loading clean file into", &warehouse_path);
    let mut conn = open_read_write(&warehouse_path)?;
    let rows = load_clean_file(&mut conn, &clean_path)?;
    log_operation_complete("loaded", &warehouse_path, rows, Some(start.elapsed()));

    Ok(LoadSummary {
        warehouse_path,
        rows,
    })
}

/// Column names of a table or view, in declaration order
///
/// An unknown relation yields an empty list.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = 'main' AND table_name = ? ORDER BY ordinal_position",
    )?;
    let columns = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Kind of a warehouse relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

/// A table or view of the warehouse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
}

/// Tables and views of the main schema, sorted by name
pub fn list_relations(conn: &Connection) -> Result<Vec<Relation>> {
    let mut stmt = conn.prepare(
        "SELECT table_name, table_type FROM information_schema.tables \
         WHERE table_schema = 'main' ORDER BY table_name",
    )?;
    let relations = stmt
        .query_map([], |row| {
            let name: String = row.get(0)?;
            let kind: String = row.get(1)?;
            Ok(Relation {
                name,
                kind: if kind == "VIEW" {
                    RelationKind::View
                } else {
                    RelationKind::Table
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(relations)
}

/// Number of rows in a table or view
pub fn row_count(conn: &Connection, relation: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(relation));
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}
