//! Analytics view and marts.
//!
//! All four relations are plain views over `stages_clean`: they hold no data
//! and are dropped and recreated on every build. Which columns feed the
//! company, country and year values is decided up front by probing the
//! table, so a missing required column fails before any view is touched.

use std::path::PathBuf;

use duckdb::Connection;

use crate::config::PipelineConfig;
use crate::error::util::ensure_file_exists;
use crate::error::{PipelineError, Result};
use crate::schema::{COMPANY, COUNTRY, ColumnAliases, YEAR_SOURCES};
use crate::warehouse::{CLEAN_TABLE, open_read_write, quote_ident, quote_literal, table_columns};

/// Clean records plus the derived year, company and country
pub const ANALYTICS_VIEW: &str = "stages_analytics";
/// Internship counts per (year, company)
pub const MART_TOP_COMPANIES: &str = "mart_top_companies";
/// Internship counts per (year, country)
pub const MART_GEO: &str = "mart_geo";
/// Internship counts per year
pub const MART_TRENDS: &str = "mart_trends";

/// Every view built here, in build order
pub const VIEWS: [&str; 4] = [ANALYTICS_VIEW, MART_TOP_COMPANIES, MART_GEO, MART_TRENDS];

/// Derived column names of the analytics view
pub const YEAR_COLUMN: &str = "annee";
pub const COMPANY_COLUMN: &str = "entreprise";
pub const COUNTRY_COLUMN: &str = "pays";
/// Count column of every mart
pub const COUNT_COLUMN: &str = "nb_stages";

/// A four-digit year starting with "20"
pub const YEAR_PATTERN: &str = r"(20\d{2})";

const MART_TOP_COMPANIES_SQL: &str = "SELECT annee, entreprise, COUNT(*) AS nb_stages \
     FROM stages_analytics \
     WHERE annee IS NOT NULL AND entreprise IS NOT NULL \
     GROUP BY annee, entreprise";

const MART_GEO_SQL: &str = "SELECT annee, pays, COUNT(*) AS nb_stages \
     FROM stages_analytics \
     WHERE annee IS NOT NULL AND pays IS NOT NULL \
     GROUP BY annee, pays";

const MART_TRENDS_SQL: &str = "SELECT annee, COUNT(*) AS nb_stages \
     FROM stages_analytics \
     WHERE annee IS NOT NULL \
     GROUP BY annee";

/// Column choices for the analytics view, resolved against `stages_clean`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MartPlan {
    /// Present company aliases, highest priority first (never empty)
    pub company_columns: Vec<&'static str>,
    /// Present country aliases, highest priority first (never empty)
    pub country_columns: Vec<&'static str>,
    /// Present year sources, highest priority first (may be empty)
    pub year_sources: Vec<&'static str>,
    /// Base columns whose names clash with a derived column; identifiers are
    /// case-insensitive in the warehouse, so `Pays` clashes with `pays`
    pub shadowed: Vec<String>,
}

fn require<S: AsRef<str>>(aliases: &ColumnAliases, columns: &[S]) -> Result<Vec<&'static str>> {
    let present = aliases.present(columns);
    if present.is_empty() {
        return Err(PipelineError::RequiredColumn {
            role: aliases.role,
            table: CLEAN_TABLE.to_string(),
            candidates: aliases.candidate_names(),
        });
    }
    Ok(present)
}

fn coalesce(columns: &[&str]) -> String {
    let args = columns
        .iter()
        .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("COALESCE({args})")
}

impl MartPlan {
    /// Resolve the plan from the column names of `stages_clean`
    ///
    /// # Errors
    /// `RequiredColumn` when no company alias or no country alias is present
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Result<Self> {
        let company_columns = require(&COMPANY, columns)?;
        let country_columns = require(&COUNTRY, columns)?;
        let year_sources = YEAR_SOURCES
            .iter()
            .copied()
            .filter(|source| columns.iter().any(|c| c.as_ref() == *source))
            .collect();
        let shadowed = columns
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| {
                [YEAR_COLUMN, COMPANY_COLUMN, COUNTRY_COLUMN]
                    .iter()
                    .any(|derived| derived.eq_ignore_ascii_case(c))
            })
            .map(str::to_string)
            .collect();

        Ok(Self {
            company_columns,
            country_columns,
            year_sources,
            shadowed,
        })
    }

    /// SQL expression of the year: first 20xx match over the sources, as INTEGER
    ///
    /// A source without a match contributes NULL so the next one is tried.
    #[must_use]
    pub fn year_expr(&self) -> String {
        if self.year_sources.is_empty() {
            return "CAST(NULL AS INTEGER)".to_string();
        }
        let pattern = quote_literal(YEAR_PATTERN);
        let matches = self
            .year_sources
            .iter()
            .map(|source| {
                format!(
                    "NULLIF(regexp_extract(CAST({} AS VARCHAR), {pattern}, 1), '')",
                    quote_ident(source)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CAST(COALESCE({matches}) AS INTEGER)")
    }

    /// `CREATE VIEW` statement of the analytics view
    #[must_use]
    pub fn analytics_view_sql(&self) -> String {
        let projection = if self.shadowed.is_empty() {
            "*".to_string()
        } else {
            let excluded = self
                .shadowed
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("* EXCLUDE ({excluded})")
        };
        format!(
            "CREATE VIEW {ANALYTICS_VIEW} AS SELECT {projection}, \
             {} AS {YEAR_COLUMN}, {} AS {COMPANY_COLUMN}, {} AS {COUNTRY_COLUMN} \
             FROM {CLEAN_TABLE}",
            self.year_expr(),
            coalesce(&self.company_columns),
            coalesce(&self.country_columns),
        )
    }

    /// Every statement of a build: drops first, then creates in dependency order
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        let mut statements: Vec<String> = VIEWS
            .iter()
            .rev()
            .map(|view| format!("DROP VIEW IF EXISTS {view}"))
            .collect();
        statements.push(self.analytics_view_sql());
        statements.push(format!("CREATE VIEW {MART_TOP_COMPANIES} AS {MART_TOP_COMPANIES_SQL}"));
        statements.push(format!("CREATE VIEW {MART_GEO} AS {MART_GEO_SQL}"));
        statements.push(format!("CREATE VIEW {MART_TRENDS} AS {MART_TRENDS_SQL}"));
        statements
    }
}

/// Rebuild the analytics view and the marts on an open warehouse
///
/// The column probe runs before any DDL and all statements run in one
/// transaction, so a failure leaves the previous views as they were.
pub fn build_marts(conn: &mut Connection) -> Result<MartPlan> {
    let columns = table_columns(conn, CLEAN_TABLE)?;
    if columns.is_empty() {
        return Err(PipelineError::MissingTable {
            table: CLEAN_TABLE.to_string(),
        });
    }
    let plan = MartPlan::from_columns(&columns)?;
    if plan.year_sources.is_empty() {
        log::warn!(
            "None of {YEAR_SOURCES:?} present in {CLEAN_TABLE}; every year will be NULL and the marts empty"
        );
    }

    let tx = conn.transaction()?;
    for statement in plan.statements() {
        log::debug!("{statement}");
        tx.execute_batch(&statement)?;
    }
    tx.commit()?;

    log::info!(
        "Built {} views (company from {:?}, country from {:?}, year from {:?})",
        VIEWS.len(),
        plan.company_columns,
        plan.country_columns,
        plan.year_sources
    );
    Ok(plan)
}

/// Outcome of a mart build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MartSummary {
    pub warehouse_path: PathBuf,
    pub plan: MartPlan,
}

/// Rebuild the views in the warehouse file named by `config`
pub fn run_mart_builder(config: &PipelineConfig) -> Result<MartSummary> {
    let warehouse_path = config.warehouse_path();
    ensure_file_exists(&warehouse_path, "warehouse")?;
    let mut conn = open_read_write(&warehouse_path)?;
    let plan = build_marts(&mut conn)?;
    Ok(MartSummary {
        warehouse_path,
        plan,
    })
}
