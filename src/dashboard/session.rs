//! Read-only warehouse queries behind the dashboard.

use std::path::Path;

use duckdb::{Connection, params};

use super::cache::QueryCache;
use crate::error::Result;
use crate::marts::{
    ANALYTICS_VIEW, COMPANY_COLUMN, COUNT_COLUMN, COUNTRY_COLUMN, MART_GEO, MART_TOP_COMPANIES,
    MART_TRENDS, YEAR_COLUMN,
};
use crate::warehouse::{Relation, list_relations, open_read_only, row_count};

/// Number of companies shown for a year
pub const TOP_COMPANIES_LIMIT: usize = 20;

/// Identity and arguments of a cached query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Years,
    TopCompanies(i32),
    Geo(i32),
    Trends,
}

/// Row count of one relation, or the error text when counting failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationStatus {
    pub relation: Relation,
    pub rows: std::result::Result<i64, String>,
}

/// What the warehouse looks like when the charts cannot be drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub relations: Vec<RelationStatus>,
    /// Rows of the analytics view with a non-null year
    pub rows_with_year: std::result::Result<i64, String>,
}

fn query_years(conn: &Connection) -> Result<Vec<i32>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT {YEAR_COLUMN} FROM {MART_TOP_COMPANIES} ORDER BY {YEAR_COLUMN}"
    ))?;
    let years = stmt
        .query_map([], |row| row.get::<_, i32>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(years)
}

/// Counts per label for one year, largest first, ties by label
fn query_counts(
    conn: &Connection,
    mart: &str,
    label: &str,
    year: i32,
    limit: Option<usize>,
) -> Result<Vec<(String, i64)>> {
    let limit = limit.map(|n| format!(" LIMIT {n}")).unwrap_or_default();
    let mut stmt = conn.prepare(&format!(
        "SELECT CAST({label} AS VARCHAR), {COUNT_COLUMN} FROM {mart} \
         WHERE {YEAR_COLUMN} = ? ORDER BY {COUNT_COLUMN} DESC, {label}{limit}"
    ))?;
    let counts = stmt
        .query_map(params![year], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(counts)
}

fn query_trends(conn: &Connection) -> Result<Vec<(i32, i64)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {YEAR_COLUMN}, {COUNT_COLUMN} FROM {MART_TRENDS} ORDER BY {YEAR_COLUMN}"
    ))?;
    let trends = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(trends)
}

/// One warehouse connection and the results already fetched through it
///
/// Results are cached per query and argument, one cache per result shape.
pub struct DashboardSession {
    conn: Connection,
    years: QueryCache<QueryKey, Vec<i32>>,
    counts: QueryCache<QueryKey, Vec<(String, i64)>>,
    trends: QueryCache<QueryKey, Vec<(i32, i64)>>,
}

impl DashboardSession {
    /// Open the warehouse file read-only
    pub fn open(warehouse_path: &Path) -> Result<Self> {
        Ok(Self::from_connection(open_read_only(warehouse_path)?))
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            years: QueryCache::new(),
            counts: QueryCache::new(),
            trends: QueryCache::new(),
        }
    }

    /// Years present in the top companies mart, ascending
    pub fn years(&mut self) -> Result<Vec<i32>> {
        let conn = &self.conn;
        self.years
            .get_or_try_insert_with(QueryKey::Years, || query_years(conn))
            .cloned()
    }

    /// Companies with the most internships in `year`
    pub fn top_companies(&mut self, year: i32) -> Result<Vec<(String, i64)>> {
        let conn = &self.conn;
        self.counts
            .get_or_try_insert_with(QueryKey::TopCompanies(year), || {
                query_counts(
                    conn,
                    MART_TOP_COMPANIES,
                    COMPANY_COLUMN,
                    year,
                    Some(TOP_COMPANIES_LIMIT),
                )
            })
            .cloned()
    }

    /// Internships per country in `year`
    pub fn geo(&mut self, year: i32) -> Result<Vec<(String, i64)>> {
        let conn = &self.conn;
        self.counts
            .get_or_try_insert_with(QueryKey::Geo(year), || {
                query_counts(conn, MART_GEO, COUNTRY_COLUMN, year, None)
            })
            .cloned()
    }

    /// Internships per year, ascending by year
    pub fn trends(&mut self) -> Result<Vec<(i32, i64)>> {
        let conn = &self.conn;
        self.trends
            .get_or_try_insert_with(QueryKey::Trends, || query_trends(conn))
            .cloned()
    }

    /// Relation listing and row counts; never cached
    pub fn diagnostics(&self) -> Result<Diagnostics> {
        let relations = list_relations(&self.conn)?
            .into_iter()
            .map(|relation| {
                let rows = row_count(&self.conn, &relation.name).map_err(|e| e.to_string());
                RelationStatus { relation, rows }
            })
            .collect();
        let rows_with_year = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {ANALYTICS_VIEW} WHERE {YEAR_COLUMN} IS NOT NULL"),
                [],
                |row| row.get(0),
            )
            .map_err(|e| e.to_string());

        Ok(Diagnostics {
            relations,
            rows_with_year,
        })
    }

    pub fn clear_cache(&mut self) {
        self.years.clear();
        self.counts.clear();
        self.trends.clear();
    }

    /// Number of cached query results
    #[must_use]
    pub fn cached_queries(&self) -> usize {
        self.years.len() + self.counts.len() + self.trends.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marts::build_marts;
    use crate::warehouse::CLEAN_TABLE;

    fn session_with(rows: &str) -> DashboardSession {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {CLEAN_TABLE} AS SELECT * FROM (VALUES {rows}) \
             t(\"Promotion\", \"Société\", \"Pays\")"
        ))
        .unwrap();
        build_marts(&mut conn).unwrap();
        DashboardSession::from_connection(conn)
    }

    #[test]
    fn test_queries() {
        let mut session = session_with(
            "('M2 2023', 'capgemini', 'FR'), ('M2 2024', 'capgemini', 'FR'), \
             ('M2 2024', 'Darty', 'BE'), ('M2 2024', 'capgemini', 'FR'), \
             ('sans annee', 'Thales', 'FR')",
        );

        assert_eq!(session.years().unwrap(), vec![2023, 2024]);
        assert_eq!(
            session.top_companies(2024).unwrap(),
            vec![("capgemini".to_string(), 2), ("Darty".to_string(), 1)]
        );
        assert_eq!(
            session.geo(2024).unwrap(),
            vec![("FR".to_string(), 2), ("BE".to_string(), 1)]
        );
        assert_eq!(session.trends().unwrap(), vec![(2023, 1), (2024, 3)]);
        assert!(session.top_companies(2030).unwrap().is_empty());
    }

    #[test]
    fn test_top_companies_limit() {
        let rows = (0..25)
            .map(|i| format!("('2024', 'company {i:02}', 'FR')"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut session = session_with(&rows);
        let top = session.top_companies(2024).unwrap();
        assert_eq!(top.len(), TOP_COMPANIES_LIMIT);
        assert_eq!(top[0].0, "company 00");
    }

    #[test]
    fn test_results_are_cached_until_cleared() {
        let mut session = session_with("('2024', 'capgemini', 'FR')");
        session.years().unwrap();
        session.trends().unwrap();
        session.years().unwrap();
        assert_eq!(session.cached_queries(), 2);

        // Same year, different marts: two entries
        session.top_companies(2024).unwrap();
        session.geo(2024).unwrap();
        session.geo(2024).unwrap();
        assert_eq!(session.cached_queries(), 4);
        assert_eq!(session.geo(2024).unwrap(), vec![("FR".to_string(), 1)]);
        assert_eq!(
            session.top_companies(2024).unwrap(),
            vec![("capgemini".to_string(), 1)]
        );

        session.clear_cache();
        assert_eq!(session.cached_queries(), 0);
    }

    #[test]
    fn test_failed_query_is_retried() {
        let conn = Connection::open_in_memory().unwrap();
        let mut session = DashboardSession::from_connection(conn);
        assert!(session.years().is_err());
        assert_eq!(session.cached_queries(), 0);
    }

    #[test]
    fn test_diagnostics() {
        let session = session_with("('2024', 'capgemini', 'FR'), ('n/a', 'Darty', 'FR')");
        let report = session.diagnostics().unwrap();

        let names = report
            .relations
            .iter()
            .map(|status| status.relation.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![MART_GEO, MART_TOP_COMPANIES, MART_TRENDS, ANALYTICS_VIEW, CLEAN_TABLE]
        );
        let clean = report
            .relations
            .iter()
            .find(|status| status.relation.name == CLEAN_TABLE)
            .unwrap();
        assert_eq!(clean.rows, Ok(2));
        assert_eq!(report.rows_with_year, Ok(1));
    }

    #[test]
    fn test_diagnostics_without_views() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE stages_clean (x INTEGER)").unwrap();
        let report = DashboardSession::from_connection(conn).diagnostics().unwrap();
        assert_eq!(report.relations.len(), 1);
        assert!(report.rows_with_year.is_err());
    }
}
