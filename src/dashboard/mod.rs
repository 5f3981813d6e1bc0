//! Read-only dashboard over the marts.
//!
//! The page is rebuilt on every request from cached query results. Anything
//! that keeps the charts from being drawn (no warehouse file yet, missing
//! views, no year data) is shown on the page instead of failing the request.

pub mod cache;
pub mod render;
pub mod server;
pub mod session;

use std::path::PathBuf;

pub use cache::QueryCache;
pub use render::render_page;
pub use server::{router, serve};
pub use session::{DashboardSession, Diagnostics, QueryKey, RelationStatus};

/// Data behind the three charts of one year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartData {
    pub year: i32,
    pub years: Vec<i32>,
    pub top_companies: Vec<(String, i64)>,
    pub geo: Vec<(String, i64)>,
    pub trends: Vec<(i32, i64)>,
}

/// What the page shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardView {
    /// The warehouse file does not exist yet
    Blocked { warehouse_path: PathBuf },
    /// The marts cannot be charted; `error` holds the failure text, if any
    Diagnostics {
        error: Option<String>,
        report: Option<Diagnostics>,
    },
    Charts(ChartData),
}

impl DashboardView {
    fn diagnostics(session: &DashboardSession, error: Option<String>) -> Self {
        let report = match session.diagnostics() {
            Ok(report) => Some(report),
            Err(e) => {
                log::warn!("Warehouse diagnostics failed: {e}");
                None
            }
        };
        Self::Diagnostics { error, report }
    }
}

/// Build the view for `requested_year`
///
/// The requested year is used when it has data, otherwise the first year.
pub fn build_view(session: &mut DashboardSession, requested_year: Option<i32>) -> DashboardView {
    let years = match session.years() {
        Ok(years) => years,
        Err(e) => return DashboardView::diagnostics(session, Some(e.to_string())),
    };
    let Some(&first) = years.first() else {
        return DashboardView::diagnostics(session, None);
    };
    let year = requested_year.filter(|y| years.contains(y)).unwrap_or(first);

    let charts = session.top_companies(year).and_then(|top_companies| {
        Ok(ChartData {
            year,
            years,
            top_companies,
            geo: session.geo(year)?,
            trends: session.trends()?,
        })
    });
    match charts {
        Ok(charts) => DashboardView::Charts(charts),
        Err(e) => DashboardView::diagnostics(session, Some(e.to_string())),
    }
}

/// Dashboard state shared by the request handlers
///
/// The session is opened on the first request that finds the warehouse file
/// and dropped on refresh, which also releases the file for the pipeline.
pub struct Dashboard {
    warehouse_path: PathBuf,
    session: Option<DashboardSession>,
}

impl Dashboard {
    #[must_use]
    pub const fn new(warehouse_path: PathBuf) -> Self {
        Self {
            warehouse_path,
            session: None,
        }
    }

    /// Current view, opening the warehouse if needed
    pub fn view(&mut self, requested_year: Option<i32>) -> DashboardView {
        if self.session.is_none() {
            if !self.warehouse_path.is_file() {
                return DashboardView::Blocked {
                    warehouse_path: self.warehouse_path.clone(),
                };
            }
            match DashboardSession::open(&self.warehouse_path) {
                Ok(session) => self.session = Some(session),
                Err(e) => {
                    return DashboardView::Diagnostics {
                        error: Some(e.to_string()),
                        report: None,
                    };
                }
            }
        }
        match self.session.as_mut() {
            Some(session) => build_view(session, requested_year),
            None => DashboardView::Blocked {
                warehouse_path: self.warehouse_path.clone(),
            },
        }
    }

    /// Drop cached results and close the warehouse
    pub fn refresh(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.clear_cache();
        }
        log::info!("Dashboard cache cleared");
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marts::build_marts;
    use crate::warehouse::{CLEAN_TABLE, open_read_write};
    use duckdb::Connection;

    const ROWS: &str = "('M2 2023', 'Darty', 'BE'), ('M2 2024', 'capgemini', 'FR')";

    fn create_clean_table(conn: &Connection, rows: &str) {
        conn.execute_batch(&format!(
            "CREATE TABLE {CLEAN_TABLE} AS SELECT * FROM (VALUES {rows}) \
             t(\"Promotion\", \"Société\", \"Pays\")"
        ))
        .unwrap();
    }

    fn session_with(rows: &str) -> DashboardSession {
        let mut conn = Connection::open_in_memory().unwrap();
        create_clean_table(&conn, rows);
        build_marts(&mut conn).unwrap();
        DashboardSession::from_connection(conn)
    }

    #[test]
    fn test_build_view_selects_requested_year() {
        let mut session = session_with(ROWS);
        let DashboardView::Charts(charts) = build_view(&mut session, Some(2024)) else {
            panic!("expected charts");
        };
        assert_eq!(charts.year, 2024);
        assert_eq!(charts.years, vec![2023, 2024]);
        assert_eq!(charts.top_companies, vec![("capgemini".to_string(), 1)]);
        assert_eq!(charts.geo, vec![("FR".to_string(), 1)]);
        assert_eq!(charts.trends, vec![(2023, 1), (2024, 1)]);
    }

    #[test]
    fn test_build_view_falls_back_to_first_year() {
        let mut session = session_with(ROWS);
        for requested in [None, Some(1999)] {
            let DashboardView::Charts(charts) = build_view(&mut session, requested) else {
                panic!("expected charts");
            };
            assert_eq!(charts.year, 2023);
            assert_eq!(charts.top_companies, vec![("Darty".to_string(), 1)]);
        }
    }

    #[test]
    fn test_build_view_without_years_shows_diagnostics() {
        let mut session = session_with("('inconnue', 'Darty', 'BE')");
        match build_view(&mut session, None) {
            DashboardView::Diagnostics { error, report } => {
                assert_eq!(error, None);
                assert_eq!(report.unwrap().rows_with_year, Ok(0));
            }
            other => panic!("expected diagnostics, got {other:?}"),
        }
    }

    #[test]
    fn test_build_view_without_marts_shows_error() {
        let conn = Connection::open_in_memory().unwrap();
        create_clean_table(&conn, ROWS);
        let mut session = DashboardSession::from_connection(conn);
        match build_view(&mut session, None) {
            DashboardView::Diagnostics { error, report } => {
                assert!(error.unwrap().contains(crate::marts::MART_TOP_COMPANIES));
                assert_eq!(report.unwrap().relations.len(), 1);
            }
            other => panic!("expected diagnostics, got {other:?}"),
        }
    }

    #[test]
    fn test_dashboard_recovers_once_warehouse_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warehouse").join("stages.duckdb");
        let mut dashboard = Dashboard::new(path.clone());

        assert_eq!(
            dashboard.view(None),
            DashboardView::Blocked {
                warehouse_path: path.clone()
            }
        );
        assert!(!dashboard.is_open());

        {
            let mut conn = open_read_write(&path).unwrap();
            create_clean_table(&conn, ROWS);
            build_marts(&mut conn).unwrap();
        }

        assert!(matches!(dashboard.view(Some(2024)), DashboardView::Charts(_)));
        assert!(dashboard.is_open());
        dashboard.refresh();
        assert!(!dashboard.is_open());
    }
}
