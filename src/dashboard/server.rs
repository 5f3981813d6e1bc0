//! HTTP surface of the dashboard.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Query, State};
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tokio::net::TcpListener;

use super::{Dashboard, render_page};
use crate::config::PipelineConfig;
use crate::error::Result;

/// Dashboard state shared across requests; one query runs at a time
pub type SharedDashboard = Arc<Mutex<Dashboard>>;

#[derive(Debug, Default, Deserialize)]
pub struct YearParams {
    pub year: Option<i32>,
}

async fn index(
    State(dashboard): State<SharedDashboard>,
    Query(params): Query<YearParams>,
) -> Html<String> {
    let view = dashboard
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .view(params.year);
    Html(render_page(&view))
}

async fn refresh(
    State(dashboard): State<SharedDashboard>,
    Form(params): Form<YearParams>,
) -> Redirect {
    dashboard
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .refresh();
    match params.year {
        Some(year) => Redirect::to(&format!("/?year={year}")),
        None => Redirect::to("/"),
    }
}

/// Routes of the dashboard: `GET /?year=` and `POST /refresh`
pub fn router(dashboard: SharedDashboard) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/refresh", post(refresh))
        .with_state(dashboard)
}

/// Serve the dashboard for the warehouse named by `config` until the process stops
pub async fn serve(config: &PipelineConfig, addr: SocketAddr) -> Result<()> {
    let warehouse_path = config.warehouse_path();
    if !warehouse_path.is_file() {
        log::warn!(
            "Warehouse {} not found yet; the page will say so until the pipeline has run",
            warehouse_path.display()
        );
    }
    let dashboard = Arc::new(Mutex::new(Dashboard::new(warehouse_path)));

    let listener = TcpListener::bind(addr).await?;
    log::info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(dashboard)).await?;
    Ok(())
}
