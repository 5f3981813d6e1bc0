mod utils;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use stages_pipeline::dashboard::{Dashboard, router};
use stages_pipeline::{run_all, run_cleaner, run_loader};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use utils::TestProject;

async fn spawn_dashboard(project: &TestProject) -> SocketAddr {
    let dashboard = Arc::new(Mutex::new(Dashboard::new(project.config.warehouse_path())));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router(dashboard)).await });
    addr
}

async fn request(addr: SocketAddr, method: &str, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_page_recovers_after_pipeline_run() {
    let project = TestProject::scenario();
    let addr = spawn_dashboard(&project).await;

    let blocked = request(addr, "GET", "/", "").await;
    assert!(blocked.starts_with("HTTP/1.1 200"));
    assert!(blocked.contains("Warehouse not found"));
    assert!(!blocked.contains("<svg"));

    run_all(&project.config).unwrap();

    let first = request(addr, "GET", "/", "").await;
    assert!(first.contains("Top companies in 2023"));
    assert!(first.contains("capgemini"));
    assert_eq!(first.matches("<svg").count(), 3);

    let selected = request(addr, "GET", "/?year=2024", "").await;
    assert!(selected.contains("<option value=\"2024\" selected>2024</option>"));
    assert!(selected.contains("Countries in 2024"));

    let unknown = request(addr, "GET", "/?year=1999", "").await;
    assert!(unknown.contains("Top companies in 2023"));
}

#[tokio::test]
async fn test_refresh_redirects_to_selected_year() {
    let project = TestProject::scenario();
    run_all(&project.config).unwrap();
    let addr = spawn_dashboard(&project).await;

    request(addr, "GET", "/?year=2024", "").await;
    let response = request(addr, "POST", "/refresh", "year=2024").await;
    assert!(response.starts_with("HTTP/1.1 303"));
    assert!(response.to_lowercase().contains("location: /?year=2024"));

    let after = request(addr, "GET", "/?year=2024", "").await;
    assert!(after.contains("Top companies in 2024"));
}

#[tokio::test]
async fn test_missing_marts_show_diagnostics() {
    let project = TestProject::scenario();
    run_cleaner(&project.config).unwrap();
    run_loader(&project.config).unwrap();
    let addr = spawn_dashboard(&project).await;

    let page = request(addr, "GET", "/", "").await;
    assert!(page.starts_with("HTTP/1.1 200"));
    assert!(page.contains("Diagnostics"));
    assert!(page.contains("Query failed"));
    assert!(page.contains("stages_clean"));
}
