//! End-to-end export against a mocked lookup service
//!
//! These tests verify that:
//! - The coordinator builds an HTTP lookup client from configuration
//! - Misses and ambiguous matches become skip records
//! - Server errors end the job as failed
//! - Published CSV output can be previewed

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use shelfport::config::parse_config;
use shelfport::core::export::ExportCoordinator;
use shelfport::core::outcome::JobStatus;
use shelfport::core::preview::preview;
use shelfport::domain::{JobId, SkipKind};
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::watch;

async fn coordinator(server: &ServerGuard, dir: &TempDir) -> ExportCoordinator {
    let config = parse_config(&format!(
        r#"
[job]
entity_kind = "user"
identifier_type = "barcode"
chunk_size = 2
formats = ["csv"]

[lookup]
base_url = "{}"
tenant = "diku"
timeout_seconds = 5

[lookup.retry]
max_retries = 0

[storage]
root = "{}"
staging_dir = "{}"

[logging]
local_enabled = false

[[transform.fields]]
header = "Barcode"
path = "barcode"

[[transform.fields]]
header = "Username"
path = "username"
"#,
        server.url(),
        dir.path().join("store").display(),
        dir.path().join("staging").display()
    ))
    .unwrap();

    let (_tx, rx) = watch::channel(false);
    ExportCoordinator::new(config, rx).await.unwrap()
}

fn input(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("barcodes.csv");
    std::fs::write(&path, contents).unwrap();
    path
}

async fn mock_users(server: &mut ServerGuard, barcode: &str, users: serde_json::Value) {
    server
        .mock("GET", "/users")
        .match_query(Matcher::UrlEncoded(
            "query".into(),
            format!("barcode==\"{barcode}\""),
        ))
        .match_header("x-okapi-tenant", "diku")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "users": users }).to_string())
        .create_async()
        .await;
}

#[tokio::test]
async fn test_export_over_http_with_skips_and_preview() {
    let mut server = Server::new_async().await;
    mock_users(
        &mut server,
        "1001",
        json!([{"id": "u1", "barcode": "1001", "username": "ann"}]),
    )
    .await;
    mock_users(&mut server, "1002", json!([])).await;
    mock_users(
        &mut server,
        "1003",
        json!([
            {"id": "u3", "barcode": "1003", "username": "cyd"},
            {"id": "u4", "barcode": "1003", "username": "cyd2"}
        ]),
    )
    .await;
    mock_users(
        &mut server,
        "1004",
        json!([{"id": "u5", "barcode": "1004", "username": "dee"}]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&server, &dir).await;
    let path = input(&dir, "1001\n1002\n1003\n1004\n");

    let outcome = coordinator
        .execute(JobId::new("job-http").unwrap(), &path)
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::CompletedWithErrors);
    assert_eq!(outcome.rows_written, 2);
    let kinds: Vec<(&str, SkipKind)> = outcome
        .skip_records
        .iter()
        .map(|s| (s.identifier.as_str(), s.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![("1002", SkipKind::NotFound), ("1003", SkipKind::Duplicate)]
    );

    let shown = preview(
        coordinator.storage().as_ref(),
        "exports/job-http/job-http.csv",
        1,
    )
    .await
    .unwrap();
    assert_eq!(shown.headers, vec!["Barcode", "Username"]);
    assert_eq!(shown.rows, vec![vec!["1001", "ann"]]);
}

#[tokio::test]
async fn test_server_error_fails_the_job() {
    let mut server = Server::new_async().await;
    mock_users(
        &mut server,
        "1001",
        json!([{"id": "u1", "barcode": "1001", "username": "ann"}]),
    )
    .await;
    server
        .mock("GET", "/users")
        .match_query(Matcher::UrlEncoded(
            "query".into(),
            "barcode==\"1002\"".into(),
        ))
        .with_status(503)
        .with_body("module restarting")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&server, &dir).await;
    let path = input(&dir, "1001\n1002\n");

    let outcome = coordinator
        .execute(JobId::new("job-503").unwrap(), &path)
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.rows_written, 0);
    assert!(outcome
        .error
        .as_deref()
        .unwrap()
        .contains("module restarting"));
}
