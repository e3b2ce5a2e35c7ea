//! Live server tests.
//!
//! Talk HTTP to a real query server. Set NLQ_TEST_SERVER_URL (for example
//! `http://localhost:8000`) to run them; otherwise they are skipped.

use std::sync::Arc;
use std::time::Duration;

use nlq_console::api::{HttpServerApi, ServerApi, UploadFile};
use nlq_console::config::PollingConfig;
use nlq_console::error::ConsoleError;
use nlq_console::session::Session;
use url::Url;

/// Helper to get the test server URL from the environment.
fn get_test_server_url() -> Option<Url> {
    let raw = std::env::var("NLQ_TEST_SERVER_URL").ok()?;
    Url::parse(&raw).ok()
}

/// Helper to create a client for the test server.
fn get_test_api() -> Option<HttpServerApi> {
    HttpServerApi::new(get_test_server_url()?).ok()
}

#[tokio::test]
async fn test_health() {
    let Some(api) = get_test_api() else {
        eprintln!("Skipping test: NLQ_TEST_SERVER_URL not set");
        return;
    };

    let health = api.health().await.unwrap();
    assert!(health.is_healthy());
}

#[tokio::test]
async fn test_metrics_shape() {
    let Some(api) = get_test_api() else {
        eprintln!("Skipping test: NLQ_TEST_SERVER_URL not set");
        return;
    };

    let metrics = api.metrics().await.unwrap();
    assert!(metrics.database_connected.is_some());
    if let Some(rate) = metrics.cache_hit_rate {
        assert!((0.0..=1.0).contains(&rate));
    }
}

#[tokio::test]
async fn test_unknown_job_is_server_error() {
    let Some(api) = get_test_api() else {
        eprintln!("Skipping test: NLQ_TEST_SERVER_URL not set");
        return;
    };

    let err = api
        .ingestion_status("00000000-0000-0000-0000-000000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Server { status: 404, .. }));
}

#[tokio::test]
async fn test_query_returns_tagged_envelope() {
    let Some(api) = get_test_api() else {
        eprintln!("Skipping test: NLQ_TEST_SERVER_URL not set");
        return;
    };

    let session = Session::new(Arc::new(api), &PollingConfig::default());
    // Either a result or an error envelope (e.g. no database connected);
    // never a transport failure against a running server.
    let adapter = session.query("How many employees do we have?").await.unwrap();
    if let Some(message) = adapter.envelope().error_message() {
        assert!(!message.is_empty());
    }
    session.shutdown().await;
}

#[tokio::test]
async fn test_upload_text_file_completes() {
    let Some(api) = get_test_api() else {
        eprintln!("Skipping test: NLQ_TEST_SERVER_URL not set");
        return;
    };

    let polling = PollingConfig {
        job_interval_ms: 500,
        ..Default::default()
    };
    let session = Session::new(Arc::new(api), &polling);
    session.start();

    let file = UploadFile::new(
        "integration-notes.txt",
        "Remote work is allowed two days per week.",
    )
    .with_mime("text/plain");
    let id = session.upload(vec![file]).await.unwrap();

    let job = tokio::time::timeout(Duration::from_secs(120), session.wait_for_job(&id))
        .await
        .expect("ingestion did not finish within 120s")
        .unwrap();
    assert!(job.is_terminal());
    assert!(job.processed_files() + job.failed_files() <= job.total_files());

    session.shutdown().await;
}
