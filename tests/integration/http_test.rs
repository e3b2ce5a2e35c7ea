//! HTTP client tests against a local wiremock server.

use std::sync::Arc;
use std::time::Duration;

use nlq_console::api::{HttpServerApi, ServerApi, UploadFile};
use nlq_console::config::PollingConfig;
use nlq_console::error::ConsoleError;
use nlq_console::jobs::JobStatus;
use nlq_console::query::{QueryResults, QueryType};
use nlq_console::session::Session;
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpServerApi {
    HttpServerApi::new(Url::parse(&server.uri()).unwrap()).unwrap()
}

#[tokio::test]
async fn test_upload_sends_multipart_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-documents"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains(r#"name="files"; filename="cv.pdf""#))
        .and(body_string_contains(r#"name="files"; filename="notes.txt""#))
        .and(body_string_contains("Remote work twice a week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "5b1c",
            "status": "started",
            "total_files": 2,
            "message": "Processing 2 files"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let files = vec![
        UploadFile::new("cv.pdf", "%PDF-1.4").with_mime("application/pdf"),
        UploadFile::new("notes.txt", "Remote work twice a week"),
    ];
    let response = client(&server).upload_documents(files).await.unwrap();

    assert_eq!(response.job_id.as_deref(), Some("5b1c"));
    assert_eq!(response.total_files, Some(2));
}

#[tokio::test]
async fn test_query_posts_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .and(body_json(json!({"query": "How many employees?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query_type": "sql",
            "results": [{"count": 42}],
            "sources": ["database"],
            "sql_query": "SELECT COUNT(*) AS count FROM employees",
            "performance_metrics": {"response_time": 0.05, "cache_hit": false}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client(&server).query("How many employees?").await.unwrap();

    assert_eq!(envelope.query_type(), QueryType::Sql);
    assert_eq!(envelope.sources(), ["database"]);
    match envelope.results() {
        QueryResults::Sql(rows) => assert_eq!(rows[0]["count"], json!(42)),
        other => panic!("Expected sql rows, got {:?}", other),
    }
}

#[tokio::test]
async fn test_query_bad_request_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Database not connected"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).query("list tables").await.unwrap_err();
    assert_eq!(err, ConsoleError::server(400, "Database not connected"));
}

#[tokio::test]
async fn test_query_error_becomes_error_envelope_in_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Database not connected"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/query/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"query": "list tables", "cached": false, "processing_time": 0.0}
        ])))
        .mount(&server)
        .await;

    let session = Session::new(Arc::new(client(&server)), &PollingConfig::default());
    let adapter = session.query("list tables").await.unwrap();

    assert_eq!(adapter.envelope().error_message(), Some("Database not connected"));
    assert_eq!(session.submitter().history().len(), 1);
}

#[tokio::test]
async fn test_connect_posts_connection_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/connect-database"))
        .and(body_json(json!({"connection_string": "sqlite:///hr.db"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Connected",
            "schema": {"tables": {"employees": {"columns": [{"name": "id", "type": "INTEGER"}]}}},
            "tables_count": 1,
            "relationships_count": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .connect_database("sqlite:///hr.db")
        .await
        .unwrap();

    assert_eq!(response.tables_count, Some(1));
    assert_eq!(response.schema.unwrap().table_count(), 1);
}

#[tokio::test]
async fn test_status_poll_decodes_partial_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ingestion-status/5b1c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing",
            "total_files": 3,
            "processed_files": 1,
            "failed_files": 0,
            "files": [],
            "created_at": "2024-05-01T10:00:00"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ingestion-status/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Job not found"})))
        .mount(&server)
        .await;

    let api = client(&server);
    let status = api.ingestion_status("5b1c").await.unwrap();
    assert_eq!(status.status.as_deref(), Some("processing"));
    assert_eq!(status.processed_files, Some(1));
    assert_eq!(status.files, Some(Vec::new()));

    let err = api.ingestion_status("missing").await.unwrap_err();
    assert_eq!(err, ConsoleError::server(404, "Job not found"));
}

#[tokio::test]
async fn test_history_and_metrics_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"query": "employees", "cached": true, "processing_time": 0.2, "query_type": "sql"},
            {"query": "benefits", "cached": false, "processing_time": 1.4}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "database_connected": true,
            "documents_indexed": 7,
            "cache_hit_rate": 0.25,
            "active_jobs": 1,
            "cache_size": 12
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let history = api.query_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].cached);
    assert_eq!(history[1].query_type, None);

    let metrics = api.metrics().await.unwrap();
    assert_eq!(metrics.documents_indexed, Some(7));
    assert_eq!(metrics.cache_size, Some(12));
}

#[tokio::test]
async fn test_non_json_success_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = client(&server).metrics().await.unwrap_err();
    assert!(matches!(err, ConsoleError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let api = HttpServerApi::new(Url::parse("http://127.0.0.1:1").unwrap()).unwrap();
    let err = api.health().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Transport(_)));
}

#[tokio::test]
async fn test_upload_polls_until_completed_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "5b1c",
            "status": "started",
            "total_files": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ingestion-status/5b1c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing",
            "total_files": 2,
            "processed_files": 1,
            "failed_files": 0,
            "files": []
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ingestion-status/5b1c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "total_files": 2,
            "processed_files": 1,
            "failed_files": 1,
            "files": [
                {"filename": "a.pdf", "status": "success", "chunks": 4, "type": "pdf"},
                {"filename": "b.docx", "status": "failed", "error": "encrypted"}
            ]
        })))
        .mount(&server)
        .await;

    let polling = PollingConfig {
        job_interval_ms: 20,
        ..Default::default()
    };
    let session = Session::new(Arc::new(client(&server)), &polling);
    session.start();

    let files = vec![
        UploadFile::new("a.pdf", "one"),
        UploadFile::new("b.docx", "two"),
    ];
    let id = session.upload(files).await.unwrap();
    let job = tokio::time::timeout(Duration::from_secs(10), session.wait_for_job(&id))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.file_names(), ["a.pdf", "b.docx"]);
    assert_eq!(job.file_results()[1].error.as_deref(), Some("encrypted"));

    session.shutdown().await;
}
