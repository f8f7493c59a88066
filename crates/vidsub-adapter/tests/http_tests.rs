/*
[INPUT]:  Mock HTTP responses
[OUTPUT]: Test results for HTTP client
[POS]:    Integration tests - HTTP endpoints
[UPDATE]: When HTTP endpoints change
*/

mod common;

use common::{client_for, error_envelope, ok_envelope, setup_mock_server};
use serde_json::json;
use std::time::Duration;
use tokio_test::assert_ok;
use vidsub_adapter::{AdapterError, ClientConfig, TaskId, TaskServiceClient, TaskStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[test]
fn test_client_creation() {
    let client = assert_ok!(TaskServiceClient::new());
    assert_eq!(client.base_url().as_str(), "http://localhost:8080/api/");
}

#[test]
fn test_client_with_config() {
    let config = ClientConfig {
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(1),
    };
    let _client = assert_ok!(TaskServiceClient::with_config(config));
}

#[tokio::test]
async fn test_task_lifecycle_statuses() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/video/task/5"))
        .respond_with(ok_envelope(json!({"id": 5, "status": "PROCESSING", "progress": 10})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/video/task/5"))
        .respond_with(ok_envelope(json!({
            "id": 5,
            "status": "COMPLETED",
            "progress": 100,
            "subtitlePath": "/data/5.srt"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let id = TaskId::from(5);

    let first = assert_ok!(client.get_task(&id).await);
    assert_eq!(first.status, TaskStatus::Processing);

    let second = assert_ok!(client.get_task(&id).await);
    assert_eq!(second.status, TaskStatus::Completed);
    assert_eq!(second.progress(), Some(100));
    assert_eq!(second.payload.get("subtitlePath"), Some(&json!("/data/5.srt")));
}

#[tokio::test]
async fn test_remote_failure_preserves_message() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/video/task/404"))
        .respond_with(error_envelope(500, "获取任务状态失败: 任务不存在"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_task(&TaskId::new("404"))
        .await
        .expect_err("missing task");

    assert_eq!(err.server_message(), Some("获取任务状态失败: 任务不存在"));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/video/tasks"))
        .respond_with(ok_envelope(json!([])).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = assert_ok!(TaskServiceClient::with_config_and_base_url(
        ClientConfig {
            timeout: Duration::from_millis(50),
            connect_timeout: Duration::from_millis(50),
        },
        &format!("{}/api", server.uri()),
    ));

    let err = client.list_tasks().await.expect_err("should time out");
    assert!(matches!(err, AdapterError::Timeout { .. }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = assert_ok!(std::net::TcpListener::bind("127.0.0.1:0"));
    let port = assert_ok!(listener.local_addr()).port();
    drop(listener);

    let client = assert_ok!(TaskServiceClient::with_config_and_base_url(
        ClientConfig::default(),
        &format!("http://127.0.0.1:{port}/api"),
    ));

    let err = client.list_tasks().await.expect_err("server is gone");
    assert!(err.is_transport());
    assert!(err.server_message().is_none());
}

#[tokio::test]
async fn test_malformed_success_body() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/video/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_tasks().await.expect_err("not json");
    assert!(matches!(err, AdapterError::Serialization(_)));
}
