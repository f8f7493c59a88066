/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for vidsub-adapter tests

use serde_json::{Value, json};
use vidsub_adapter::{ClientConfig, TaskServiceClient};
use wiremock::{MockServer, ResponseTemplate};

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client rooted at `{server}/api`, matching the real service layout
pub fn client_for(server: &MockServer) -> TaskServiceClient {
    TaskServiceClient::with_config_and_base_url(
        ClientConfig::default(),
        &format!("{}/api", server.uri()),
    )
    .expect("client init")
}

/// Successful envelope carrying `data`
pub fn ok_envelope(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 0,
        "msg": "success",
        "data": data,
    }))
}

/// Failed envelope with the given code and message
pub fn error_envelope(code: i32, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": code,
        "msg": msg,
        "data": null,
    }))
}
