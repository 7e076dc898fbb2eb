//! Health endpoint integration tests
//!
//! Tests for the health check endpoints:
//! - GET /health - Full health check with upstream status
//! - GET /health/ready - Readiness probe
//! - GET /health/live - Liveness probe

use axum::http::StatusCode;
use serde_json::Value;

use crate::common;

const UPSTREAM_URL: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn test_liveness_always_ok() {
    let server = common::test_server(common::unconfigured(UPSTREAM_URL));
    let response = server.get("/health/live").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_requires_api_key() {
    let server = common::test_server(common::unconfigured(UPSTREAM_URL));
    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let server = common::test_server(common::test_config(UPSTREAM_URL));
    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_full_health_structure() {
    let server = common::test_server(common::test_config(UPSTREAM_URL));
    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
    assert!(body["timestamp"].is_string());
    assert_eq!(body["checks"]["upstream"]["provider"], "openai");
    assert_eq!(body["checks"]["upstream"]["configured"], true);
}

#[tokio::test]
async fn test_full_health_unconfigured() {
    let server = common::test_server(common::unconfigured(UPSTREAM_URL));
    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["checks"]["upstream"]["error"], "API key not configured");
}
