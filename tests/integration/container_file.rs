//! Container file download integration tests
//!
//! GET /api/playground/container-file proxies code interpreter output.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;
use crate::mocks::*;

#[tokio::test]
async fn test_download_streams_file() {
    let mock = MockOpenAI::start().await;
    mock.mock_container_file("cntr_1", "file_9", b"a,b\n1,2\n").await;

    let server = common::test_server(common::test_config(&mock.uri()));
    let response = server
        .get("/api/playground/container-file")
        .add_query_param("container_id", "cntr_1")
        .add_query_param("file_id", "file_9")
        .add_query_param("filename", "data.csv")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/octet-stream"
    );
    assert_eq!(
        response.header("content-disposition").to_str().unwrap(),
        "attachment; filename=\"data.csv\""
    );
    assert_eq!(response.text(), "a,b\n1,2\n");
}

#[tokio::test]
async fn test_download_defaults_filename() {
    let mock = MockOpenAI::start().await;
    mock.mock_container_file("cntr_1", "file_2", b"png").await;

    let server = common::test_server(common::test_config(&mock.uri()));
    let response = server
        .get("/api/playground/container-file")
        .add_query_param("container_id", "cntr_1")
        .add_query_param("file_id", "file_2")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header("content-disposition").to_str().unwrap(),
        "attachment; filename=\"file\""
    );
}

#[tokio::test]
async fn test_download_requires_ids() {
    let mock = MockOpenAI::start().await;
    let server = common::test_server(common::test_config(&mock.uri()));

    let response = server
        .get("/api/playground/container-file")
        .add_query_param("container_id", "cntr_1")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Missing container_id or file_id");
}

#[tokio::test]
async fn test_download_without_key() {
    let mock = MockOpenAI::start().await;
    let server = common::test_server(common::unconfigured(&mock.uri()));

    let response = server
        .get("/api/playground/container-file")
        .add_query_param("container_id", "cntr_1")
        .add_query_param("file_id", "file_9")
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_download_mirrors_upstream_status() {
    let mock = MockOpenAI::start().await;
    mock.mock_container_file_status("cntr_1", "missing", 404).await;

    let server = common::test_server(common::test_config(&mock.uri()));
    let response = server
        .get("/api/playground/container-file")
        .add_query_param("container_id", "cntr_1")
        .add_query_param("file_id", "missing")
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Failed to fetch file content");
}
