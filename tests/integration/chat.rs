//! Plain chat endpoint integration tests
//!
//! POST /api/chat streams text deltas only.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common;
use crate::mocks::*;

#[tokio::test]
async fn test_chat_streams_only_text() {
    let mock = MockOpenAI::start().await;
    mock.mock_responses_stream(&sse_body(&[
        reasoning_delta("pondering"),
        text_delta("Hi "),
        text_delta("there"),
        completed("resp_chat", json!([])),
    ]))
    .await;

    let server = common::test_server(common::test_config(&mock.uri()));
    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [
                { "role": "user", "content": "hello" },
                { "role": "assistant", "content": "hey" },
                { "role": "user", "content": "how are you" }
            ]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "Hi there");

    let sent = mock.received_json().await;
    assert_eq!(
        sent[0]["input"],
        "User: hello\nAssistant: hey\nUser: how are you\nAssistant:"
    );
    assert_eq!(sent[0]["reasoning"]["effort"], "high");
    assert!(sent[0].get("tools").map_or(true, |t| t.as_array().unwrap().is_empty()));
}

#[tokio::test]
async fn test_chat_uses_requested_model() {
    let mock = MockOpenAI::start().await;
    mock.mock_responses_stream(&sse_body(&[completed("resp_m", json!([]))]))
        .await;

    let server = common::test_server(common::test_config(&mock.uri()));
    server
        .post("/api/chat")
        .json(&json!({
            "messages": [{ "role": "user", "content": "hello" }],
            "model": "gpt-custom"
        }))
        .await;

    let sent = mock.received_json().await;
    assert_eq!(sent[0]["model"], "gpt-custom");
}

#[tokio::test]
async fn test_chat_error_line() {
    let mock = MockOpenAI::start().await;
    mock.mock_responses_stream(&sse_body(&[text_delta("Hi"), error_event("boom")]))
        .await;

    let server = common::test_server(common::test_config(&mock.uri()));
    let response = server
        .post("/api/chat")
        .json(&common::user_turn("hello"))
        .await;

    assert_eq!(
        response.text(),
        "Hi\n[error] A server error occurred. Please try again.\n"
    );
}

#[tokio::test]
async fn test_chat_validation() {
    let mock = MockOpenAI::start().await;

    let server = common::test_server(common::test_config(&mock.uri()));
    let response = server.post("/api/chat").json(&json!({ "model": "x" })).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let server = common::test_server(common::unconfigured(&mock.uri()));
    let response = server
        .post("/api/chat")
        .json(&common::user_turn("hello"))
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing OPENAI_API_KEY server env var");
}
