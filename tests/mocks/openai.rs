//! Mock OpenAI API for testing
//!
//! Provides wiremock-based mocks for the endpoints the relay calls:
//! - POST /responses - streamed Responses API events (SSE)
//! - POST /images/edits - synchronous mask edit
//! - GET /containers/{id}/files/{file_id}/content - code interpreter output
//!
//! # Example
//!
//! ```rust,ignore
//! let mock = MockOpenAI::start().await;
//! mock.mock_responses_stream(&sse_body(&[text_delta("Hi"), completed("resp_1", json!([]))]))
//!     .await;
//! let server = common::test_server(common::test_config(&mock.uri()));
//! ```

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::constants::TEST_OPENAI_API_KEY;

/// Mock OpenAI server wrapper
pub struct MockOpenAI {
    server: MockServer,
}

impl MockOpenAI {
    /// Start a new mock OpenAI server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    fn bearer() -> String {
        format!("Bearer {}", TEST_OPENAI_API_KEY)
    }

    // =========================================================================
    // POST /responses
    // =========================================================================

    /// Serve `body` as a complete SSE stream
    pub async fn mock_responses_stream(&self, body: &str) {
        self.mock_responses_stream_delayed(body, Duration::ZERO).await;
    }

    /// Serve `body` after `delay`
    pub async fn mock_responses_stream_delayed(&self, body: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("Authorization", Self::bearer().as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body.to_string())
                    .insert_header("Content-Type", "text/event-stream")
                    .insert_header("Cache-Control", "no-cache")
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Fail the Responses call before any event
    pub async fn mock_responses_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "message": "upstream exploded", "type": "server_error" }
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // POST /images/edits
    // =========================================================================

    pub async fn mock_image_edit(&self, response: Value) {
        Mock::given(method("POST"))
            .and(path("/images/edits"))
            .and(header("Authorization", Self::bearer().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // GET /containers/{id}/files/{file_id}/content
    // =========================================================================

    pub async fn mock_container_file(&self, container_id: &str, file_id: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/containers/{}/files/{}/content",
                container_id, file_id
            )))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_container_file_status(&self, container_id: &str, file_id: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/containers/{}/files/{}/content",
                container_id, file_id
            )))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Bodies of every request received so far, parsed as JSON where possible
    pub async fn received_json(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}

// =========================================================================
// SSE body builders
// =========================================================================

/// Join events into an SSE body terminated by `[DONE]`
pub fn sse_body(events: &[Value]) -> String {
    let mut body = String::new();
    for event in events {
        let kind = event["type"].as_str().unwrap_or_default();
        body.push_str(&format!("event: {}\ndata: {}\n\n", kind, event));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn text_delta(text: &str) -> Value {
    json!({ "type": "response.output_text.delta", "delta": text })
}

pub fn reasoning_delta(text: &str) -> Value {
    json!({ "type": "response.reasoning_summary_text.delta", "delta": text })
}

pub fn partial_image(b64: &str) -> Value {
    json!({
        "type": "response.image_generation_call.partial_image",
        "partial_image_b64": b64
    })
}

pub fn error_event(message: &str) -> Value {
    json!({ "type": "error", "message": message })
}

/// Terminal `response.completed` event carrying `output`
pub fn completed(id: &str, output: Value) -> Value {
    json!({
        "type": "response.completed",
        "response": { "id": id, "status": "completed", "output": output }
    })
}

pub fn incomplete(id: &str, reason: &str) -> Value {
    json!({
        "type": "response.incomplete",
        "response": {
            "id": id,
            "status": "incomplete",
            "incomplete_details": { "reason": reason },
            "output": []
        }
    })
}

pub fn image_call(result: &str, revised_prompt: &str) -> Value {
    json!({
        "type": "image_generation_call",
        "result": result,
        "revised_prompt": revised_prompt
    })
}

pub fn cited_message(url: &str, title: &str) -> Value {
    json!({
        "type": "message",
        "content": [{
            "type": "output_text",
            "text": "See the source.",
            "annotations": [{ "type": "url_citation", "url": url, "title": title }]
        }]
    })
}
