//! `POST /api/chat` - plain transcript chat
//!
//! A lighter endpoint than the playground: no tools, no attachments, only
//! text deltas are streamed back.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::Response,
};
use futures::Stream;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::relay::context::RelayContext;
use crate::relay::history::{build_plain_prompt, ConversationMessage};
use crate::relay::orchestrator::{INVALID_BODY, MISSING_API_KEY};
use crate::relay::{RelayEvent, SentinelEncoder};
use crate::routes::metrics::{record_request, record_stream_error};
use crate::upstream::types::{
    ReasoningConfig, ReasoningEffort, ResponseInput, ResponsesRequest,
};
use crate::upstream::ResponseStream;
use crate::AppState;

const CHAT_ENDPOINT: &str = "/api/chat";
const CHAT_INSTRUCTIONS: &str = "You are Yurie, a fun and helpful assistant.";
const CHAT_FAILURE: &str = "A server error occurred. Please try again.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub model: Option<String>,
}

#[instrument(skip(state, body))]
pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> AppResult<Response<Body>> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest(INVALID_BODY.to_string()))?;

    if !state.upstream.is_configured() {
        return Err(AppError::NotConfigured(MISSING_API_KEY.to_string()));
    }

    let model = request
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.model.clone());

    let upstream_request = ResponsesRequest {
        model: model.clone(),
        instructions: Some(CHAT_INSTRUCTIONS.to_string()),
        reasoning: Some(ReasoningConfig {
            effort: ReasoningEffort::High,
            summary: "auto".to_string(),
        }),
        text: None,
        input: ResponseInput::Text(build_plain_prompt(&request.messages)),
        tools: Vec::new(),
        tool_choice: None,
        previous_response_id: None,
        include: Vec::new(),
        stream: true,
    };

    let context = RelayContext::new(CHAT_ENDPOINT).with_model(model);
    context.log_request_start();

    let events = state.upstream.stream_response(&upstream_request).await?;
    record_request(CHAT_ENDPOINT, "chat");
    context.log_stream_started();

    let encoder = SentinelEncoder::new(false, Arc::clone(&state.redactor));
    super::text_stream_response(Body::from_stream(text_only(events, encoder, context)))
}

/// Forward text deltas and the first error; everything else is dropped.
fn text_only(
    mut events: ResponseStream,
    mut encoder: SentinelEncoder,
    context: RelayContext,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let mut fragments = 0usize;
        let mut bytes = 0usize;

        while let Some(event) = events.next_event().await {
            let event = match event {
                RelayEvent::TextDelta { .. } => event,
                RelayEvent::Error { message } => {
                    context.log_upstream_error(&message);
                    record_stream_error("chat");
                    RelayEvent::Error { message: CHAT_FAILURE.to_string() }
                }
                _ => continue,
            };
            if let Some(chunk) = encoder.encode(&event) {
                fragments += 1;
                bytes += chunk.len();
                yield Ok(chunk);
            }
        }

        context.log_stream_complete(fragments, bytes);
    }
}
