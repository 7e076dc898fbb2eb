//! Adapter from the raw upstream SSE byte stream to [`RelayEvent`]s.

use futures::StreamExt;
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::types::{FinalResponse, StreamEventEnvelope};
use super::ByteStream;
use crate::relay::events::RelayEvent;
use crate::streaming::{is_done_marker, SseEvent, SseEventBuffer};

const OUTPUT_TEXT_DELTA: &str = "response.output_text.delta";
const REASONING_PREFIX: &str = "response.reasoning";
const IMAGE_PARTIAL: &str = "response.image_generation_call.partial_image";
const RESPONSE_COMPLETED: &str = "response.completed";
const RESPONSE_INCOMPLETE: &str = "response.incomplete";
const RESPONSE_FAILED: &str = "response.failed";

/// Failures observed while consuming an upstream stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("stream interrupted: {0}")]
    Transport(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("stream ended without a final response")]
    MissingFinal,
    #[error("malformed final response: {0}")]
    MalformedFinal(#[from] serde_json::Error),
}

/// Lazy, single-pass sequence of relay events from one upstream call.
///
/// The final response object is captured from the terminal event and is
/// available through [`ResponseStream::finalize`] once the sequence has
/// been drained.
pub struct ResponseStream {
    inner: ByteStream,
    buffer: SseEventBuffer,
    pending: VecDeque<RelayEvent>,
    final_response: Option<serde_json::Value>,
    partial_sequence: u32,
    error_emitted: bool,
    exhausted: bool,
}

impl ResponseStream {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            buffer: SseEventBuffer::new(),
            pending: VecDeque::new(),
            final_response: None,
            partial_sequence: 0,
            error_emitted: false,
            exhausted: false,
        }
    }

    /// Next event, or `None` once the upstream stream is exhausted.
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.exhausted {
                return None;
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => {
                    for sse in self.buffer.feed(&chunk) {
                        self.handle(sse);
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Upstream stream transport error");
                    self.exhausted = true;
                    self.push_error(StreamError::Transport(e.to_string()));
                }
                None => {
                    self.exhausted = true;
                    if self.buffer.has_incomplete() {
                        debug!("Upstream stream ended with a partial event buffered");
                    }
                    if let Some(sse) = self.buffer.finish() {
                        self.handle(sse);
                    }
                }
            }
        }
    }

    /// The fully materialized final response, if the provider sent one.
    pub fn finalize(self) -> Result<FinalResponse, StreamError> {
        let value = self.final_response.ok_or(StreamError::MissingFinal)?;
        Ok(serde_json::from_value(value)?)
    }

    fn handle(&mut self, sse: SseEvent) {
        if is_done_marker(&sse.data) {
            return;
        }

        let mut envelope: StreamEventEnvelope = match serde_json::from_str(&sse.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable upstream event");
                return;
            }
        };
        if envelope.event_type.is_empty() {
            envelope.event_type = sse.event.unwrap_or_default();
        }

        let kind = envelope.event_type.as_str();
        match kind {
            OUTPUT_TEXT_DELTA => {
                if let Some(text) = envelope.delta_text().filter(|t| !t.is_empty()) {
                    self.pending.push_back(RelayEvent::TextDelta {
                        text: text.to_string(),
                    });
                }
            }
            IMAGE_PARTIAL => {
                if let Some(base64) = envelope.partial_image_b64.take().filter(|b| !b.is_empty()) {
                    self.partial_sequence += 1;
                    self.pending.push_back(RelayEvent::ImagePartial {
                        base64,
                        sequence: self.partial_sequence,
                    });
                }
            }
            RESPONSE_COMPLETED | RESPONSE_INCOMPLETE => {
                self.final_response = envelope.response.take();
            }
            RESPONSE_FAILED => {
                let message = envelope.error_message();
                self.final_response = envelope.response.take();
                self.push_error(StreamError::Provider(message));
            }
            k if k == "error" || k.ends_with(".error") => {
                self.push_error(StreamError::Provider(envelope.error_message()));
            }
            k if k.starts_with(REASONING_PREFIX) => {
                if let Some(text) = envelope.delta_text().filter(|t| !t.is_empty()) {
                    self.pending.push_back(RelayEvent::ReasoningDelta {
                        text: text.to_string(),
                    });
                }
            }
            _ => {}
        }
    }

    fn push_error(&mut self, error: StreamError) {
        if self.error_emitted {
            debug!(error = %error, "Suppressing additional upstream error");
            return;
        }
        self.error_emitted = true;
        self.pending.push_back(RelayEvent::Error {
            message: error.to_string(),
        });
    }
}
