//! Serialization of relay events into the sentinel-tag text stream.

use bytes::Bytes;
use std::sync::Arc;

use super::events::RelayEvent;
use super::redact::Redactor;
use crate::protocol::{
    escape_payload, ERROR_PREFIX, PNG_DATA_URL_PREFIX, SOURCES_HEADER, TAG_IMAGE,
    TAG_IMAGE_PARTIAL, TAG_INCOMPLETE, TAG_RESPONSE_ID, TAG_REVISED_PROMPT, TAG_SUMMARY_TEXT,
    TAG_THINKING,
};

/// Stateful encoder for one response body.
///
/// The only state carried between events is whether the citation block
/// header has already been written.
#[derive(Debug)]
pub struct SentinelEncoder {
    reasoning_enabled: bool,
    redactor: Arc<Redactor>,
    sources_started: bool,
}

impl SentinelEncoder {
    pub fn new(reasoning_enabled: bool, redactor: Arc<Redactor>) -> Self {
        Self {
            reasoning_enabled,
            redactor,
            sources_started: false,
        }
    }

    /// Encode one event. Returns `None` when the event produces no output.
    pub fn encode(&mut self, event: &RelayEvent) -> Option<Bytes> {
        let fragment = match event {
            RelayEvent::TextDelta { text } => {
                if text.is_empty() {
                    return None;
                }
                self.redactor.redact(text).into_owned()
            }
            RelayEvent::ReasoningDelta { text } => {
                if !self.reasoning_enabled || text.is_empty() {
                    return None;
                }
                let clean = self.redactor.redact(text);
                format!("\n<{TAG_THINKING}:{}>", escape_payload(&clean))
            }
            RelayEvent::ImagePartial { base64, .. } => {
                format!("\n<{TAG_IMAGE_PARTIAL}:{PNG_DATA_URL_PREFIX}{base64}>\n")
            }
            RelayEvent::ImageFinal { base64 } => {
                format!("\n<{TAG_IMAGE}:{PNG_DATA_URL_PREFIX}{base64}>\n")
            }
            RelayEvent::RevisedPrompt { text } => meta_tag(TAG_REVISED_PROMPT, text)?,
            RelayEvent::ReasoningSummary { text } => meta_tag(TAG_SUMMARY_TEXT, text)?,
            RelayEvent::ResponseId { id } => meta_tag(TAG_RESPONSE_ID, id)?,
            RelayEvent::Incomplete { reason } => meta_tag(TAG_INCOMPLETE, reason)?,
            RelayEvent::Citation(citation) => {
                let mut out = String::new();
                if !self.sources_started {
                    self.sources_started = true;
                    out.push_str(SOURCES_HEADER);
                }
                out.push_str(&format!(
                    "- [{}]({})\n",
                    citation.display_title(),
                    citation.url
                ));
                out
            }
            RelayEvent::Error { message } => format!("\n{ERROR_PREFIX}{message}\n"),
        };

        Some(Bytes::from(fragment))
    }
}

fn meta_tag(name: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    Some(format!("\n<{name}:{}>\n", escape_payload(value)))
}
