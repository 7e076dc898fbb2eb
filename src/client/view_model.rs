//! Conversation view model
//!
//! Holds the messages a UI renders, plus the per-message reasoning buffer
//! and the continuation id for the next request. All state changes go
//! through the transition methods below.

use std::collections::HashMap;

use super::decoder::{DecodedEvent, MetaKey};
use crate::relay::history::{strip_image_data, ConversationMessage, Role, IMAGE_PLACEHOLDER};

/// Prefix of the assistant message appended when a request fails.
pub const ERROR_MESSAGE_PREFIX: &str = "There was an error: ";

/// Renderable piece of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image { src: String, partial: bool },
    Meta { key: MetaKey, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMessage {
    pub id: usize,
    pub role: Role,
    pub parts: Vec<Part>,
}

impl ViewMessage {
    fn new(id: usize, role: Role) -> Self {
        Self {
            id,
            role,
            parts: Vec::new(),
        }
    }

    /// Text and image parts in display order.
    ///
    /// Only the most recent partial image is shown, and no partial at all
    /// once a final image exists.
    pub fn visible_parts(&self) -> Vec<&Part> {
        let has_final = self
            .parts
            .iter()
            .any(|p| matches!(p, Part::Image { partial: false, .. }));
        let latest_partial = self
            .parts
            .iter()
            .rposition(|p| matches!(p, Part::Image { partial: true, .. }));

        self.parts
            .iter()
            .enumerate()
            .filter(|(i, part)| match part {
                Part::Image { partial: true, .. } => !has_final && Some(*i) == latest_partial,
                Part::Meta { .. } => false,
                _ => true,
            })
            .map(|(_, part)| part)
            .collect()
    }

    /// `(label, value)` pairs for the small print under the message.
    pub fn meta_lines(&self) -> Vec<(&'static str, &str)> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Meta { key, value } => Some((key.label(), value.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Content as sent back in history: text with images as placeholders.
    fn history_content(&self) -> String {
        let mut content = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => content.push_str(&strip_image_data(text)),
                Part::Image { partial: false, .. } => {
                    if !content.is_empty() && !content.ends_with('\n') {
                        content.push('\n');
                    }
                    content.push_str(IMAGE_PLACEHOLDER);
                }
                _ => {}
            }
        }
        content
    }
}

/// Lifecycle of the in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Submitted,
    Streaming,
}

#[derive(Debug)]
pub struct Conversation {
    messages: Vec<ViewMessage>,
    reasoning: HashMap<usize, String>,
    thinking_open: bool,
    last_response_id: Option<String>,
    status: Status,
    next_id: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            reasoning: HashMap::new(),
            thinking_open: false,
            last_response_id: None,
            status: Status::Ready,
            next_id: 0,
        }
    }

    pub fn messages(&self) -> &[ViewMessage] {
        &self.messages
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn previous_response_id(&self) -> Option<&str> {
        self.last_response_id.as_deref()
    }

    /// Append a user message. Blank input is ignored and returns `false`.
    pub fn submit_user(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let mut message = ViewMessage::new(self.allocate_id(), Role::User);
        message.parts.push(Part::Text(text.to_string()));
        self.messages.push(message);
        self.status = Status::Submitted;
        true
    }

    /// Open an empty assistant message that subsequent events fill in.
    pub fn begin_assistant(&mut self) -> usize {
        let id = self.allocate_id();
        self.messages.push(ViewMessage::new(id, Role::Assistant));
        self.status = Status::Streaming;
        id
    }

    pub fn append_text_delta(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let message = self.streaming_message();
        match message.parts.last_mut() {
            Some(Part::Text(existing)) => existing.push_str(text),
            _ => message.parts.push(Part::Text(text.to_string())),
        }
    }

    pub fn append_reasoning_delta(&mut self, text: &str) {
        let id = self.streaming_message().id;
        self.reasoning.entry(id).or_default().push_str(text);
    }

    pub fn set_image_partial(&mut self, src: &str) {
        self.streaming_message().parts.push(Part::Image {
            src: src.to_string(),
            partial: true,
        });
    }

    pub fn set_image_final(&mut self, src: &str) {
        self.streaming_message().parts.push(Part::Image {
            src: src.to_string(),
            partial: false,
        });
    }

    pub fn set_meta(&mut self, key: MetaKey, value: &str) {
        if key == MetaKey::ResponseId {
            self.last_response_id = Some(value.to_string());
        }
        self.streaming_message().parts.push(Part::Meta {
            key,
            value: value.to_string(),
        });
    }

    /// Route a decoded event to the matching transition.
    pub fn apply(&mut self, event: DecodedEvent) {
        match event {
            DecodedEvent::Text(text) => self.append_text_delta(&text),
            DecodedEvent::Thinking(text) => self.append_reasoning_delta(&text),
            DecodedEvent::ImagePartial(src) => self.set_image_partial(&src),
            DecodedEvent::Image(src) => self.set_image_final(&src),
            DecodedEvent::Meta { key, value } => self.set_meta(key, &value),
        }
    }

    /// The stream ended normally or was stopped.
    pub fn finish(&mut self) {
        self.status = Status::Ready;
    }

    /// Record a request failure as a visible assistant message. The
    /// conversation is ready for the next submit afterwards.
    pub fn fail(&mut self, message: &str) {
        let mut view = ViewMessage::new(self.allocate_id(), Role::Assistant);
        view.parts
            .push(Part::Text(format!("{ERROR_MESSAGE_PREFIX}{message}")));
        self.messages.push(view);
        self.status = Status::Ready;
    }

    pub fn toggle_thinking(&mut self) {
        self.thinking_open = !self.thinking_open;
    }

    /// Reasoning text accumulated for message `id`.
    pub fn thinking_for(&self, id: usize) -> Option<&str> {
        self.reasoning.get(&id).map(String::as_str)
    }

    /// The reasoning panel is shown for the latest assistant message only.
    pub fn thinking_visible(&self, id: usize) -> bool {
        self.thinking_open
            && self.thinking_for(id).is_some_and(|t| !t.is_empty())
            && self
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .is_some_and(|m| m.id == id)
    }

    /// History to send with the next request.
    ///
    /// Image payloads are replaced by placeholders, empty and error
    /// messages are left out.
    pub fn request_history(&self) -> Vec<ConversationMessage> {
        self.messages
            .iter()
            .filter_map(|m| {
                let content = m.history_content();
                if content.trim().is_empty() || content.starts_with(ERROR_MESSAGE_PREFIX) {
                    return None;
                }
                Some(ConversationMessage {
                    role: m.role,
                    content,
                })
            })
            .collect()
    }

    fn allocate_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The assistant message being filled in; opened on demand.
    fn streaming_message(&mut self) -> &mut ViewMessage {
        let needs_new = !matches!(
            (self.status, self.messages.last()),
            (Status::Streaming, Some(m)) if m.role == Role::Assistant
        );
        if needs_new {
            self.begin_assistant();
        }
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }
}
