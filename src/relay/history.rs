//! Conversation history serialization
//!
//! The multi-turn conversation is flattened into a single labelled prompt.
//! Inline image data is replaced by a placeholder and the oldest text is
//! dropped first when the prompt exceeds its character budget.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const PROMPT_HEADER: &str = "Conversation history follows. Respond as Yurie.\n";
pub const PROMPT_TAIL: &str = "\nYurie:";
pub const ASSISTANT_LABEL: &str = "Yurie";
pub const IMAGE_PLACEHOLDER: &str = "[image omitted]";

static IMAGE_DATA_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"<image:[^>]+>").expect("valid image tag pattern"),
        Regex::new(r"\[data:image/[a-zA-Z0-9+.-]+;base64,[^\]]+\]")
            .expect("valid bracketed data url pattern"),
        Regex::new(r"data:image/[a-zA-Z0-9+.-]+;base64,[A-Za-z0-9+/=]+")
            .expect("valid data url pattern"),
    ]
});

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => ASSISTANT_LABEL,
        }
    }
}

/// One turn of the conversation as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Replace inline image data with [`IMAGE_PLACEHOLDER`].
pub fn strip_image_data(text: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(text);
    for pattern in IMAGE_DATA_PATTERNS.iter() {
        if pattern.is_match(&out) {
            out = Cow::Owned(pattern.replace_all(&out, IMAGE_PLACEHOLDER).into_owned());
        }
    }
    out
}

/// Trimmed content of the most recent user turn, or `""`.
pub fn latest_user_text(messages: &[ConversationMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .unwrap_or("")
}

/// Characters taken by the prompt header and tail.
pub fn prompt_framing_chars() -> usize {
    PROMPT_HEADER.chars().count() + PROMPT_TAIL.chars().count()
}

/// Flatten `messages` into one prompt of at most `max_chars` characters.
///
/// When the budget is exceeded the history body keeps its newest
/// characters. A budget smaller than the framing itself keeps only the
/// newest `max_chars` characters of header and tail.
pub fn build_prompt(messages: &[ConversationMessage], max_chars: usize) -> String {
    let history = messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), strip_image_data(&m.content)))
        .collect::<Vec<_>>()
        .join("\n");

    let framing = prompt_framing_chars();
    let history_len = history.chars().count();

    if max_chars < framing {
        return newest_chars(&format!("{PROMPT_HEADER}{PROMPT_TAIL}"), max_chars).to_string();
    }

    if framing + history_len <= max_chars {
        return format!("{PROMPT_HEADER}{history}{PROMPT_TAIL}");
    }

    let kept = newest_chars(&history, max_chars - framing);
    format!("{PROMPT_HEADER}{kept}{PROMPT_TAIL}")
}

/// The last `count` characters of `text`.
fn newest_chars(text: &str, count: usize) -> &str {
    let len = text.chars().count();
    if count >= len {
        return text;
    }
    match text.char_indices().nth(len - count) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

/// Labelled transcript used by the plain chat endpoint.
pub fn build_plain_prompt(messages: &[ConversationMessage]) -> String {
    let mut prompt = messages
        .iter()
        .map(|m| {
            let label = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{label}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n");
    prompt.push_str("\nAssistant:");
    prompt
}
