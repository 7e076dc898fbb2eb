//! Normalized relay events
//!
//! Everything the upstream adapter observes is reduced to this vocabulary
//! before it reaches the encoder.

/// A cited web source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub url: String,
    pub title: Option<String>,
}

impl Citation {
    /// Title to display, falling back to the URL when the title is blank.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => &self.url,
        }
    }
}

/// One unit of relay output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    TextDelta { text: String },
    ReasoningDelta { text: String },
    ImagePartial { base64: String, sequence: u32 },
    ImageFinal { base64: String },
    RevisedPrompt { text: String },
    ReasoningSummary { text: String },
    Citation(Citation),
    ResponseId { id: String },
    Incomplete { reason: String },
    Error { message: String },
}

impl RelayEvent {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::TextDelta { .. } => "text",
            RelayEvent::ReasoningDelta { .. } => "reasoning",
            RelayEvent::ImagePartial { .. } => "image_partial",
            RelayEvent::ImageFinal { .. } => "image",
            RelayEvent::RevisedPrompt { .. } => "revised_prompt",
            RelayEvent::ReasoningSummary { .. } => "summary_text",
            RelayEvent::Citation(_) => "citation",
            RelayEvent::ResponseId { .. } => "response_id",
            RelayEvent::Incomplete { .. } => "incomplete",
            RelayEvent::Error { .. } => "error",
        }
    }
}
