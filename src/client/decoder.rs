//! Incremental decoder for the sentinel-tag text stream.
//!
//! Bytes can arrive split anywhere: inside a UTF-8 sequence, inside a tag
//! name, or in the middle of a multi-kilobyte image payload. The decoder
//! only emits text it knows cannot turn into a tag and holds the rest back
//! until the next chunk.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::protocol::{
    unescape_payload, KNOWN_TAGS, TAG_IMAGE, TAG_IMAGE_PARTIAL, TAG_INCOMPLETE, TAG_RESPONSE_ID,
    TAG_REVISED_PROMPT, TAG_SUMMARY_TEXT, TAG_THINKING,
};

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<(thinking|image_partial|image|revised_prompt|response_id|summary_text|incomplete):([^>]*)>|\[(data:image/[a-zA-Z0-9+.-]+;base64,[^\]]+)\]",
    )
    .expect("valid sentinel tag pattern")
});

const LEGACY_IMAGE_START: &str = "[data:image/";

/// Metadata channels rendered as small print under a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKey {
    RevisedPrompt,
    ResponseId,
    SummaryText,
    Incomplete,
}

impl MetaKey {
    pub fn label(&self) -> &'static str {
        match self {
            MetaKey::RevisedPrompt => "Revised prompt",
            MetaKey::ResponseId => "Response ID",
            MetaKey::SummaryText => "Reasoning summary",
            MetaKey::Incomplete => "Status",
        }
    }
}

/// One decoded unit of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    Text(String),
    Thinking(String),
    ImagePartial(String),
    Image(String),
    Meta { key: MetaKey, value: String },
}

/// Whether the decoder is currently holding back a possible tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Scanning,
    InTag,
}

#[derive(Debug, Default)]
pub struct SentinelDecoder {
    /// Undecoded tail of an incomplete UTF-8 sequence
    utf8_tail: Vec<u8>,
    /// Decoded text not yet emitted
    held: String,
    /// Drop one leading `\n` from the next text, it frames the previous tag
    skip_newline: bool,
}

impl SentinelDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DecoderState {
        match self.held.rfind('<') {
            Some(pos) if could_be_tag(&self.held[pos..]) => DecoderState::InTag,
            _ if self.held.contains(LEGACY_IMAGE_START) => DecoderState::InTag,
            _ => DecoderState::Scanning,
        }
    }

    /// Feed one network chunk and return every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodedEvent> {
        self.utf8_tail.extend_from_slice(chunk);
        self.decode_utf8(false);
        self.drain(false)
    }

    /// Flush at end of stream. Anything still held back is literal text.
    pub fn finish(&mut self) -> Vec<DecodedEvent> {
        self.decode_utf8(true);
        self.drain(true)
    }

    fn decode_utf8(&mut self, flush: bool) {
        loop {
            match std::str::from_utf8(&self.utf8_tail) {
                Ok(text) => {
                    self.held.push_str(text);
                    self.utf8_tail.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.held
                        .push_str(&String::from_utf8_lossy(&self.utf8_tail[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.held.push(char::REPLACEMENT_CHARACTER);
                            self.utf8_tail.drain(..valid + bad);
                        }
                        None if flush => {
                            self.held.push(char::REPLACEMENT_CHARACTER);
                            self.utf8_tail.clear();
                            return;
                        }
                        None => {
                            self.utf8_tail.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain(&mut self, flush: bool) -> Vec<DecodedEvent> {
        let text = std::mem::take(&mut self.held);
        let mut events = Vec::new();
        let mut cursor = 0;

        for caps in TAG_PATTERN.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            let before = &text[cursor..whole.start()];
            self.push_text(&mut events, before.strip_suffix('\n').unwrap_or(before));

            if let Some(event) = tag_event(&caps) {
                self.skip_newline = !matches!(event, DecodedEvent::Thinking(_));
                events.push(event);
            }
            cursor = whole.end();
        }

        let rest = &text[cursor..];
        let hold_from = if flush { rest.len() } else { hold_back_start(rest) };
        self.push_text(&mut events, &rest[..hold_from]);
        self.held = rest[hold_from..].to_string();

        events
    }

    fn push_text(&mut self, events: &mut Vec<DecodedEvent>, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = if std::mem::take(&mut self.skip_newline) {
            text.strip_prefix('\n').unwrap_or(text)
        } else {
            text
        };
        if text.is_empty() {
            return;
        }
        match events.last_mut() {
            Some(DecodedEvent::Text(existing)) => existing.push_str(text),
            _ => events.push(DecodedEvent::Text(text.to_string())),
        }
    }
}

fn tag_event(caps: &Captures<'_>) -> Option<DecodedEvent> {
    if let Some(src) = caps.get(3) {
        return Some(DecodedEvent::Image(src.as_str().to_string()));
    }

    let name = caps.get(1)?.as_str();
    let payload = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    if payload.is_empty() {
        return None;
    }

    let event = match name {
        TAG_THINKING => DecodedEvent::Thinking(unescape_payload(payload)),
        TAG_IMAGE_PARTIAL => DecodedEvent::ImagePartial(payload.to_string()),
        TAG_IMAGE => DecodedEvent::Image(payload.to_string()),
        TAG_REVISED_PROMPT => meta(MetaKey::RevisedPrompt, payload),
        TAG_RESPONSE_ID => meta(MetaKey::ResponseId, payload),
        TAG_SUMMARY_TEXT => meta(MetaKey::SummaryText, payload),
        TAG_INCOMPLETE => meta(MetaKey::Incomplete, payload),
        _ => return None,
    };
    Some(event)
}

fn meta(key: MetaKey, payload: &str) -> DecodedEvent {
    DecodedEvent::Meta {
        key,
        value: unescape_payload(payload),
    }
}

/// `fragment` starts with `<` and has no `>`: can more input complete it?
fn could_be_tag(fragment: &str) -> bool {
    let rest = &fragment[1..];
    if rest.contains('>') {
        return false;
    }
    KNOWN_TAGS.iter().any(|name| {
        let open = format!("{name}:");
        open.starts_with(rest) || rest.starts_with(&open)
    })
}

/// Byte offset from which `rest` must be held back.
fn hold_back_start(rest: &str) -> usize {
    let mut start = rest.len();

    if let Some(pos) = rest.rfind('<') {
        if could_be_tag(&rest[pos..]) {
            start = pos;
        }
    }
    if let Some(pos) = rest.rfind(LEGACY_IMAGE_START) {
        if !rest[pos..].contains(']') {
            start = start.min(pos);
        }
    }

    // A newline right before a held tag (or at the very end) may be framing.
    if rest[..start].ends_with('\n') {
        start -= 1;
    }
    start
}
