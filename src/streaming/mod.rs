//! SSE (Server-Sent Events) streaming utilities
//!
//! Provides buffering and parsing helpers for processing SSE streams
//! from the upstream responses API.

/// A single dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if the provider sent one
    pub event: Option<String>,
    /// All `data:` lines of the event joined with `\n`
    pub data: String,
}

/// Buffer for assembling SSE events across chunk boundaries.
///
/// Upstream data arrives as byte chunks that align with neither line
/// boundaries nor UTF-8 character boundaries. Bytes are held until a full
/// line is available and lines are folded into an event until the blank
/// line that terminates it.
///
/// # Example
/// ```
/// use playground_relay::streaming::SseEventBuffer;
///
/// let mut buffer = SseEventBuffer::new();
///
/// // First chunk contains a partial event
/// let events = buffer.feed(b"event: response.output_text.delta\ndata: {\"delta\":\"hel");
/// assert!(events.is_empty());
///
/// // Second chunk completes it
/// let events = buffer.feed(b"lo\"}\n\n");
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].event.as_deref(), Some("response.output_text.delta"));
/// assert_eq!(events[0].data, "{\"delta\":\"hello\"}");
/// ```
#[derive(Debug, Default)]
pub struct SseEventBuffer {
    /// Bytes of the current, not yet terminated line
    pending: Vec<u8>,
    /// `event:` field of the event being assembled
    event: Option<String>,
    /// `data:` lines of the event being assembled
    data: Vec<String>,
}

impl SseEventBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the buffer and return every event completed by them.
    ///
    /// Lines are only decoded once their terminating `\n` has arrived, so a
    /// multi-byte character split across two chunks is never mangled.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline_pos).collect();
            let text = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = text.strip_suffix('\r').unwrap_or(&*text);

            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush whatever is left when the byte stream ends.
    ///
    /// A provider that closes the connection without the final blank line
    /// still gets its last event delivered.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    /// Check if there's any incomplete data remaining in the buffer.
    ///
    /// Useful for detecting truncated streams at end of response.
    pub fn has_incomplete(&self) -> bool {
        !self.pending.is_empty() || !self.data.is_empty()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

/// Check if an SSE data payload is the `[DONE]` marker.
pub fn is_done_marker(data: &str) -> bool {
    data.trim() == "[DONE]"
}
