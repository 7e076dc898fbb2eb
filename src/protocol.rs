//! Sentinel tag vocabulary shared by the relay encoder and the client decoder.
//!
//! A tag is `<name:payload>` embedded in the plain-text body. Free-text
//! payloads are escaped so they can never contain the `>` terminator;
//! base64 image payloads never need it.

/// Streamed reasoning fragment
pub const TAG_THINKING: &str = "thinking";
/// Progressive image frame
pub const TAG_IMAGE_PARTIAL: &str = "image_partial";
/// Finished image
pub const TAG_IMAGE: &str = "image";
/// Prompt as rewritten by the image tool
pub const TAG_REVISED_PROMPT: &str = "revised_prompt";
/// Upstream response identifier, used for conversation continuation
pub const TAG_RESPONSE_ID: &str = "response_id";
/// Reasoning summary from the final response
pub const TAG_SUMMARY_TEXT: &str = "summary_text";
/// Incomplete response reason
pub const TAG_INCOMPLETE: &str = "incomplete";

/// Every tag name the decoder recognizes, longest first.
pub const KNOWN_TAGS: [&str; 7] = [
    TAG_IMAGE_PARTIAL,
    TAG_REVISED_PROMPT,
    TAG_SUMMARY_TEXT,
    TAG_RESPONSE_ID,
    TAG_INCOMPLETE,
    TAG_THINKING,
    TAG_IMAGE,
];

/// Data URL prefix for relayed PNG payloads
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Prefix of the in-band error line
pub const ERROR_PREFIX: &str = "[error] ";

/// Header line that opens the citation block
pub const SOURCES_HEADER: &str = "\n\nSources:\n";

/// Escape a free-text payload so it cannot terminate its tag early.
pub fn escape_payload(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('>', "&gt;")
        .replace('<', "&lt;")
}

/// Reverse [`escape_payload`].
pub fn unescape_payload(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}
