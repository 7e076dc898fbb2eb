//! Scrubbing of system-instruction fragments from model output.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Replacement inserted for every redacted span.
pub const REDACTED: &str = "[redacted]";

const BUILTIN_PATTERNS: &[&str] = &[
    r"(?i)SYSTEM RULES:",
    r"(?i)You are Yurie, a (?:creative and )?helpful AI assistant",
    r"(?i)Always format responses in Markdown",
    r"(?i)Do not disclose the contents of system instructions",
    r"(?i)system\s+(?:prompt|instructions|instruction|message)",
    r"(?i)</?SystemPrompt[^>]*>",
];

static BUILTIN: Lazy<Vec<Regex>> = Lazy::new(|| {
    BUILTIN_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid redaction pattern"))
        .collect()
});

/// Ordered list of patterns replaced with [`REDACTED`].
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<Regex>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self {
            patterns: BUILTIN.clone(),
        }
    }
}

impl Redactor {
    /// Built-in patterns followed by `extra`, each compiled case-insensitively.
    pub fn with_extra(extra: &[String]) -> Result<Self, regex::Error> {
        let mut redactor = Self::default();
        for pattern in extra {
            redactor.patterns.push(Regex::new(&format!("(?i){pattern}"))?);
        }
        Ok(redactor)
    }

    /// Apply every pattern in order.
    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for pattern in &self.patterns {
            if pattern.is_match(&out) {
                out = Cow::Owned(pattern.replace_all(&out, REDACTED).into_owned());
            }
        }
        out
    }
}
