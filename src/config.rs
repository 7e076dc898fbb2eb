//! Configuration management for the relay
//!
//! Configuration is loaded from environment variables.

use anyhow::{bail, Context, Result};
use std::env;

use crate::relay::history::prompt_framing_chars;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// OpenAI API URL
    pub openai_api_url: String,
    /// OpenAI API key. Requests short-circuit with a 500 when absent.
    pub openai_api_key: Option<String>,

    /// Model used for chat, vision and tool-driven image generation
    pub model: String,
    /// Model used by the synchronous image edit endpoint
    pub image_model: String,

    /// Forward reasoning deltas to the client as `thinking` tags
    pub reasoning_stream_enabled: bool,
    /// Character budget for the serialized conversation prompt
    pub max_prompt_chars: usize,
    /// Offer the web search tool when no attachments are present
    pub web_search_enabled: bool,
    /// Number of partial frames requested from the image generation tool
    pub partial_images: u8,
    /// Total timeout for a single upstream call (in seconds)
    pub upstream_timeout_secs: u64,
    /// Extra redaction regexes appended to the built-in list
    pub extra_redact_patterns: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("RELAY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid RELAY_PORT")?,

            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),

            model: env::var("RELAY_MODEL").unwrap_or_else(|_| "gpt-5".to_string()),
            image_model: env::var("RELAY_IMAGE_MODEL")
                .unwrap_or_else(|_| "gpt-image-1".to_string()),

            reasoning_stream_enabled: env::var("ALLOW_REASONING_STREAM")
                .map(|v| v != "0")
                .unwrap_or(true),
            max_prompt_chars: env::var("RELAY_MAX_PROMPT_CHARS")
                .unwrap_or_else(|_| "100000".to_string())
                .parse()
                .context("Invalid RELAY_MAX_PROMPT_CHARS")?,
            web_search_enabled: env::var("RELAY_WEB_SEARCH")
                .map(|v| v != "0" && v != "false")
                .unwrap_or(true),
            partial_images: env::var("RELAY_PARTIAL_IMAGES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid RELAY_PARTIAL_IMAGES")?,
            upstream_timeout_secs: env::var("RELAY_UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid RELAY_UPSTREAM_TIMEOUT_SECS")?,
            extra_redact_patterns: env::var("RELAY_REDACT_PATTERNS")
                .map(|v| split_patterns(&v))
                .unwrap_or_default(),
        };

        let framing = prompt_framing_chars();
        if config.max_prompt_chars < framing {
            bail!(
                "Invalid RELAY_MAX_PROMPT_CHARS: {} is below the {} characters of prompt framing",
                config.max_prompt_chars,
                framing
            );
        }

        Ok(config)
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
