//! Playground Relay - streaming bridge between a chat UI and an LLM provider
//!
//! The relay accepts a conversation plus attachments, routes it to one
//! upstream call and streams the result back as plain text with inline
//! sentinel tags (`<name:payload>`) for reasoning, images and metadata.
//! The [`client`] module contains the matching decoder and view model.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod routes;
pub mod streaming;
pub mod upstream;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

pub use crate::config::Config;
pub use crate::relay::{RelayOrchestrator, Redactor};
pub use crate::upstream::{OpenAIUpstream, UpstreamClient};

use crate::relay::orchestrator::RelaySettings;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Upstream provider for responses, image edits and container files
    pub upstream: Arc<dyn UpstreamClient>,
    /// Per-request orchestration over `upstream`
    pub orchestrator: RelayOrchestrator,
    pub redactor: Arc<Redactor>,
}

impl AppState {
    /// Create a new application state talking to the configured OpenAI endpoint
    pub fn new(config: Config) -> Result<Self> {
        // Initialize HTTP client with connection pooling
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        let upstream: Arc<dyn UpstreamClient> =
            Arc::new(OpenAIUpstream::new(http_client, &config));

        Self::with_upstream(config, upstream)
    }

    /// Create application state around an arbitrary upstream implementation
    pub fn with_upstream(config: Config, upstream: Arc<dyn UpstreamClient>) -> Result<Self> {
        let redactor = Arc::new(
            Redactor::with_extra(&config.extra_redact_patterns)
                .context("Invalid RELAY_REDACT_PATTERNS")?,
        );

        let orchestrator = RelayOrchestrator::new(
            RelaySettings::from(&config),
            Arc::clone(&upstream),
            Arc::clone(&redactor),
        );

        Ok(Self {
            config,
            start_time: Instant::now(),
            upstream,
            orchestrator,
            redactor,
        })
    }
}
