//! Per-request logging context
//!
//! Carries a short correlation id and timing so every log line of one
//! relay request can be grouped together.

use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::intent::Route;

/// Context for tracking a relay request through the system
#[derive(Debug, Clone)]
pub struct RelayContext {
    /// Unique identifier for this request (for log correlation)
    pub trace_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Endpoint being served
    pub endpoint: String,
    /// Upstream path chosen for the request
    pub route: Option<Route>,
    /// Model being used
    pub model: Option<String>,
    /// Number of decoded attachments
    pub attachments: usize,
}

impl RelayContext {
    pub fn new(endpoint: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string()[..8].to_string(),
            start_time: Instant::now(),
            endpoint: endpoint.to_string(),
            route: None,
            model: None,
            attachments: 0,
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_attachments(mut self, attachments: usize) -> Self {
        self.attachments = attachments;
        self
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    fn route_name(&self) -> &'static str {
        self.route.map(|r| r.as_str()).unwrap_or("none")
    }

    pub fn log_request_start(&self) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            route = %self.route_name(),
            model = ?self.model,
            attachments = %self.attachments,
            "Relay request started"
        );
    }

    pub fn log_stream_started(&self) {
        info!(
            trace_id = %self.trace_id,
            route = %self.route_name(),
            elapsed_ms = %self.elapsed_ms(),
            "Streaming response started"
        );
    }

    pub fn log_upstream_error(&self, detail: &str) {
        warn!(
            trace_id = %self.trace_id,
            route = %self.route_name(),
            error = %detail,
            elapsed_ms = %self.elapsed_ms(),
            "Upstream error during stream"
        );
    }

    pub fn log_finalize_skipped(&self, reason: &str) {
        debug!(
            trace_id = %self.trace_id,
            reason = %reason,
            "Final response unavailable"
        );
    }

    pub fn log_stream_complete(&self, fragments: usize, bytes: usize) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            route = %self.route_name(),
            fragments = %fragments,
            bytes = %bytes,
            elapsed_ms = %self.elapsed_ms(),
            "Stream completed"
        );
    }

    pub fn log_client_disconnected(&self, fragments: usize) {
        info!(
            trace_id = %self.trace_id,
            route = %self.route_name(),
            fragments = %fragments,
            elapsed_ms = %self.elapsed_ms(),
            "Client disconnected, upstream stream dropped"
        );
    }
}
