//! `POST /api/playground` - the streaming relay endpoint

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::Response,
};
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::relay::orchestrator::MISSING_API_KEY;
use crate::relay::RelayOrchestrator;
use crate::AppState;

/// Validate the body, open the upstream call and stream the encoded result.
///
/// Everything that can fail before the first byte is returned as a JSON
/// error. After that, failures are written into the body.
#[instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn relay(State(state): State<Arc<AppState>>, body: Bytes) -> AppResult<Response<Body>> {
    let request = RelayOrchestrator::parse_request(&body)?;

    if !state.upstream.is_configured() {
        return Err(AppError::NotConfigured(MISSING_API_KEY.to_string()));
    }

    let plan = state.orchestrator.plan(request)?;
    let stream = state.orchestrator.open(plan).await?;

    super::text_stream_response(Body::from_stream(stream))
}
