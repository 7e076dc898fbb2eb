//! `GET /api/playground/container-file` - download code interpreter output

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, Response, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, instrument};

use crate::error::AppError;
use crate::relay::orchestrator::MISSING_API_KEY;
use crate::upstream::ContainerFile;
use crate::AppState;

const DEFAULT_FILENAME: &str = "file";

#[derive(Debug, Deserialize)]
pub struct ContainerFileQuery {
    pub container_id: Option<String>,
    pub file_id: Option<String>,
    pub filename: Option<String>,
}

#[instrument(skip(state))]
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContainerFileQuery>,
) -> Response<Body> {
    let (Some(container_id), Some(file_id)) = (
        query.container_id.filter(|v| !v.is_empty()),
        query.file_id.filter(|v| !v.is_empty()),
    ) else {
        return (StatusCode::BAD_REQUEST, "Missing container_id or file_id").into_response();
    };

    if !state.upstream.is_configured() {
        return AppError::NotConfigured(MISSING_API_KEY.to_string()).into_response();
    }

    let filename = sanitize_filename(query.filename.as_deref().unwrap_or(DEFAULT_FILENAME));

    match state.upstream.container_file(&container_id, &file_id).await {
        Ok(ContainerFile::Stream(body)) => {
            let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
                .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header(header::CONTENT_DISPOSITION, disposition)
                .header(header::CACHE_CONTROL, "no-cache")
                .header("X-Accel-Buffering", "no")
                .body(Body::from_stream(body))
                .unwrap_or_else(|e| {
                    error!(error = %e, "Failed to build download response");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                })
        }
        Ok(ContainerFile::Failed(status)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            "Failed to fetch file content",
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Container file download failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Strip characters that would break the quoted `Content-Disposition` value.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n') && !c.is_control())
        .collect();
    if cleaned.trim().is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}
