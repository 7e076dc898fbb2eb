//! OpenAI responses and images API client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use tracing::{debug, error, info, instrument};

use super::types::{ImagesResponse, ResponsesRequest};
use super::{ContainerFile, ImageEditRequest, ResponseStream, UpstreamClient};
use crate::config::Config;
use crate::error::{AppError, AppResult};

const MISSING_KEY: &str = "Missing OPENAI_API_KEY server env var";

/// Client for the OpenAI API
pub struct OpenAIUpstream {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAIUpstream {
    /// Create a new OpenAI client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.openai_api_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
        }
    }

    fn auth_headers(&self) -> AppResult<HeaderMap> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::NotConfigured(MISSING_KEY.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| AppError::NotConfigured("Invalid OPENAI_API_KEY".to_string()))?,
        );
        Ok(headers)
    }

    /// Build `{base}/segments...` with each segment percent-encoded.
    fn url_with_segments(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid OPENAI_API_URL: {}", e)))?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                AppError::Internal(anyhow::anyhow!("OPENAI_API_URL cannot be a base URL"))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn error_from_response(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %body, "OpenAI returned error");
        AppError::Upstream(format!("OpenAI returned {}", status))
    }
}

#[async_trait]
impl UpstreamClient for OpenAIUpstream {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn stream_response(&self, request: &ResponsesRequest) -> AppResult<ResponseStream> {
        let url = format!("{}/responses", self.base_url);
        let mut headers = self.auth_headers()?;
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        debug!(
            url = %url,
            tools = request.tools.len(),
            has_previous = request.previous_response_id.is_some(),
            "Opening responses stream"
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to send request to OpenAI");
                e
            })?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        info!(status = %response.status(), "Responses stream opened");
        Ok(ResponseStream::new(Box::pin(response.bytes_stream())))
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn edit_image(&self, request: ImageEditRequest) -> AppResult<ImagesResponse> {
        let url = format!("{}/images/edits", self.base_url);
        let headers = self.auth_headers()?;

        let mut form = Form::new()
            .text("model", request.model)
            .text("prompt", request.prompt)
            .text("size", "auto")
            .text("quality", "high")
            .text("background", "auto")
            .text("input_fidelity", "high")
            .text("output_format", "png");

        if let Some(image) = request.image {
            let part = Part::bytes(image.bytes)
                .file_name("image_1.png")
                .mime_str(&image.mime)?;
            form = form.part("image", part);
        }

        let mask = Part::bytes(request.mask.bytes)
            .file_name("mask.png")
            .mime_str(&request.mask.mime)?;
        form = form.part("mask", mask);

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(response.json::<ImagesResponse>().await?)
    }

    #[instrument(skip(self))]
    async fn container_file(&self, container_id: &str, file_id: &str) -> AppResult<ContainerFile> {
        let url = self.url_with_segments(&["containers", container_id, "files", file_id, "content"])?;
        let headers = self.auth_headers()?;

        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "Container file fetch rejected");
            return Ok(ContainerFile::Failed(status.as_u16()));
        }

        Ok(ContainerFile::Stream(Box::pin(response.bytes_stream())))
    }
}
