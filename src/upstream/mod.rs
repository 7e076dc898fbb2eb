//! Upstream LLM provider access
//!
//! The [`UpstreamClient`] trait is the seam between request orchestration
//! and the provider, so tests can swap in scripted streams.

pub mod openai;
mod stream;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::AppResult;
use crate::relay::attachments::Attachment;

pub use openai::OpenAIUpstream;
pub use stream::{ResponseStream, StreamError};
use types::{ImagesResponse, ResponsesRequest};

/// Type alias for streaming byte responses
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Synchronous image edit with an explicit mask.
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    pub model: String,
    pub prompt: String,
    pub image: Option<Attachment>,
    pub mask: Attachment,
}

/// Outcome of a container file download.
pub enum ContainerFile {
    /// Upstream accepted; body bytes follow
    Stream(ByteStream),
    /// Upstream rejected the request with this status
    Failed(u16),
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    /// Open a streaming responses call.
    ///
    /// Resolves once the provider has accepted the request; events are
    /// then pulled lazily from the returned [`ResponseStream`].
    async fn stream_response(&self, request: &ResponsesRequest) -> AppResult<ResponseStream>;

    /// Perform a mask-based image edit.
    async fn edit_image(&self, request: ImageEditRequest) -> AppResult<ImagesResponse>;

    /// Download a file produced inside a code interpreter container.
    async fn container_file(&self, container_id: &str, file_id: &str) -> AppResult<ContainerFile>;
}
