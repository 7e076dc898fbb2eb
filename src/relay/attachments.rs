//! Data URL attachments (images, PDFs and edit masks).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Invalid data URL")]
    InvalidDataUrl,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A decoded attachment. The original data URL is kept for re-sending.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime: String,
    pub bytes: Vec<u8>,
    data_url: String,
}

impl Attachment {
    /// Parse `data:<mime>;base64,<payload>`.
    pub fn from_data_url(data_url: &str) -> Result<Self, AttachmentError> {
        let (mime, payload) = data_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or(AttachmentError::InvalidDataUrl)?;

        if mime.is_empty() || mime.contains(';') || payload.is_empty() {
            return Err(AttachmentError::InvalidDataUrl);
        }

        let bytes = BASE64.decode(payload.trim())?;

        Ok(Self {
            mime: mime.to_string(),
            bytes,
            data_url: data_url.to_string(),
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

/// Decode every data URL, failing on the first invalid one.
pub fn parse_images(data_urls: &[String]) -> Result<Vec<Attachment>, AttachmentError> {
    data_urls.iter().map(|url| Attachment::from_data_url(url)).collect()
}
