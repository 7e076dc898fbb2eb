//! Streaming client for the playground relay
//!
//! Posts the conversation, feeds the body through a [`SentinelDecoder`] and
//! applies every decoded event to the [`Conversation`]. A request can be
//! stopped at any point through its [`CancelHandle`].

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::decoder::{DecodedEvent, SentinelDecoder};
use super::view_model::Conversation;
use crate::relay::orchestrator::{PdfInput, RelayRequest};

const PLAYGROUND_PATH: &str = "/api/playground";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed: {0}")]
    Status(u16),
}

/// Per-request options beyond the conversation itself.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub input_images: Vec<String>,
    pub input_pdfs: Vec<PdfInput>,
    pub mask_data_url: Option<String>,
    pub reasoning_effort: Option<String>,
    pub force_image_generation: bool,
}

/// How a `send` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Stopped,
    Failed(String),
    /// Blank input; nothing was sent.
    Rejected,
}

/// Sender half; `cancel` stops the paired request.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once `cancel` is called. Pending forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelToken(rx))
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), PLAYGROUND_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn send(
        &self,
        conversation: &mut Conversation,
        text: &str,
        options: SendOptions,
        cancel: CancelToken,
    ) -> SendOutcome {
        self.send_with(conversation, text, options, cancel, |_, _| {})
            .await
    }

    /// Like [`send`](Self::send), calling `on_event` after each decoded
    /// event has been applied.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn send_with<F>(
        &self,
        conversation: &mut Conversation,
        text: &str,
        options: SendOptions,
        mut cancel: CancelToken,
        mut on_event: F,
    ) -> SendOutcome
    where
        F: FnMut(&Conversation, &DecodedEvent),
    {
        let previous_response_id = conversation.previous_response_id().map(str::to_string);
        if !conversation.submit_user(text) {
            return SendOutcome::Rejected;
        }

        let request = build_request(conversation, options, previous_response_id);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                conversation.finish();
                return SendOutcome::Stopped;
            }
            result = self.open(&request) => result,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Relay request failed");
                let message = e.to_string();
                conversation.fail(&message);
                return SendOutcome::Failed(message);
            }
        };

        conversation.begin_assistant();
        let mut decoder = SentinelDecoder::new();
        let mut body = response.bytes_stream();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Request stopped");
                    conversation.finish();
                    return SendOutcome::Stopped;
                }
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.feed(&bytes) {
                        apply(conversation, event, &mut on_event);
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Relay stream interrupted");
                    let message = e.to_string();
                    conversation.fail(&message);
                    return SendOutcome::Failed(message);
                }
                None => break,
            }
        }

        for event in decoder.finish() {
            apply(conversation, event, &mut on_event);
        }
        debug!("Relay stream complete");
        conversation.finish();
        SendOutcome::Completed
    }

    async fn open(&self, request: &RelayRequest) -> Result<reqwest::Response, ClientError> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

fn apply<F>(conversation: &mut Conversation, event: DecodedEvent, on_event: &mut F)
where
    F: FnMut(&Conversation, &DecodedEvent),
{
    let seen = event.clone();
    conversation.apply(event);
    on_event(conversation, &seen);
}

fn build_request(
    conversation: &Conversation,
    options: SendOptions,
    previous_response_id: Option<String>,
) -> RelayRequest {
    RelayRequest {
        messages: conversation.request_history(),
        input_images: (!options.input_images.is_empty()).then_some(options.input_images),
        input_pdfs: (!options.input_pdfs.is_empty()).then_some(options.input_pdfs),
        mask_data_url: options.mask_data_url,
        previous_response_id,
        reasoning_effort: options.reasoning_effort,
        force_image_generation: options.force_image_generation.then_some(true),
    }
}
