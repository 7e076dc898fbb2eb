//! Client side of the relay protocol
//!
//! [`SentinelDecoder`] turns the streamed body back into typed events,
//! [`Conversation`] holds what a UI renders and [`RelayClient`] drives both
//! over HTTP.

pub mod decoder;
pub mod session;
pub mod view_model;

pub use decoder::{DecodedEvent, MetaKey, SentinelDecoder};
pub use session::{cancel_pair, CancelHandle, CancelToken, RelayClient, SendOptions, SendOutcome};
pub use view_model::{Conversation, Part, Status, ViewMessage};
