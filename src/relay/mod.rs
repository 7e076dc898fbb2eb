//! Server-side relay: intent routing, event normalization and encoding.

pub mod attachments;
pub mod context;
pub mod encoder;
pub mod events;
pub mod finalize;
pub mod history;
pub mod intent;
pub mod orchestrator;
pub mod redact;

pub use encoder::SentinelEncoder;
pub use events::{Citation, RelayEvent};
pub use intent::{classify_intent, IntentSignals, Route};
pub use orchestrator::{RelayOrchestrator, RelayRequest};
pub use redact::Redactor;
