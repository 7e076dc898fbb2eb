//! Mock infrastructure for the upstream provider
//!
//! - OpenAI Responses API (streamed SSE)
//! - OpenAI Images edit API
//! - Container file content

pub mod openai;

pub use openai::*;
