//! Anthropic Messages API client used by the recommendation service.
//!
//! Only the non-streaming endpoint is used: a recommendation is a single
//! request carrying text or an image, answered by one JSON document.

mod client;
mod error;
mod types;

pub use client::ClaudeClient;
pub use error::ClaudeError;
pub use types::{
    ChatRequest, ChatResponse, ContentBlock, ImageSource, Message, MessageContent, StopReason,
    Usage,
};
