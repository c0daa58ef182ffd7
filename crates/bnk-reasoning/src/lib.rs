//! Text-completion layer for bnk.
//!
//! This crate provides a unified interface for sending a system/user prompt
//! pair to an external reasoning service and getting raw text back:
//! - `ClaudeBackend` for the Anthropic Messages API
//! - `OpenAiBackend` for the OpenAI Chat Completions API
//!
//! Prompt construction and response schemas live in `bnk-core`; this crate
//! only moves text over the wire.

mod backend;
mod error;
mod response;

pub use backend::claude::ClaudeBackend;
pub use backend::openai::OpenAiBackend;
pub use backend::{
    calculate_backoff_delay, Backend, CompletionBackend, CompletionRequest, ProviderKind,
    DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};
pub use error::{ErrorKind, ReasoningError};
pub use response::strip_code_fences;

/// Result type for completion operations.
pub type Result<T> = std::result::Result<T, ReasoningError>;
