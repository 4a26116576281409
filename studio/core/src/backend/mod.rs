//! Completion Backend Integration
//!
//! This module provides abstracted access to chat-completion providers
//! through a common trait interface.
//!
//! # Available Backends
//!
//! - **OpenAI-compatible**: DeepSeek (default) or any API with the same wire format
//!
//! # Usage
//!
//! ```ignore
//! use studio_core::backend::{ChatMessage, CompletionBackend, CompletionOptions, CompletionRequest};
//!
//! let request = CompletionRequest::new(
//!     vec![ChatMessage::user("Hello!")],
//!     CompletionOptions::new("deepseek-chat"),
//! );
//! let text = backend.complete(&request).await?;
//! ```

mod openai;
mod traits;

pub use openai::OpenAiCompatibleBackend;
pub use traits::{
    ByteStream, ChatMessage, CompletionBackend, CompletionOptions, CompletionRequest, MessageRole,
};
