//! Completion Backend Traits
//!
//! Trait definitions for chat-completion backends. The generator talks to the
//! upstream model only through [`CompletionBackend`], so tests can substitute
//! a scripted backend and the daemon can swap providers without touching
//! prompt or parsing logic.
//!
//! # Design Philosophy
//!
//! The backend is a thin transport:
//! - Blocking mode returns the raw text of the single completion
//! - Streaming mode returns the raw upstream SSE bytes, untouched
//!
//! Interpreting either is the caller's job (see [`crate::recovery`] and
//! [`crate::streaming`]).

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// Raw byte stream returned by a streaming completion
pub type ByteStream = BoxStream<'static, Result<Bytes, StudioError>>;

/// Author of a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions framing the conversation
    System,
    /// End-user content
    User,
    /// Model output
    Assistant,
}

/// A single chat message sent to the completion API
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Options for a completion request
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOptions {
    /// Model to use (provider-specific identifier)
    pub model: String,
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,
    /// Maximum output tokens (provider default when `None`)
    pub max_tokens: Option<u32>,
    /// Request strict JSON output
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: None,
            json_mode: false,
        }
    }
}

impl CompletionOptions {
    /// Options for the given model with default sampling
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set strict JSON mode
    #[must_use]
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

/// A fully assembled completion request
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// Ordered conversation, system message first
    pub messages: Vec<ChatMessage>,
    /// Model and sampling options
    pub options: CompletionOptions,
}

impl CompletionRequest {
    /// Create a request from messages and options
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>, options: CompletionOptions) -> Self {
        Self { messages, options }
    }
}

/// Chat-completion backend
///
/// Implement this trait to add support for a completion provider.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Get the backend name (e.g., "DeepSeek")
    fn name(&self) -> &str;

    /// Send a request and wait for the complete response text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, StudioError>;

    /// Send a request in streaming mode
    ///
    /// Returns the upstream SSE byte stream as received. Dropping the stream
    /// aborts the upstream request.
    async fn stream(&self, request: &CompletionRequest) -> Result<ByteStream, StudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_options_builder() {
        let options = CompletionOptions::new("deepseek-chat")
            .with_temperature(0.5)
            .with_max_tokens(100)
            .with_json_mode(true);

        assert_eq!(options.model, "deepseek-chat");
        assert!((options.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(options.max_tokens, Some(100));
        assert!(options.json_mode);
    }

    #[test]
    fn test_temperature_is_clamped() {
        let options = CompletionOptions::new("m").with_temperature(5.0);
        assert!((options.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
        let json = serde_json::to_value(ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
