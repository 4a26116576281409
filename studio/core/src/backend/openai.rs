//! OpenAI-Compatible Backend Implementation
//!
//! Completion backend for any provider speaking the OpenAI chat-completions
//! wire format. DeepSeek is the default deployment target.
//!
//! # Wire format
//!
//! - `POST {base_url}/chat/completions` with `Authorization: Bearer <key>`
//! - Body: `{model, messages, temperature, stream, max_tokens?, response_format?}`
//! - Blocking reply: `choices[0].message.content`
//! - Streaming reply: `data: <chunk json>` lines, terminated by `data: [DONE]`

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{ByteStream, ChatMessage, CompletionBackend, CompletionRequest};
use crate::config::UpstreamConfig;
use crate::error::StudioError;

/// Connection establishment limit; streaming bodies are not time-limited
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAI-compatible completion client
#[derive(Clone)]
pub struct OpenAiCompatibleBackend {
    /// API root, e.g. `https://api.deepseek.com/v1`
    base_url: String,
    /// Bearer token
    api_key: String,
    /// Limit for blocking completions
    request_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleBackend")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionReply {
    #[serde(default)]
    choices: Vec<ReplyChoice>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleBackend {
    /// Create a new backend
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, StudioError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout,
            http_client,
        })
    }

    /// Create from the upstream section of the configuration
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when no API key is configured, or
    /// [`StudioError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, StudioError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| StudioError::validation("missing DEEPSEEK_API_KEY"))?;
        Self::new(config.base_url.clone(), api_key, config.request_timeout)
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get chat completions endpoint URL
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn body<'a>(request: &'a CompletionRequest, stream: bool) -> ChatCompletionBody<'a> {
        ChatCompletionBody {
            model: &request.options.model,
            messages: &request.messages,
            temperature: request.options.temperature,
            stream,
            max_tokens: request.options.max_tokens,
            response_format: request
                .options
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }

    /// POST the body and reject non-success statuses
    async fn post(
        &self,
        body: &ChatCompletionBody<'_>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, StudioError> {
        let mut builder = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "Failed to read completion API error body");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), "Completion API returned an error");
            return Err(StudioError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, StudioError> {
        let body = Self::body(request, false);
        debug!(
            model = %request.options.model,
            json_mode = request.options.json_mode,
            "Sending blocking completion"
        );

        let response = self.post(&body, Some(self.request_timeout)).await?;
        // Read failures are transport errors; only an unparseable body is malformed.
        let bytes = response.bytes().await?;
        let reply: ChatCompletionReply = serde_json::from_slice(&bytes)
            .map_err(|e| StudioError::MalformedResponse(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| StudioError::MalformedResponse("completion has no content".to_string()))
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ByteStream, StudioError> {
        let body = Self::body(request, true);
        debug!(model = %request.options.model, "Opening streaming completion");

        let response = self.post(&body, None).await?;
        Ok(response.bytes_stream().map_err(StudioError::from).boxed())
    }
}
