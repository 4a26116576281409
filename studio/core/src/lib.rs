//! Studio Core - Generation Pipeline for novel-studio
//!
//! This crate holds everything between an HTTP request for generated novel
//! content and the upstream chat-completion API. It has no HTTP server
//! dependencies; the daemon crate wires it to routes.
//!
//! # Architecture
//!
//! ```text
//!   request ──► prompt (validate + assemble) ──► CompletionBackend
//!                                                   │
//!                       ┌───────────────────────────┴──────────────┐
//!                       │ blocking                                 │ streaming
//!                       ▼                                          ▼
//!                 raw completion text                    upstream SSE bytes
//!                       │                                          │
//!                 recovery (JSON fallback chain)           SseReframer
//!                       │                                          │
//!                 novel (schema validation)              data: {"content"} events
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: completion API abstraction and the OpenAI-compatible client
//! - [`config`]: TOML / environment / CLI configuration
//! - [`error`]: the crate error type
//! - [`generator`]: the request handler tying prompts, backend and parsing together
//! - [`novel`]: novel metadata types and validation of model output
//! - [`prompt`]: deterministic prompt assembly per generation kind
//! - [`recovery`]: best-effort JSON extraction from model output
//! - [`session`]: editing-session state for one open project
//! - [`streaming`]: upstream SSE reframing and the browser-side content decoder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod generator;
pub mod novel;
pub mod prompt;
pub mod recovery;
pub mod session;
pub mod streaming;

pub use backend::{
    ByteStream, ChatMessage, CompletionBackend, CompletionOptions, CompletionRequest,
    MessageRole, OpenAiCompatibleBackend,
};
pub use error::StudioError;
pub use generator::{GenerationSettings, NovelGenerator};
pub use novel::{Chapter, ChapterDescriptor, ChapterStatus, Character, NovelStructure};
pub use prompt::{ChapterRequest, OutlineRequest, Prompt, StructureRequest};
pub use recovery::{recover_json, RecoveryPolicy, Strategy};
pub use session::{Project, ProjectForm, ProjectSession, ProjectStatus, WorkflowStep};
pub use streaming::{reframe, ContentDecoder, ReframedEvent, SseReframer, DONE_SENTINEL};

pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, StudioConfig, StudioToml, UpstreamConfig,
};
