//! Completion Streaming
//!
//! Chapter text is streamed from the upstream completion API to the browser
//! as it is generated. The upstream speaks OpenAI-style server-sent events
//! with nested `choices[0].delta.content` payloads; the browser receives a
//! flat `{"content": ...}` frame per fragment and a final `[DONE]`.
//!
//! # Architecture
//!
//! ```text
//! upstream bytes ──▶ LineBuffer ──▶ parse_upstream_line ──▶ ReframedEvent ──▶ browser bytes
//!  (any split)      (whole lines)    (skip noise)          (Content | Done)
//! ```
//!
//! - [`reframe`] adapts a byte stream and is pull-driven, so a slow reader
//!   slows the upstream read and dropping it closes the upstream connection.
//! - [`SseReframer`] is the same state machine without the stream plumbing.
//! - [`ContentDecoder`] reads the reframed format back into text.

mod decoder;
mod lines;
mod reframer;

pub use decoder::ContentDecoder;
pub use reframer::{
    parse_upstream_line, reframe, ReframedEvent, SseReframer, DATA_PREFIX, DONE_SENTINEL,
};
