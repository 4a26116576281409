//! Upstream SSE to browser SSE reframing
//!
//! Upstream (OpenAI-compatible):
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"雾"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Browser:
//!
//! ```text
//! data: {"content":"雾"}
//!
//! data: [DONE]
//! ```

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use super::lines::LineBuffer;

/// SSE field marker for event data
pub const DATA_PREFIX: &str = "data:";

/// Terminal payload of both wire formats
pub const DONE_SENTINEL: &str = "[DONE]";

/// One event of the browser-facing stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReframedEvent {
    /// An incremental text fragment
    Content(String),
    /// End of the completion
    Done,
}

impl ReframedEvent {
    /// Render as an SSE frame
    #[must_use]
    pub fn to_sse(&self) -> String {
        match self {
            Self::Content(text) => {
                format!("{DATA_PREFIX} {}\n\n", serde_json::json!({ "content": text }))
            }
            Self::Done => format!("{DATA_PREFIX} {DONE_SENTINEL}\n\n"),
        }
    }
}

#[derive(Deserialize)]
struct UpstreamChunk {
    #[serde(default)]
    choices: Vec<UpstreamChoice>,
}

#[derive(Deserialize)]
struct UpstreamChoice {
    #[serde(default)]
    delta: UpstreamDelta,
}

#[derive(Default, Deserialize)]
struct UpstreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Payload of an SSE `data:` line, or `None` for any other line
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    line.trim().strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Interpret one upstream line
///
/// Blank lines, non-data lines, unparseable payloads and chunks without text
/// (role announcements, reasoning deltas, finish markers) yield `None`.
#[must_use]
pub fn parse_upstream_line(line: &str) -> Option<ReframedEvent> {
    let payload = data_payload(line)?;
    if payload == DONE_SENTINEL {
        return Some(ReframedEvent::Done);
    }

    let chunk: UpstreamChunk = serde_json::from_str(payload).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .map(ReframedEvent::Content)
}

/// Incremental reframer over arbitrarily split upstream bytes
///
/// Nothing is emitted after [`ReframedEvent::Done`].
#[derive(Debug, Default)]
pub struct SseReframer {
    lines: LineBuffer,
    done: bool,
}

impl SseReframer {
    /// Create a reframer with an empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: LineBuffer::new(),
            done: false,
        }
    }

    /// Consume a transport chunk, returning the events it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ReframedEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        let done = &mut self.done;
        self.lines.feed(chunk, |line| Self::accept(line, done, &mut events));
        events
    }

    /// Process a final unterminated line once the upstream has ended
    pub fn finish(&mut self) -> Vec<ReframedEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        let done = &mut self.done;
        self.lines.flush(|line| Self::accept(line, done, &mut events));
        events
    }

    /// Whether the sentinel has been seen
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn accept(line: &str, done: &mut bool, events: &mut Vec<ReframedEvent>) -> bool {
        match parse_upstream_line(line) {
            Some(ReframedEvent::Done) => {
                *done = true;
                events.push(ReframedEvent::Done);
                false
            }
            Some(event) => {
                events.push(event);
                true
            }
            None => true,
        }
    }
}

fn encode(events: &[ReframedEvent]) -> Option<Bytes> {
    if events.is_empty() {
        return None;
    }
    let frame: String = events.iter().map(ReframedEvent::to_sse).collect();
    Some(Bytes::from(frame))
}

struct ReframeState<S> {
    upstream: S,
    reframer: SseReframer,
    ended: bool,
}

/// Reframe an upstream SSE byte stream into the browser format
///
/// Pull-driven: the upstream is polled only when the consumer asks for the
/// next item, so backpressure reaches the upstream connection. Each output
/// item holds the events completed by one upstream chunk. The upstream is
/// dropped after the sentinel or after its first error, which is passed
/// through and ends the stream.
pub fn reframe<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: Send,
{
    let state = ReframeState {
        upstream,
        reframer: SseReframer::new(),
        ended: false,
    };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            if state.ended {
                return None;
            }
            match state.upstream.next().await {
                Some(Ok(chunk)) => {
                    let events = state.reframer.push(&chunk);
                    state.ended = state.reframer.is_done();
                    if let Some(frame) = encode(&events) {
                        return Some((Ok(frame), Some(state)));
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("Upstream stream failed, ending reframed stream");
                    return Some((Err(e), None));
                }
                None => {
                    state.ended = true;
                    let events = state.reframer.finish();
                    return encode(&events).map(|frame| (Ok(frame), Some(state)));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]})
        )
    }

    #[test]
    fn test_parse_content_delta() {
        assert_eq!(
            parse_upstream_line(delta("雾").trim()),
            Some(ReframedEvent::Content("雾".to_string()))
        );
    }

    #[test]
    fn test_parse_sentinel_and_ignored_lines() {
        assert_eq!(parse_upstream_line("data: [DONE]"), Some(ReframedEvent::Done));
        assert_eq!(parse_upstream_line(""), None);
        assert_eq!(parse_upstream_line(": keep-alive"), None);
        assert_eq!(parse_upstream_line("event: message"), None);
        assert_eq!(parse_upstream_line("data: {\"choices\":[{\"delta\":{\"con"), None);
        assert_eq!(
            parse_upstream_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            None
        );
        assert_eq!(
            parse_upstream_line(
                r#"data: {"choices":[{"delta":{"content":null,"reasoning_content":"思考"}}]}"#
            ),
            None
        );
        assert_eq!(parse_upstream_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(parse_upstream_line("data: 42"), None);
    }

    #[test]
    fn test_to_sse_escapes_content() {
        let event = ReframedEvent::Content("line\n\"quoted\"".to_string());
        assert_eq!(event.to_sse(), "data: {\"content\":\"line\\n\\\"quoted\\\"\"}\n\n");
        assert_eq!(ReframedEvent::Done.to_sse(), "data: [DONE]\n\n");
    }

    #[test]
    fn test_push_across_chunk_boundaries() {
        let input = format!("{}{}", delta("一"), delta("二"));
        let (head, tail) = input.split_at(10);

        let mut reframer = SseReframer::new();
        assert!(reframer.push(head.as_bytes()).is_empty());
        assert_eq!(
            reframer.push(tail.as_bytes()),
            vec![
                ReframedEvent::Content("一".to_string()),
                ReframedEvent::Content("二".to_string())
            ]
        );
    }

    #[test]
    fn test_nothing_after_sentinel() {
        let input = format!("{}data: [DONE]\n\n{}", delta("a"), delta("b"));
        let mut reframer = SseReframer::new();
        let events = reframer.push(input.as_bytes());
        assert_eq!(
            events,
            vec![ReframedEvent::Content("a".to_string()), ReframedEvent::Done]
        );
        assert!(reframer.is_done());
        assert!(reframer.push(delta("c").as_bytes()).is_empty());
        assert!(reframer.finish().is_empty());
    }

    #[test]
    fn test_finish_processes_unterminated_line() {
        let mut reframer = SseReframer::new();
        let input = delta("尾");
        assert!(reframer.push(input.trim_end().as_bytes()).is_empty());
        assert_eq!(
            reframer.finish(),
            vec![ReframedEvent::Content("尾".to_string())]
        );
    }

    #[tokio::test]
    async fn test_reframe_stream_passes_errors_and_stops() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from(delta("a"))),
            Err("connection reset".to_string()),
            Ok(Bytes::from(delta("b"))),
        ];
        let output: Vec<Result<Bytes, String>> =
            reframe(stream::iter(chunks)).collect().await;

        assert_eq!(output.len(), 2);
        assert_eq!(
            output[0].as_ref().unwrap(),
            &Bytes::from("data: {\"content\":\"a\"}\n\n")
        );
        assert_eq!(output[1].as_ref().unwrap_err(), "connection reset");
    }

    #[tokio::test]
    async fn test_reframe_stream_stops_polling_after_sentinel() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from(format!("{}data: [DONE]\n\n", delta("a")))),
            Ok(Bytes::from(delta("late"))),
        ];
        let output: Vec<Bytes> = reframe(stream::iter(chunks))
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(
            output,
            vec![Bytes::from("data: {\"content\":\"a\"}\n\ndata: [DONE]\n\n")]
        );
    }
}
