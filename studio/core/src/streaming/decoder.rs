//! Client-side reading of the reframed stream

use serde::Deserialize;

use super::lines::LineBuffer;
use super::reframer::{data_payload, DONE_SENTINEL};

#[derive(Deserialize)]
struct ContentFrame {
    content: String,
}

/// Accumulates chapter text from the browser-facing event stream
///
/// Mirrors what the writing view does with `/api/generate-chapter`: append
/// every `content` fragment and stop at the sentinel. Malformed frames are
/// skipped.
#[derive(Debug, Default)]
pub struct ContentDecoder {
    lines: LineBuffer,
    text: String,
    done: bool,
}

impl ContentDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk, returning the fragments it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }
        let done = &mut self.done;
        self.lines
            .feed(chunk, |line| Self::accept(line, done, &mut fragments));
        self.text.extend(fragments.iter().map(String::as_str));
        fragments
    }

    /// Process a final unterminated line
    pub fn finish(&mut self) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }
        let done = &mut self.done;
        self.lines
            .flush(|line| Self::accept(line, done, &mut fragments));
        self.text.extend(fragments.iter().map(String::as_str));
        fragments
    }

    /// Text accumulated so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the sentinel has been seen
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Take the accumulated text
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    fn accept(line: &str, done: &mut bool, fragments: &mut Vec<String>) -> bool {
        let Some(payload) = data_payload(line) else {
            return true;
        };
        if payload == DONE_SENTINEL {
            *done = true;
            return false;
        }
        if let Ok(frame) = serde_json::from_str::<ContentFrame>(payload) {
            fragments.push(frame.content);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accumulates_until_sentinel() {
        let mut decoder = ContentDecoder::new();
        let input = "data: {\"content\":\"雾\"}\n\ndata: {\"content\":\"港\"}\n\ndata: [DONE]\n\ndata: {\"content\":\"x\"}\n\n";
        let fragments = decoder.push(input.as_bytes());
        assert_eq!(fragments, vec!["雾", "港"]);
        assert!(decoder.is_done());
        assert_eq!(decoder.text(), "雾港");
        assert!(decoder.push(b"data: {\"content\":\"y\"}\n\n").is_empty());
        assert_eq!(decoder.into_text(), "雾港");
    }

    #[test]
    fn test_skips_malformed_frames() {
        let mut decoder = ContentDecoder::new();
        decoder.push(b"data: {\"content\":\"a\"}\n\ndata: {oops}\n\n: ping\n\n");
        decoder.push(b"data: {\"content\":\"b\"}");
        assert_eq!(decoder.text(), "a");
        assert_eq!(decoder.finish(), vec!["b"]);
        assert_eq!(decoder.text(), "ab");
        assert!(!decoder.is_done());
    }
}
