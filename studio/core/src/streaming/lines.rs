//! Newline splitting across transport chunks

/// Accumulates bytes until a full `\n`-terminated line is available
///
/// Lines are decoded only once complete, so a multi-byte UTF-8 character
/// split across two chunks arrives intact. Invalid UTF-8 is replaced rather
/// than rejected. A trailing `\r` is stripped.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and hand every completed line to `on_line`
    ///
    /// `on_line` returns `false` to stop; remaining bytes are then discarded.
    pub(crate) fn feed(&mut self, chunk: &[u8], mut on_line: impl FnMut(&str) -> bool) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            let line = std::mem::take(&mut self.pending);
            if !on_line(decode(&line).as_ref()) {
                return;
            }
        }
        self.pending.extend_from_slice(rest);
    }

    /// Hand the unterminated remainder, if any, to `on_line`
    pub(crate) fn flush(&mut self, on_line: impl FnOnce(&str) -> bool) {
        if self.pending.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.pending);
        on_line(decode(&line).as_ref());
    }

    /// Bytes waiting for a newline
    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode(line: &[u8]) -> std::borrow::Cow<'_, str> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(buffer: &mut LineBuffer, chunk: &[u8], out: &mut Vec<String>) {
        buffer.feed(chunk, |line| {
            out.push(line.to_string());
            true
        });
    }

    #[test]
    fn test_line_spanning_chunks() {
        let mut buffer = LineBuffer::new();
        let mut lines = Vec::new();
        collect(&mut buffer, b"data: a", &mut lines);
        assert!(lines.is_empty());
        assert_eq!(buffer.pending_len(), 7);
        collect(&mut buffer, b"bc\r\n\ndata: d\n", &mut lines);
        assert_eq!(lines, vec!["data: abc", "", "data: d"]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let bytes = "雾\n".as_bytes();
        let mut buffer = LineBuffer::new();
        let mut lines = Vec::new();
        collect(&mut buffer, &bytes[..1], &mut lines);
        collect(&mut buffer, &bytes[1..], &mut lines);
        assert_eq!(lines, vec!["雾"]);
    }

    #[test]
    fn test_stop_discards_rest() {
        let mut buffer = LineBuffer::new();
        let mut seen = 0;
        buffer.feed(b"one\ntwo\nthree", |_| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_flush_emits_unterminated_line() {
        let mut buffer = LineBuffer::new();
        buffer.feed(b"tail", |_| true);
        let mut flushed = None;
        buffer.flush(|line| {
            flushed = Some(line.to_string());
            true
        });
        assert_eq!(flushed.as_deref(), Some("tail"));
        assert_eq!(buffer.pending_len(), 0);
    }
}
