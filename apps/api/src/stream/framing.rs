//! Line framing for `text/event-stream` bodies.
//!
//! Network reads split the stream at arbitrary byte offsets, including inside a
//! UTF-8 sequence. [`LineBuffer`] works on bytes and only releases a line once its
//! terminator has arrived, so nothing is decoded from a partial fragment.

/// Prefix of an SSE data line.
pub const DATA_PREFIX: &str = "data:";

/// Payload of the terminal event.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Start of the unconsumed region. Compacted lazily on `push`.
    start: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete line without its `\n` (and a preceding `\r`, if any).
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let rest = &self.buf[self.start..];
        let end = rest.iter().position(|&b| b == b'\n')?;
        let mut line = &rest[..end];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        let line = line.to_vec();
        self.start += end + 1;
        Some(line)
    }

    /// Bytes received after the last complete line.
    pub fn pending(&self) -> &[u8] {
        &self.buf[self.start..]
    }
}

/// Payload of a `data:` line, with the single optional space after the colon removed.
/// `None` for blank lines, comments and other SSE fields.
pub fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DATA_PREFIX)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}
