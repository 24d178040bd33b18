//! Client-side decoder for the chat event stream.
//!
//! Feed it raw body bytes as they arrive, in any fragmentation; it keeps the
//! transcript (all deltas concatenated in order) and whether `[DONE]` was seen.

use thiserror::Error;
use tracing::debug;

use crate::stream::framing::{data_payload, LineBuffer, DONE_SENTINEL};
use crate::stream::wire::DeltaPayload;

/// A single event that could not be decoded. Recovered by skipping the line.
#[derive(Debug, Error)]
pub enum StreamDecodeError {
    #[error("event is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("event payload is not a delta: {0}")]
    Json(#[from] serde_json::Error),
}

/// Final state of a decoded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStream {
    pub transcript: String,
    /// `true` only if the terminal sentinel arrived.
    pub completed: bool,
}

#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineBuffer,
    transcript: String,
    done: bool,
    skipped: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a chunk of body bytes and returns the deltas it completed, in order.
    /// Bytes arriving after `[DONE]` are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }

        self.lines.push(bytes);
        while let Some(line) = self.lines.next_line() {
            match decode_line(&line) {
                Ok(Some(Event::Delta(text))) => {
                    self.transcript.push_str(&text);
                    deltas.push(text);
                }
                Ok(Some(Event::Done)) => {
                    self.done = true;
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    self.skipped += 1;
                    debug!("Skipping undecodable stream event: {e}");
                }
            }
        }
        deltas
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of malformed events skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> DecodedStream {
        let trailing = self.lines.pending().len();
        if !self.done && trailing > 0 {
            debug!(bytes = trailing, "Stream ended inside an unterminated line");
        }
        DecodedStream {
            transcript: self.transcript,
            completed: self.done,
        }
    }
}

enum Event {
    Delta(String),
    Done,
}

/// `Ok(None)` for lines that carry no event (separators, comments, other fields).
fn decode_line(line: &[u8]) -> Result<Option<Event>, StreamDecodeError> {
    let line = std::str::from_utf8(line)?;
    let Some(payload) = data_payload(line) else {
        return Ok(None);
    };
    if payload.trim() == DONE_SENTINEL {
        return Ok(Some(Event::Done));
    }
    let delta: DeltaPayload = serde_json::from_str(payload)?;
    Ok(Some(Event::Delta(delta.content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::wire::WireEvent;

    fn wire(deltas: &[&str]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for d in deltas {
            bytes.extend_from_slice(&WireEvent::delta(*d).unwrap().encode());
        }
        bytes.extend_from_slice(&WireEvent::Done.encode());
        bytes
    }

    fn decode_in_pieces(bytes: &[u8], cuts: &[usize]) -> DecodedStream {
        let mut decoder = StreamDecoder::new();
        let mut start = 0;
        for &cut in cuts {
            decoder.feed(&bytes[start..cut]);
            start = cut;
        }
        decoder.feed(&bytes[start..]);
        decoder.finish()
    }

    #[test]
    fn test_hello_scenario() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(&wire(&["Hel", "lo"]));
        assert_eq!(decoder.transcript(), "Hello");
        assert!(decoder.is_done());
    }

    #[test]
    fn test_every_single_split_point_matches_unsplit() {
        let bytes = wire(&["Résumé ", "tips:\n", "1. quantify \"impact\"", " ✓"]);
        let whole = decode_in_pieces(&bytes, &[]);
        assert!(whole.completed);
        assert_eq!(whole.transcript, "Résumé tips:\n1. quantify \"impact\" ✓");

        for cut in 1..bytes.len() {
            assert_eq!(decode_in_pieces(&bytes, &[cut]), whole, "split at {cut}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = wire(&["one ", "two ", "three"]);
        let cuts: Vec<usize> = (1..bytes.len()).collect();
        let decoded = decode_in_pieces(&bytes, &cuts);
        assert_eq!(decoded.transcript, "one two three");
        assert!(decoded.completed);
    }

    #[test]
    fn test_split_inside_done_literal() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"data: {\"content\":\"ok\"}\n\ndata: [DO");
        assert!(!decoder.is_done());
        decoder.feed(b"NE]\n\n");
        assert!(decoder.is_done());
        assert_eq!(decoder.transcript(), "ok");
    }

    #[test]
    fn test_ignores_bytes_after_done() {
        let mut decoder = StreamDecoder::new();
        let mut bytes = wire(&["final"]);
        bytes.extend_from_slice(b"data: {\"content\":\" extra\"}\n\n");
        decoder.feed(&bytes);
        decoder.feed(b"data: {\"content\":\" more\"}\n\n");
        assert_eq!(decoder.transcript(), "final");
        assert!(decoder.is_done());
    }

    #[test]
    fn test_malformed_event_is_skipped() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"data: {\"content\":\"a\"}\n\n");
        decoder.feed(b"data: {\"content\": broken\n\n");
        decoder.feed(b"data: {\"other\":1}\n\n");
        decoder.feed(b"data: {\"content\":\"b\"}\n\ndata: [DONE]\n\n");
        assert_eq!(decoder.transcript(), "ab");
        assert_eq!(decoder.skipped(), 2);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_feed_returns_new_deltas_only() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.feed(b"data: {\"content\":\"He").is_empty());
        assert_eq!(decoder.feed(b"y\"}\n\ndata: {\"content\":\"!\"}\n\n"), vec!["Hey", "!"]);
    }

    #[test]
    fn test_truncated_stream_is_not_completed() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"data: {\"content\":\"partial\"}\n\ndata: {\"con");
        let decoded = decoder.finish();
        assert_eq!(decoded.transcript, "partial");
        assert!(!decoded.completed);
    }

    #[test]
    fn test_comments_and_crlf_tolerated() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b": keep-alive\r\n\r\ndata: {\"content\":\"x\"}\r\n\r\ndata: [DONE]\r\n\r\n");
        assert_eq!(decoder.transcript(), "x");
        assert!(decoder.is_done());
    }
}
