//! Server-sent-events decoding for `GET /callers/stream`.
//!
//! The backend writes one `data: <json>\n\n` block per message and never
//! negotiates reconnection at the protocol level, so this module only
//! frames and parses. Reconnect policy belongs to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use callwatch_api::{CallerClient, FeedFrame};
//!
//! let mut stream = client.subscribe().await?;
//! while let Some(frame) = stream.next().await {
//!     match frame? {
//!         FeedFrame::Message(msg) => println!("{}", msg.kind()),
//!         FeedFrame::Malformed { error, .. } => eprintln!("bad payload: {error}"),
//!     }
//! }
//! ```

use std::fmt::Display;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};

use crate::error::Error;
use crate::models::StreamMessage;

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// A well-formed message.
    Message(StreamMessage),
    /// A payload that was not a valid message. Non-fatal: the stream keeps going.
    Malformed { error: String, raw: String },
}

/// Boxed stream of frames. Ends after the first `Err` or when the
/// server closes the body.
pub type FeedStream = Pin<Box<dyn Stream<Item = Result<FeedFrame, Error>> + Send>>;

// ── Framing ──────────────────────────────────────────────────────────

/// Incremental SSE line decoder.
///
/// Feed it arbitrary byte chunks; it returns the `data` payload of every
/// event completed by that chunk. Chunk boundaries may fall anywhere,
/// including inside a multi-byte UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every payload it completes, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            let line = &line[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(payload) = self.process_line(line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    fn process_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(b":") {
            return None;
        }

        let text = String::from_utf8_lossy(line);
        let (field, value) = match text.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (text.as_ref(), ""),
        };

        // `event`, `id` and `retry` carry nothing the backend uses.
        if field == "data" {
            self.data.push(value.to_owned());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Parse one event payload. Never fails: bad JSON becomes [`FeedFrame::Malformed`].
pub fn parse_frame(payload: &str) -> FeedFrame {
    match serde_json::from_str::<StreamMessage>(payload) {
        Ok(msg) => FeedFrame::Message(msg),
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse stream payload");
            FeedFrame::Malformed {
                error: e.to_string(),
                raw: payload.to_owned(),
            }
        }
    }
}

/// Turn a response body into a [`FeedStream`].
///
/// A body error yields one `Err(Error::StreamClosed)` and ends the stream.
/// A partial event left in the buffer at end of body is discarded.
pub fn decode_body<S, E>(body: S) -> FeedStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut body = Box::pin(body);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for payload in decoder.feed(&bytes) {
                        yield Ok(parse_frame(&payload));
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "event stream body failed");
                    yield Err(Error::StreamClosed(e.to_string()));
                    break;
                }
            }
        }

        tracing::debug!("event stream body ended");
    })
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b"data: {\"type\":\"heartbeat\"}\n\n");
        assert_eq!(out, vec![r#"{"type":"heartbeat"}"#.to_owned()]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: {\"type\":").is_empty());
        assert!(dec.feed(b"\"heartbeat\"}\n").is_empty());
        let out = dec.feed(b"\n");
        assert_eq!(out, vec![r#"{"type":"heartbeat"}"#.to_owned()]);
    }

    #[test]
    fn crlf_comments_and_other_fields() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b": keep-alive\r\nevent: msg\r\nid: 4\r\ndata:one\r\ndata: two\r\n\r\n");
        assert_eq!(out, vec!["one\ntwo".to_owned()]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut dec = SseDecoder::new();
        let text = "data: incendio en café\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(dec.feed(&text[..split]).is_empty());
        let out = dec.feed(&text[split..]);
        assert_eq!(out, vec!["incendio en café".to_owned()]);
    }

    #[test]
    fn blank_lines_without_data_dispatch_nothing() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"\n\n\n").is_empty());
    }

    #[test]
    fn parse_malformed_payload() {
        let frame = parse_frame("not json at all");
        let FeedFrame::Malformed { raw, .. } = frame else {
            panic!("expected malformed frame");
        };
        assert_eq!(raw, "not json at all");
    }

    #[tokio::test]
    async fn decode_body_yields_frames_then_error() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"heartbeat\"}\n\n")),
            Ok(Bytes::from_static(b"data: garbage\n\n")),
            Err("connection reset".to_owned()),
            Ok(Bytes::from_static(b"data: {\"type\":\"heartbeat\"}\n\n")),
        ];
        let mut stream = decode_body(futures_util::stream::iter(chunks));

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, FeedFrame::Message(StreamMessage::Heartbeat { .. })));

        let second = stream.next().await.unwrap().unwrap();
        assert!(matches!(second, FeedFrame::Malformed { .. }));

        let third = stream.next().await.unwrap();
        assert!(matches!(third, Err(Error::StreamClosed(_))));

        assert!(stream.next().await.is_none());
    }
}
