//! Decoding of `text/event-stream` completion bodies.
//!
//! Only `data:` lines matter. Each carries a JSON [`CompletionChunk`]; the
//! text of its first choice's delta is yielded in arrival order. `[DONE]`
//! frames, blank lines, comments and other fields are ignored. A frame whose
//! payload does not parse is logged and skipped without ending the stream.

use futures_util::{Stream, StreamExt, pin_mut};
use memchr::memchr;
use tracing::{debug, warn};

use crate::error::Error;
use crate::http::CompletionChunk;

/// Prefix of a data line.
pub const DATA_PREFIX: &str = "data:";

/// Terminal sentinel some servers send before closing the stream.
pub const DONE: &str = "[DONE]";

/// What a single line of the stream turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text to hand to the caller.
    Delta(String),
    /// A data frame without text (role announcements, finish reasons).
    Empty,
    /// The `[DONE]` sentinel.
    Done,
    /// A blank line or a non-data field.
    Ignored,
    /// A data frame whose payload is not a completion chunk.
    Malformed,
}

/// Classify one line, without its terminator.
pub fn parse_line(line: &str) -> Frame {
    let line = line.trim_end_matches('\r');
    let Some(payload) = line.strip_prefix(DATA_PREFIX).map(str::trim) else {
        return Frame::Ignored;
    };

    if payload.is_empty() {
        return Frame::Empty;
    }
    if payload == DONE {
        debug!("Completion stream signalled done");
        return Frame::Done;
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk.into_text().map_or(Frame::Empty, Frame::Delta),
        Err(e) => {
            warn!(error = %e, "Skipping malformed stream frame");
            Frame::Malformed
        }
    }
}

/// Reassembles lines from arbitrarily split byte chunks.
///
/// A multi-byte character split across chunks is kept intact because lines
/// are only decoded once their terminating `\n` has arrived.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete line, if one is buffered. Lines that are not UTF-8 are
    /// logged and dropped.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(newline) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(line) = decode(&line[..newline]) {
                return Some(line);
            }
        }
        None
    }

    /// Whatever is left after the body ended, as a final line.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        decode(&rest)
    }
}

fn decode(line: &[u8]) -> Option<String> {
    match std::str::from_utf8(line) {
        Ok(line) => Some(line.to_string()),
        Err(e) => {
            warn!(error = %e, "Skipping stream line that is not UTF-8");
            None
        }
    }
}

/// Decode every complete line in `lines` and collect the deltas.
pub fn drain_deltas(lines: &mut LineBuffer) -> Vec<String> {
    let mut deltas = Vec::new();
    while let Some(line) = lines.next_line() {
        if let Frame::Delta(text) = parse_line(&line) {
            deltas.push(text);
        }
    }
    deltas
}

/// Turn a stream of body chunks into a stream of text deltas.
///
/// The stream ends when the body ends; a body error is yielded once and ends
/// the stream.
pub fn delta_stream<S, B, E>(body: S) -> impl Stream<Item = Result<String, Error>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    async_stream::stream! {
        pin_mut!(body);
        let mut lines = LineBuffer::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    lines.push(bytes.as_ref());
                    for delta in drain_deltas(&mut lines) {
                        yield Ok(delta);
                    }
                }
                Err(e) => {
                    yield Err(Error::from(e));
                    break;
                }
            }
        }

        if let Some(line) = lines.finish() {
            if let Frame::Delta(text) = parse_line(&line) {
                yield Ok(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use futures_util::stream;

    fn frame(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    async fn collect(chunks: Vec<&[u8]>) -> Vec<String> {
        let body = stream::iter(chunks.into_iter().map(Ok::<_, Error>));
        delta_stream(body)
            .map(|delta| delta.unwrap())
            .collect()
            .await
    }

    #[test]
    fn line_classification() {
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            Frame::Delta("Hi".into())
        );
        assert_eq!(
            parse_line(r#"data:{"choices":[{"delta":{"content":"Hi"}}]}"#),
            Frame::Delta("Hi".into())
        );
        assert_eq!(parse_line("data: [DONE]"), Frame::Done);
        assert_eq!(parse_line(""), Frame::Ignored);
        assert_eq!(parse_line(": keep-alive"), Frame::Ignored);
        assert_eq!(parse_line("event: message"), Frame::Ignored);
        assert_eq!(parse_line("data: {oops"), Frame::Malformed);
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{}}]}"#),
            Frame::Empty
        );
    }

    #[test]
    fn crlf_lines() {
        let mut lines = LineBuffer::new();
        lines.push(b"data: [DONE]\r\n");
        assert_eq!(parse_line(&lines.next_line().unwrap()), Frame::Done);
    }

    #[tokio::test]
    async fn frames_split_across_chunks() {
        let body = format!("{}{}{}", frame("Hel"), frame("lo"), "data: [DONE]\n\n");
        let (a, b) = body.as_bytes().split_at(17);
        let (b, c) = b.split_at(40);

        assert_eq!(collect(vec![a, b, c]).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn byte_at_a_time() {
        let body = format!("{}{}", frame("é☃"), frame("!"));
        let chunks: Vec<&[u8]> = body.as_bytes().chunks(1).collect();

        assert_eq!(collect(chunks).await, vec!["é☃", "!"]);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let body = format!("{}data: {{broken\n\n{}", frame("a"), frame("b"));
        assert_eq!(collect(vec![body.as_bytes()]).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unterminated_last_line_is_decoded() {
        let body = frame("tail");
        let body = body.trim_end();
        assert_eq!(collect(vec![body.as_bytes()]).await, vec!["tail"]);
    }

    #[tokio::test]
    async fn body_error_ends_stream() {
        let first = frame("ok");
        let body = stream::iter(vec![
            Ok(first.into_bytes()),
            Err(Error::from(TransportError::Http {
                message: "reset".into(),
            })),
            Ok(frame("never").into_bytes()),
        ]);

        let items: Vec<_> = delta_stream(body).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "ok");
        assert!(items[1].is_err());
    }
}
