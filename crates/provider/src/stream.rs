//! Incremental decoding of streamed responses.
//!
//! Providers stream either Server-Sent Events or newline-delimited JSON.
//! The decoders buffer raw bytes, so frames split across network chunks
//! (and multi-byte characters split across frames) decode intact. The
//! drivers send the request lazily, on first poll, and own the response:
//! dropping the returned stream drops the connection.

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::{StreamExt, stream};
use rcore::{Error, ProviderId, Result, TextStream};
use reqwest::RequestBuilder;

/// One Server-Sent Event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` name, if any.
    pub event: Option<String>,
    /// All `data:` lines, joined with `\n`.
    pub data: String,
}

/// Buffered SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Feed a chunk, returning every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
        let mut events = Vec::new();
        while let Some(pos) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buf.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event the server did not terminate.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let block = std::mem::take(&mut self.buf);
        parse_block(&String::from_utf8_lossy(&block))
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = SseEvent::default();
    let mut data = Vec::new();
    for line in block.lines() {
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event.event = Some(value.to_owned()),
            "data" => data.push(value),
            _ => {}
        }
    }
    if data.is_empty() && event.event.is_none() {
        return None;
    }
    event.data = data.join("\n");
    Some(event)
}

/// Buffered newline-delimited JSON decoder.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    /// Feed a chunk, returning every non-blank line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_owned());
            }
        }
        lines
    }

    /// Flush an unterminated final line.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&line).trim().to_owned();
        (!line.is_empty()).then_some(line)
    }
}

/// What a decoded frame contributes to the text stream.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Skip,
    Done,
}

/// Send `request` and decode its SSE body, turning each event into a
/// [`Frame`].
pub fn sse<F>(provider: ProviderId, request: RequestBuilder, parse: F) -> TextStream
where
    F: FnMut(SseEvent) -> Result<Frame> + Send + 'static,
{
    Box::pin(frames(provider, request, SseDecoder::default(), parse))
}

/// Send `request` and decode its NDJSON body, turning each line into a
/// [`Frame`].
pub fn ndjson<F>(provider: ProviderId, request: RequestBuilder, parse: F) -> TextStream
where
    F: FnMut(String) -> Result<Frame> + Send + 'static,
{
    Box::pin(frames(provider, request, LineDecoder::default(), parse))
}

/// A framing decoder, so the drivers share one read loop.
pub trait Decoder: Send + 'static {
    type Item: std::fmt::Debug + Send;

    fn push(&mut self, chunk: &[u8]) -> Vec<Self::Item>;

    fn finish(&mut self) -> Option<Self::Item>;
}

impl Decoder for SseDecoder {
    type Item = SseEvent;

    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        SseDecoder::push(self, chunk)
    }

    fn finish(&mut self) -> Option<SseEvent> {
        SseDecoder::finish(self)
    }
}

impl Decoder for LineDecoder {
    type Item = String;

    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        LineDecoder::push(self, chunk)
    }

    fn finish(&mut self) -> Option<String> {
        LineDecoder::finish(self)
    }
}

fn frames<D, F>(
    provider: ProviderId,
    request: RequestBuilder,
    mut decoder: D,
    mut parse: F,
) -> impl Stream<Item = Result<String>> + Send + 'static
where
    D: Decoder,
    F: FnMut(D::Item) -> Result<Frame> + Send + 'static,
{
    try_stream! {
        let response = crate::http::open(provider, request).await?;
        let mut bytes = response.bytes_stream();
        let mut done = false;
        while !done {
            let Some(chunk) = bytes.next().await else {
                break;
            };
            let chunk = chunk.map_err(|e| crate::http::transport(provider, e))?;
            for item in decoder.push(&chunk) {
                tracing::trace!(%provider, "frame: {item:?}");
                match parse(item)? {
                    Frame::Text(text) if !text.is_empty() => {
                        yield text;
                    }
                    Frame::Done => {
                        done = true;
                        break;
                    }
                    _ => {}
                }
            }
        }
        if !done {
            if let Some(item) = decoder.finish() {
                tracing::trace!(%provider, "frame: {item:?}");
                if let Frame::Text(text) = parse(item)? {
                    if !text.is_empty() {
                        yield text;
                    }
                }
            }
        }
    }
}

/// A stream holding a single error, for requests that fail before a
/// connection is opened.
pub fn fail(error: Error) -> TextStream {
    Box::pin(stream::once(async move { Err(error) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: delta\r\nda").is_empty());
        assert!(decoder.push(b"ta: {\"a\":").is_empty());
        let events = decoder.push(b"1}\r\n\r\ndata: two\n\n: comment\n\n");
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: Some("delta".into()),
                    data: "{\"a\":1}".into()
                },
                SseEvent {
                    event: None,
                    data: "two".into()
                },
            ]
        );
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn sse_multiline_data_and_utf8_split() {
        let mut decoder = SseDecoder::default();
        let text = "data: caf\u{e9}\ndata: ok\n\n".as_bytes();
        let (a, b) = text.split_at(10);
        assert!(decoder.push(a).is_empty());
        let events = decoder.push(b);
        assert_eq!(events[0].data, "caf\u{e9}\nok");
    }

    #[test]
    fn sse_unterminated_tail() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish().map(|e| e.data), Some("[DONE]".into()));
    }

    #[test]
    fn ndjson_lines() {
        let mut decoder = LineDecoder::default();
        assert_eq!(decoder.push(b"{\"a\":1}\n{\"b\""), vec!["{\"a\":1}".to_owned()]);
        assert_eq!(decoder.push(b":2}\n\n"), vec!["{\"b\":2}".to_owned()]);
        assert!(decoder.push(b"{\"c\":3}").is_empty());
        assert_eq!(decoder.finish(), Some("{\"c\":3}".to_owned()));
    }
}
