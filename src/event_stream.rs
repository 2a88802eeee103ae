//! Decoding of the binary event-stream framing used by streaming responses.
//!
//! Each frame is laid out as
//!
//! ```text
//! [total length: u32][headers length: u32][prelude crc: u32]
//! [headers ...][payload ...][message crc: u32]
//! ```
//!
//! with all integers big-endian.  Headers are `[name length: u8][name]
//! [value type: u8][value]`.  The `:message-type` header says whether the
//! frame carries an event, an exception, or an error.  CRCs are read but not
//! verified; the transport is already integrity-protected by TLS.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use tokio_util::codec::Decoder;

use crate::error::{Error, Result};
use crate::types::ConverseStreamEvent;

/// Length of the prelude: total length, headers length, prelude CRC.
const PRELUDE_LEN: usize = 12;

/// Smallest possible frame: a prelude and a message CRC.
pub const MIN_FRAME_LEN: usize = 16;

/// Largest frame accepted.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// A typed header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Type 0 and 1.
    Bool(bool),
    /// Type 2.
    Byte(i8),
    /// Type 3.
    Short(i16),
    /// Type 4.
    Int(i32),
    /// Type 5.
    Long(i64),
    /// Type 6.
    ByteArray(Bytes),
    /// Type 7.
    String(String),
    /// Type 8, milliseconds since the epoch.
    Timestamp(i64),
    /// Type 9.
    Uuid([u8; 16]),
}

impl HeaderValue {
    /// The value as a string, when it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Headers in wire order.
    pub headers: Vec<(String, HeaderValue)>,
    /// The raw payload.
    pub payload: Bytes,
}

impl Frame {
    /// Look up a string header.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_str())
    }
}

/// A [`Decoder`] that splits a byte buffer into frames.
#[derive(Debug, Default)]
pub struct FrameDecoder;

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < PRELUDE_LEN {
            return Ok(None);
        }
        let total_len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        let headers_len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if total_len < MIN_FRAME_LEN {
            return Err(Error::encoding(
                format!("event-stream frame too short: {total_len} bytes"),
                None,
            ));
        }
        if total_len > MAX_FRAME_LEN {
            return Err(Error::encoding(
                format!("event-stream frame too long: {total_len} bytes"),
                None,
            ));
        }
        if headers_len > total_len - MIN_FRAME_LEN {
            return Err(Error::encoding(
                format!("event-stream headers ({headers_len} bytes) overrun the frame"),
                None,
            ));
        }
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total_len).freeze();
        frame.advance(8);
        let _prelude_crc = frame.get_u32();
        let headers = decode_headers(frame.split_to(headers_len))?;
        let payload = frame.split_to(total_len - MIN_FRAME_LEN - headers_len);
        let _message_crc = frame.get_u32();
        Ok(Some(Frame { headers, payload }))
    }
}

fn take(buf: &mut Bytes, len: usize, what: &str) -> Result<Bytes> {
    if buf.remaining() < len {
        return Err(Error::encoding(
            format!("truncated event-stream header: {what}"),
            None,
        ));
    }
    Ok(buf.split_to(len))
}

fn decode_headers(mut buf: Bytes) -> Result<Vec<(String, HeaderValue)>> {
    let mut headers = Vec::new();
    while buf.has_remaining() {
        let name_len = take(&mut buf, 1, "name length")?[0] as usize;
        let name = take(&mut buf, name_len, "name")?;
        let name = std::str::from_utf8(&name)?.to_string();
        let value_type = take(&mut buf, 1, "value type")?[0];
        let value = match value_type {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Byte(take(&mut buf, 1, "byte")?.get_i8()),
            3 => HeaderValue::Short(take(&mut buf, 2, "short")?.get_i16()),
            4 => HeaderValue::Int(take(&mut buf, 4, "int")?.get_i32()),
            5 => HeaderValue::Long(take(&mut buf, 8, "long")?.get_i64()),
            6 | 7 => {
                let len = take(&mut buf, 2, "value length")?.get_u16() as usize;
                let value = take(&mut buf, len, "value")?;
                if value_type == 6 {
                    HeaderValue::ByteArray(value)
                } else {
                    HeaderValue::String(std::str::from_utf8(&value)?.to_string())
                }
            }
            8 => HeaderValue::Timestamp(take(&mut buf, 8, "timestamp")?.get_i64()),
            9 => {
                let mut uuid = [0u8; 16];
                take(&mut buf, 16, "uuid")?.copy_to_slice(&mut uuid);
                HeaderValue::Uuid(uuid)
            }
            other => {
                return Err(Error::encoding(
                    format!("unknown event-stream header type {other} for {name}"),
                    None,
                ));
            }
        };
        headers.push((name, value));
    }
    Ok(headers)
}

/// Interpret a frame as a stream event or a provider fault.
pub fn frame_to_event(frame: Frame) -> Result<ConverseStreamEvent> {
    match frame.header_str(":message-type") {
        Some("event") => {
            let event_type = frame.header_str(":event-type").ok_or_else(|| {
                Error::encoding("event frame without an :event-type header", None)
            })?;
            ConverseStreamEvent::from_parts(event_type, &frame.payload).map_err(|err| {
                Error::serialization(
                    format!("could not parse {event_type} event: {err}"),
                    Some(Box::new(err)),
                )
            })
        }
        Some("exception") => {
            let code = frame
                .header_str(":exception-type")
                .unwrap_or("UnknownException")
                .to_string();
            Err(Error::provider(
                code,
                payload_message(&frame.payload),
                None,
                None,
            ))
        }
        Some("error") => {
            let code = frame
                .header_str(":error-code")
                .unwrap_or("UnknownError")
                .to_string();
            let message = frame
                .header_str(":error-message")
                .map(str::to_string)
                .unwrap_or_else(|| payload_message(&frame.payload));
            Err(Error::provider(code, message, None, None))
        }
        Some(other) => Err(Error::encoding(
            format!("unknown event-stream message type: {other}"),
            None,
        )),
        None => Err(Error::encoding(
            "event-stream frame without a :message-type header",
            None,
        )),
    }
}

/// Pull a human-readable message out of an exception payload.
fn payload_message(payload: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(payload) {
        for key in ["message", "Message"] {
            if let Some(message) = value.get(key).and_then(|m| m.as_str()) {
                return message.to_string();
            }
        }
    }
    String::from_utf8_lossy(payload).into_owned()
}

/// Process a stream of bytes into a stream of Converse Stream events.
///
/// Frames may be split across chunks or packed several to a chunk.  The
/// stream ends after the first error, whether it is a transport failure, a
/// malformed frame, or a provider exception.
pub fn process_event_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<ConverseStreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    stream::unfold(
        (stream, BytesMut::new(), FrameDecoder, false),
        move |(mut stream, mut buffer, mut decoder, done)| async move {
            if done {
                return None;
            }
            loop {
                match decoder.decode(&mut buffer) {
                    Ok(Some(frame)) => {
                        let event = frame_to_event(frame);
                        let done = event.is_err();
                        return Some((event, (stream, buffer, decoder, done)));
                    }
                    Ok(None) => {}
                    Err(e) => return Some((Err(e), (stream, buffer, decoder, true))),
                }

                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (stream, buffer, decoder, true))),
                    None => {
                        if buffer.is_empty() {
                            return None;
                        }
                        let err = Error::streaming(
                            format!("stream ended mid-frame with {} bytes left", buffer.len()),
                            None,
                        );
                        return Some((Err(err), (stream, buffer, decoder, true)));
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StopReason, TokenUsage};
    use bytes::BufMut;

    /// Encode a frame with string headers; CRCs are left zero.
    fn encode_frame(headers: &[(&str, &str)], payload: &[u8]) -> Bytes {
        let mut header_buf = BytesMut::new();
        for (name, value) in headers {
            header_buf.put_u8(name.len() as u8);
            header_buf.put_slice(name.as_bytes());
            header_buf.put_u8(7);
            header_buf.put_u16(value.len() as u16);
            header_buf.put_slice(value.as_bytes());
        }
        let total = MIN_FRAME_LEN + header_buf.len() + payload.len();
        let mut buf = BytesMut::with_capacity(total);
        buf.put_u32(total as u32);
        buf.put_u32(header_buf.len() as u32);
        buf.put_u32(0);
        buf.put_slice(&header_buf);
        buf.put_slice(payload);
        buf.put_u32(0);
        buf.freeze()
    }

    fn event(event_type: &str, payload: &str) -> Bytes {
        encode_frame(
            &[
                (":message-type", "event"),
                (":event-type", event_type),
                (":content-type", "application/json"),
            ],
            payload.as_bytes(),
        )
    }

    fn chunks(chunks: Vec<Bytes>) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Unpin + Send {
        stream::iter(chunks.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn decode_single_event() {
        let frame = event("contentBlockDelta", r#"{"contentBlockIndex":0,"delta":{"text":"Hi"}}"#);
        let mut events = Box::pin(process_event_stream(chunks(vec![frame])));

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first, ConverseStreamEvent::text_delta(0, "Hi"));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn decode_concatenated_frames() {
        let mut packed = BytesMut::new();
        packed.extend_from_slice(&event("messageStart", r#"{"role":"assistant"}"#));
        packed.extend_from_slice(&event("messageStop", r#"{"stopReason":"end_turn"}"#));
        packed.extend_from_slice(&event(
            "metadata",
            r#"{"usage":{"inputTokens":5,"outputTokens":2,"totalTokens":7},"metrics":{"latencyMs":9}}"#,
        ));

        let events: Vec<_> = process_event_stream(chunks(vec![packed.freeze()]))
            .collect()
            .await;
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            Ok(ConverseStreamEvent::MessageStart(_))
        ));
        assert_eq!(
            events[1].as_ref().unwrap(),
            &ConverseStreamEvent::message_stop(StopReason::EndTurn)
        );
        match events[2].as_ref().unwrap() {
            ConverseStreamEvent::Metadata(metadata) => {
                assert_eq!(metadata.usage, Some(TokenUsage::new(5, 2)));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn decode_split_frames() {
        let frame = event("contentBlockDelta", r#"{"contentBlockIndex":0,"delta":{"text":"Hello"}}"#);
        // Split inside the prelude, inside the headers, and inside the payload.
        let parts = vec![
            frame.slice(0..5),
            frame.slice(5..30),
            frame.slice(30..frame.len() - 3),
            frame.slice(frame.len() - 3..),
        ];
        let events: Vec<_> = process_event_stream(chunks(parts)).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &ConverseStreamEvent::text_delta(0, "Hello")
        );
    }

    #[tokio::test]
    async fn exception_frame_is_provider_error() {
        let exception = encode_frame(
            &[
                (":message-type", "exception"),
                (":exception-type", "throttlingException"),
                (":content-type", "application/json"),
            ],
            br#"{"message":"Too many requests, please wait before trying again."}"#,
        );
        let frames = vec![
            event("contentBlockDelta", r#"{"contentBlockIndex":0,"delta":{"text":"Hel"}}"#),
            exception,
            event("contentBlockDelta", r#"{"contentBlockIndex":0,"delta":{"text":"lo"}}"#),
        ];
        let events: Vec<_> = process_event_stream(chunks(frames)).collect().await;

        // The stream stops at the exception.
        assert_eq!(events.len(), 2);
        let err = events[1].as_ref().unwrap_err();
        assert!(err.is_provider());
        assert_eq!(err.error_code(), Some("throttlingException"));
        assert_eq!(
            err.message(),
            "Too many requests, please wait before trying again."
        );
    }

    #[tokio::test]
    async fn truncated_stream_is_an_error() {
        let frame = event("messageStart", r#"{"role":"assistant"}"#);
        let events: Vec<_> = process_event_stream(chunks(vec![frame.slice(0..20)]))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        let err = events[0].as_ref().unwrap_err();
        assert!(!err.is_provider());
        assert!(err.to_string().contains("mid-frame"));
    }

    #[test]
    fn decoder_rejects_short_frames() {
        let mut buf = BytesMut::new();
        buf.put_u32(8);
        buf.put_u32(0);
        buf.put_u32(0);
        assert!(FrameDecoder.decode(&mut buf).is_err());
    }

    #[test]
    fn decoder_reads_typed_headers() {
        let mut headers = BytesMut::new();
        headers.put_u8(4);
        headers.put_slice(b"flag");
        headers.put_u8(0);
        headers.put_u8(5);
        headers.put_slice(b"count");
        headers.put_u8(4);
        headers.put_i32(-3);
        let total = MIN_FRAME_LEN + headers.len();
        let mut buf = BytesMut::new();
        buf.put_u32(total as u32);
        buf.put_u32(headers.len() as u32);
        buf.put_u32(0);
        buf.put_slice(&headers);
        buf.put_u32(0);

        let frame = FrameDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.headers[0], ("flag".to_string(), HeaderValue::Bool(true)));
        assert_eq!(frame.headers[1], ("count".to_string(), HeaderValue::Int(-3)));
        assert!(frame.payload.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_without_message_type_is_an_error() {
        let frame = Frame {
            headers: vec![],
            payload: Bytes::new(),
        };
        assert!(frame_to_event(frame).is_err());
    }
}
