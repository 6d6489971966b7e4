//! Channel stream framing
//!
//! Each event on a subscription stream is sent as a header block followed
//! by a JSON body, in the style of multipart HTTP updates:
//!
//! ```text
//! Event: new.message\r\n
//! Channel: admin.chat\r\n
//! Content-Length: 27\r\n
//! \r\n
//! {"message":{"id":"m1",...}}\r\n
//! ```
//!
//! A bare `\r\n` between frames is a heartbeat and carries no event.

use crate::error::CodecError;
use bytes::{Buf, Bytes, BytesMut};

pub const HEARTBEAT: &[u8] = b"\r\n";
pub const FRAME_CONTENT_TYPE: &str = "application/vnd.chat-frames";
const MAX_HEADER_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub channel: String,
    pub data: Bytes,
}

impl Frame {
    pub fn new(event: impl Into<String>, channel: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            event: event.into(),
            channel: channel.into(),
            data: data.into(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut out = String::new();
        out.push_str(&format!("Event: {}\r\n", self.event));
        out.push_str(&format!("Channel: {}\r\n", self.channel));
        out.push_str(&format!("Content-Length: {}\r\n", self.data.len()));
        out.push_str("\r\n");

        let mut buf = BytesMut::with_capacity(out.len() + self.data.len() + 2);
        buf.extend_from_slice(out.as_bytes());
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(HEARTBEAT);
        buf.freeze()
    }
}

/// Incremental frame decoder, tolerant of arbitrary chunk boundaries.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    pending: Option<PendingFrame>,
}

#[derive(Debug)]
struct PendingFrame {
    event: String,
    channel: String,
    length: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, CodecError> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            if self.pending.is_none() {
                self.skip_heartbeats();
                match self.take_headers()? {
                    Some(pending) => self.pending = Some(pending),
                    None => break,
                }
            }

            let Some(length) = self.pending.as_ref().map(|p| p.length) else {
                break;
            };
            if self.buffer.len() < length {
                break;
            }
            let data = self.buffer.split_to(length).freeze();
            if let Some(p) = self.pending.take() {
                frames.push(Frame {
                    event: p.event,
                    channel: p.channel,
                    data,
                });
            }
        }

        Ok(frames)
    }

    fn skip_heartbeats(&mut self) {
        let blank = self
            .buffer
            .iter()
            .take_while(|b| **b == b'\r' || **b == b'\n')
            .count();
        self.buffer.advance(blank);
    }

    fn take_headers(&mut self) -> Result<Option<PendingFrame>, CodecError> {
        let Some(end) = find_header_end(&self.buffer) else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                return Err(CodecError::HeaderTooLarge(MAX_HEADER_BYTES));
            }
            return Ok(None);
        };

        let block = self.buffer.split_to(end + 4);
        let text = std::str::from_utf8(&block[..end]).map_err(|_| CodecError::InvalidUtf8)?;

        let mut event = None;
        let mut channel = String::new();
        let mut length = None;
        for line in text.split("\r\n") {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| CodecError::MalformedHeader(line.to_string()))?;
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "event" => event = Some(value.to_string()),
                "channel" => channel = value.to_string(),
                "content-length" => {
                    length = Some(
                        value
                            .parse::<usize>()
                            .map_err(|_| CodecError::InvalidContentLength(value.to_string()))?,
                    )
                }
                _ => {}
            }
        }

        Ok(Some(PendingFrame {
            event: event.ok_or(CodecError::MissingHeader("Event"))?,
            channel,
            length: length.ok_or(CodecError::MissingHeader("Content-Length"))?,
        }))
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
