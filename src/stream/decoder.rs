//! Incremental decoder for the line-framed chat streaming response.
//!
//! The backend streams a chunked text body where each line is either a
//! token frame (`data: <fragment>`) or a completion marker
//! (`event: done`). Chunk boundaries are arbitrary: a chunk can end in
//! the middle of a line or even in the middle of a multi-byte UTF-8
//! sequence, so bytes go through a streaming UTF-8 decoder that carries
//! partial sequences across chunks before line splitting happens.
//! Unrecognized lines are dropped, never treated as an error.

use super::events::StreamEvent;

/// Literal prefix of a token frame. The single trailing space is part
/// of the framing; everything after it belongs to the fragment.
const TOKEN_PREFIX: &str = "data: ";

/// Literal prefix of the completion marker.
const DONE_PREFIX: &str = "event: done";

/// Streaming UTF-8 decoder.
///
/// Feeds arbitrary byte chunks and yields the decodable prefix, holding
/// back an incomplete trailing multi-byte sequence until the next chunk
/// completes it. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a new decoder with no pending bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let bytes = std::mem::take(&mut self.pending);
        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        // Invalid sequence: substitute and skip past it.
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete trailing sequence: keep for the next chunk.
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream. A sequence still incomplete at EOF can
    /// never be finished, so it decodes to a single U+FFFD.
    pub fn finish(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(char::REPLACEMENT_CHARACTER)
    }
}

/// Incremental frame decoder: streaming UTF-8 plus line framing.
///
/// Each `send()` owns a fresh decoder, so frame boundaries never span
/// two exchanges. Push raw body chunks with [`push`](Self::push) and
/// flush the trailing unterminated line with [`finish`](Self::finish)
/// once the reader reports end-of-stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8StreamDecoder,
    line_buffer: String,
}

impl FrameDecoder {
    /// Create a decoder with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of raw body bytes, returning every frame completed
    /// by it, in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let text = self.utf8.decode(chunk);
        let mut events = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                let line = std::mem::take(&mut self.line_buffer);
                let line = line.strip_suffix('\r').unwrap_or(&line);
                if let Some(event) = classify_line(line) {
                    events.push(event);
                }
            } else {
                self.line_buffer.push(ch);
            }
        }

        events
    }

    /// Flush at end of stream: classify a trailing line that arrived
    /// without a terminator.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if let Some(dangling) = self.utf8.finish() {
            self.line_buffer.push(dangling);
        }
        if self.line_buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.line_buffer);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        classify_line(line)
    }
}

/// Classify one complete line. Unrecognized lines yield `None` and are
/// dropped by the caller (forward compatibility).
fn classify_line(line: &str) -> Option<StreamEvent> {
    if let Some(fragment) = line.strip_prefix(TOKEN_PREFIX) {
        return Some(StreamEvent::Token {
            text: fragment.to_owned(),
        });
    }
    if line.starts_with(DONE_PREFIX) {
        return Some(StreamEvent::Done);
    }
    None
}
