//! Decoding of the streaming query body into text chunks.
//!
//! The backend answers `/query/stream` with newline-delimited JSON: one
//! `{"response": "..."}` object per fragment, or `{"error": "..."}` when
//! generation fails after the stream has opened.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tracing::debug;

use lightrag_core::{ChunkStream, GatewayError, Result};

/// Turn a raw byte stream into an ordered stream of text chunks.
///
/// The returned stream ends after the first error.
pub fn decode_chunks<S, B>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        lines: LineBuffer::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.pending.pop_front() {
                match parse_line(&line) {
                    Ok(Some(chunk)) => return Some((Ok(chunk), state)),
                    Ok(None) => continue,
                    Err(e) => {
                        state.pending.clear();
                        state.done = true;
                        return Some((Err(e), state));
                    }
                }
            }

            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => state.pending.extend(state.lines.push(bytes.as_ref())),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.lines.finish());
                }
            }
        }
    })
    .boxed()
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    lines: LineBuffer,
    pending: VecDeque<String>,
    done: bool,
}

/// Splits bytes into lines; partial lines (and split UTF-8) wait for more input.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=idx).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Extract the text fragment carried by one line, if any.
fn parse_line(line: &str) -> Result<Option<String>> {
    let raw = line.trim_end_matches(['\r', '\n']);
    let trimmed = raw.trim();
    let payload = trimmed
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(trimmed);

    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(object)) => {
            if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
                let message = error
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(GatewayError::stream(format!("backend reported: {}", message)));
            }
            match object.get("response") {
                Some(Value::String(text)) => Ok(Some(text.clone())),
                _ => {
                    debug!("skipping stream line without response text");
                    Ok(None)
                }
            }
        }
        Ok(Value::String(text)) => Ok(Some(text)),
        _ => Ok(Some(raw.to_string())),
    }
}
