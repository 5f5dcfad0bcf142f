//! Server-Sent Events line parser shared by the provider adapters.
//!
//! Both vendors stream responses over HTTP SSE. This module buffers raw
//! bytes, splits complete lines out of the buffer, extracts `data: `
//! payloads, and filters comments and `[DONE]` markers. Provider-specific
//! JSON decoding happens downstream.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Options for the SSE line parser.
#[derive(Clone, Debug)]
pub struct SseParserOptions {
    /// Whether to process remaining buffer content after the stream ends.
    /// Some backends end the stream without a trailing newline.
    pub process_remaining_buffer: bool,
}

impl Default for SseParserOptions {
    fn default() -> Self {
        Self {
            process_remaining_buffer: true,
        }
    }
}

/// Parse SSE lines from a byte stream and yield raw JSON data strings.
///
/// Buffers incoming chunks, splits on newlines, extracts each `data: `
/// payload, and skips `[DONE]` markers, comments, and empty data. A read
/// error ends the stream with a warning; decoding of earlier payloads is
/// unaffected.
pub fn parse_sse_lines<S>(
    byte_stream: S,
    options: &SseParserOptions,
) -> impl Stream<Item = String> + Send + '_
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let process_remaining = options.process_remaining_buffer;

    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let line = match std::str::from_utf8(&line_bytes) {
                        Ok(s) => s,
                        Err(_) => continue, // skip invalid UTF-8 lines
                    };

                    if let Some(data) = extract_sse_data(line) {
                        return Some((data, (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => {
                        warn!("SSE stream read error: {e}");
                        return None;
                    }
                    None => {
                        if process_remaining && !buffer.is_empty() {
                            let line = match std::str::from_utf8(&buffer) {
                                Ok(s) => s.trim(),
                                Err(_) => return None,
                            };
                            if let Some(data) = extract_sse_data(line) {
                                buffer.clear();
                                return Some((data, (stream, buffer, true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract the data payload from one SSE line.
///
/// Returns `Some(data)` for data lines, `None` for comments, empty lines,
/// non-data fields, and `[DONE]` markers.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?;
    let data = data.trim();

    if data == "[DONE]" || data.is_empty() {
        return None;
    }

    Some(data.to_string())
}

/// Decode JSON from an SSE data payload.
///
/// Malformed payloads return `None` with a warning; callers keep decoding
/// subsequent events.
pub fn parse_sse_data<T: serde::de::DeserializeOwned>(data: &str, provider: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                provider = provider,
                error = %e,
                data_preview = preview(data),
                "Failed to parse SSE data"
            );
            None
        }
    }
}

fn preview(data: &str) -> &str {
    let mut end = data.len().min(100);
    while !data.is_char_boundary(end) {
        end -= 1;
    }
    &data[..end]
}
