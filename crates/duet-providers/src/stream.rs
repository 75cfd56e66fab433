//! Server-Sent Events parsing and stream aggregation for chat completions.
//!
//! The aggregator keeps one accumulator string; on every fragment it appends
//! and republishes the full accumulated text to the render target.

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::error::ProviderError;
use crate::traits::RenderTarget;

/// Incremental SSE line splitter.
///
/// Buffers raw bytes until a full line arrives, so UTF-8 sequences and
/// `data:` lines split across network chunks are reassembled.
#[derive(Debug, Default)]
pub struct SseLineParser {
    buffer: Vec<u8>,
}

impl SseLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the `data:` payloads of every completed line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = parse_data_line(&String::from_utf8_lossy(&line)) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        parse_data_line(&String::from_utf8_lossy(&rest))
    }
}

/// Extract the payload of a `data:` line. Comments, `event:` lines and
/// blank lines yield `None`.
pub fn parse_data_line(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}

/// One `chat.completion.chunk` event.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    message: String,
}

/// Text fragment carried by one SSE payload, if any.
fn fragment_of(payload: &str) -> Result<Option<String>, ProviderError> {
    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!(error = %e, data = payload, "skipping unparsable stream chunk");
            return Ok(None);
        }
    };
    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream(error.message));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|text| !text.is_empty()))
}

/// Drain a completion byte stream into a single string, republishing the
/// accumulated text to `target` after every fragment.
///
/// The target is cleared before the first chunk is read.
pub async fn aggregate_stream<S, B, E>(
    mut stream: S,
    target: &dyn RenderTarget,
) -> Result<String, ProviderError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ProviderError>,
{
    target.clear();

    let mut parser = SseLineParser::new();
    let mut accumulated = String::new();
    let mut chunks = 0usize;

    while let Some(next) = stream.next().await {
        let bytes = next.map_err(Into::into)?;
        for payload in parser.push(bytes.as_ref()) {
            if append_payload(&payload, &mut accumulated, target)? {
                return Ok(accumulated);
            }
            chunks += 1;
        }
    }
    if let Some(payload) = parser.finish() {
        append_payload(&payload, &mut accumulated, target)?;
    }

    debug!(chunks, chars = accumulated.len(), "stream complete");
    Ok(accumulated)
}

/// Returns `true` on the `[DONE]` sentinel.
fn append_payload(
    payload: &str,
    accumulated: &mut String,
    target: &dyn RenderTarget,
) -> Result<bool, ProviderError> {
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(true);
    }
    if payload.is_empty() {
        return Ok(false);
    }
    trace!(data = payload, "stream chunk");
    if let Some(fragment) = fragment_of(payload)? {
        accumulated.push_str(&fragment);
        target.render(accumulated);
    }
    Ok(false)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
