use anyhow::{Context, anyhow};
use serde::Deserialize;

// Buffered replies carry `message`, streamed chunks carry `delta`.
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Content>,
    delta: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    content: Option<String>,
}

fn first_choice(json: &[u8], what: &str) -> anyhow::Result<Option<Choice>> {
    let parsed: ChatCompletion =
        serde_json::from_slice(json).with_context(|| format!("decode {what}"))?;
    Ok(parsed.choices.into_iter().next())
}

pub fn parse_openai_chat_completion(body: &[u8]) -> anyhow::Result<String> {
    first_choice(body, "chat completion")?
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| anyhow!("no content in chat completion response"))
}

/// Extracts the text delta from one streamed `data:` payload.
///
/// Role-only and empty deltas yield `None`.
pub fn parse_openai_stream_chunk(payload: &str) -> anyhow::Result<Option<String>> {
    Ok(first_choice(payload.as_bytes(), "chat stream chunk")?
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|s| !s.is_empty()))
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Pulls the human-readable message out of an OpenAI-style error body.
pub fn parse_openai_error(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<OpenAiErrorResponse>(body)
        .ok()
        .map(|e| e.error.message)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Network chunks may split lines (and UTF-8 sequences) anywhere, so bytes are
/// buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);

        let mut events = vec![];
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(ev) = decode_line(&line) {
                events.push(ev);
            }
        }
        events
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buf);
        decode_line(&line)
    }
}

fn decode_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    if payload.is_empty() {
        return None;
    }
    Some(SseEvent::Data(payload.to_string()))
}
