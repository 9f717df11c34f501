//! Decoding of Ollama's newline-delimited JSON chat stream.

use std::collections::VecDeque;
use std::fmt::Display;

use anyhow::{Context, Result, anyhow};
use futures_util::{Stream, StreamExt, stream};
use serde::Deserialize;

use crate::model::ChatFragment;

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Splits raw body bytes into complete lines. Bytes are held until a newline
/// arrives so multi-byte characters split across reads decode intact.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        lines
    }

    /// Returns a trailing line that was not newline-terminated.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

pub(crate) fn parse_chunk_line(line: &str) -> Result<ChatFragment> {
    let chunk: ChatChunk = serde_json::from_str(line)
        .with_context(|| format!("Failed to decode chat stream line: {line}"))?;

    if let Some(error) = chunk.error {
        return Err(anyhow!("Ollama reported an error mid-stream: {error}"));
    }

    Ok(ChatFragment {
        content: chunk.message.map(|message| message.content).unwrap_or_default(),
        done: chunk.done,
    })
}

struct DecodeState<S> {
    bytes: S,
    lines: LineBuffer,
    ready: VecDeque<Result<ChatFragment>>,
    exhausted: bool,
}

/// Turns a body byte stream into chat fragments, in arrival order. A transport
/// error is yielded once as the final item.
pub(crate) fn decode_fragments<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatFragment>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = DecodeState {
        bytes,
        lines: LineBuffer::default(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for line in state.lines.push(chunk.as_ref()) {
                        state.ready.push_back(parse_chunk_line(&line));
                    }
                }
                Some(Err(err)) => {
                    state.exhausted = true;
                    state
                        .ready
                        .push_back(Err(anyhow!("Chat stream was interrupted: {err}")));
                }
                None => {
                    state.exhausted = true;
                    if let Some(line) = state.lines.finish() {
                        state.ready.push_back(parse_chunk_line(&line));
                    }
                }
            }
        }
    })
}
