//! Newline-delimited JSON decoding for progressive responses.

use std::collections::VecDeque;

use futures::stream::{BoxStream, StreamExt};
use parley_core::exchange::StreamChunk;
use parley_core::{ParleyError, Result};

/// Splits a byte stream into lines and decodes each as a [`StreamChunk`].
///
/// Blank lines are skipped. A line may arrive split across several network
/// reads; the decoder buffers until the newline shows up.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns every chunk completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk>> {
        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(chunk) = decode_line(&line) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Decodes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<Result<StreamChunk>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Option<Result<StreamChunk>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).map_err(|e| ParleyError::Serialization {
        format: "NDJSON".to_string(),
        message: format!("{e} (line: {text})"),
    }))
}

struct DecodeState<S> {
    bytes: S,
    decoder: NdjsonDecoder,
    ready: VecDeque<Result<StreamChunk>>,
    exhausted: bool,
}

/// Adapts a stream of byte buffers into a stream of decoded chunks.
///
/// A transport error is yielded once and ends the stream.
pub fn decode_stream<S, B>(bytes: S) -> BoxStream<'static, Result<StreamChunk>>
where
    S: futures::Stream<Item = Result<B>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        bytes,
        decoder: NdjsonDecoder::new(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(buf)) => state.ready.extend(state.decoder.push(buf.as_ref())),
                Some(Err(e)) => {
                    state.ready.push_back(Err(e));
                    state.exhausted = true;
                }
                None => {
                    state.ready.extend(state.decoder.finish());
                    state.exhausted = true;
                }
            }
        }
    })
    .boxed()
}
