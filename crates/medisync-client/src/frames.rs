//! Line-oriented decoder for `text/event-stream` bodies.
//!
//! Chunks may split lines (and multi-byte characters) anywhere. The decoder
//! keeps raw bytes until a full line is available, so only complete lines are
//! ever converted to text.

use crate::types::StreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq)]
/// Enumerates decoded `Frame` values.
pub enum Frame {
    Event(StreamEvent),
    Done,
    Invalid(String),
}

#[derive(Debug, Default)]
/// Incremental frame decoder holding the trailing partial line.
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(frame) = parse_frame_line(&String::from_utf8_lossy(&line[..pos])) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes the unterminated trailing line at end of body.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        parse_frame_line(&String::from_utf8_lossy(&line))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Classifies one complete line. Blank lines yield `None`.
pub fn parse_frame_line(line: &str) -> Option<Frame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line == DONE_MARKER {
        return Some(Frame::Done);
    }
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return Some(Frame::Invalid(format!(
            "line without '{DATA_PREFIX}' prefix"
        )));
    };
    let data = data.trim();
    if data == DONE_MARKER {
        return Some(Frame::Done);
    }
    match StreamEvent::from_json(data) {
        Ok(event) => Some(Frame::Event(event)),
        Err(error) => Some(Frame::Invalid(error.to_string())),
    }
}
