//! Line framing — bounded reassembly of newline-delimited frames.
//!
//! DESIGN
//! ======
//! Each connection owns one `FrameBuffer`. Chunks arrive in arbitrary
//! sizes from the transport; the buffer accumulates bytes until a `\n`
//! and emits the completed frame as a ready-to-publish bus line, the
//! connection's `"message <tag> "` prefix already applied. The prefix
//! counts against the 1024-byte bound, so a frame can never grow the
//! published line past `BUFFER_CAPACITY`.
//!
//! A frame longer than the remaining capacity is silently truncated: the
//! overflowing bytes are dropped and the frame still emits at the next
//! delimiter. `\r` is trailing noise, not a delimiter — the frame is cut
//! at the first `\r` so CRLF and bare-LF input produce the same line.
//!
//! This module is a pure state machine: no I/O, no async.

use crate::protocol;

/// Upper bound on an emitted line, reserved prefix included.
pub const BUFFER_CAPACITY: usize = 1024;

/// Per-connection accumulator for newline-delimited frames.
#[derive(Debug)]
pub struct FrameBuffer {
    /// `"message <tag> "` — constant for the connection's lifetime.
    prefix: String,
    /// Payload bytes since the last emitted frame. Never holds a `\n`.
    accumulated: Vec<u8>,
    /// `BUFFER_CAPACITY` minus the prefix length.
    limit: usize,
}

impl FrameBuffer {
    #[must_use]
    pub fn new(tag: &str) -> Self {
        let prefix = protocol::message_prefix(tag);
        let limit = BUFFER_CAPACITY.saturating_sub(prefix.len());
        Self { prefix, accumulated: Vec::new(), limit }
    }

    /// Feed one chunk of inbound bytes. Returns the bus lines completed by
    /// this chunk, in receipt order — a single chunk may carry several
    /// frames, or none.
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        while !chunk.is_empty() {
            let delimiter = chunk.iter().position(|&byte| byte == b'\n');
            let wanted = delimiter.unwrap_or(chunk.len());
            let free = self.limit - self.accumulated.len();
            self.accumulated.extend_from_slice(&chunk[..wanted.min(free)]);

            let Some(delimiter) = delimiter else {
                // Unterminated frame: hold what fits, drop the overflow,
                // wait for a later chunk.
                return lines;
            };

            lines.push(self.emit());
            chunk = &chunk[delimiter + 1..];
        }
        lines
    }

    /// Bytes held for the next frame. Bounded by `capacity - prefix_len`.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.accumulated
    }

    fn emit(&mut self) -> String {
        if let Some(cr) = self.accumulated.iter().position(|&byte| byte == b'\r') {
            self.accumulated.truncate(cr);
        }
        let line = format!("{}{}", self.prefix, String::from_utf8_lossy(&self.accumulated));
        self.accumulated.clear();
        line
    }
}

#[cfg(test)]
#[path = "framing_test.rs"]
mod tests;
