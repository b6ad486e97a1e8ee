//! Incremental line decoder
//!
//! TCP delivers the relay's output in arbitrary chunks. [`LineCodec`] keeps
//! the bytes after the last separator as carry-over and only yields frames
//! once their terminating `\n` has arrived, so the decoded sequence does not
//! depend on where reads happen to split the stream.
//!
//! Lines longer than `max_line_length` are dropped whether they arrive whole
//! or split. The carry-over is bounded the same way: a peer that never sends a
//! separator causes the partial line to be dropped and everything up to the
//! next `\n` to be skipped, after which decoding resumes.

use bytes::{Buf, BytesMut};

use super::frame::{decode_line, Frame};

/// Default upper bound on a single buffered line (64KB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Stateful decoder that turns a byte stream into [`Frame`]s
#[derive(Debug)]
pub struct LineCodec {
    /// Carry-over bytes not yet terminated by `\n`
    buffer: BytesMut,
    /// Maximum length of one line before it is discarded
    max_line_length: usize,
    /// Skipping the remainder of an oversized line
    discarding: bool,
    /// Lines dropped because they did not parse
    unrecognized: u64,
}

impl LineCodec {
    /// Create a codec with the default line length limit
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom line length limit
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_line_length: max_line_length.max(1),
            discarding: false,
            unrecognized: 0,
        }
    }

    /// Feed a chunk and return every frame it completes, in stream order.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);

            if self.discarding {
                self.discarding = false;
                continue;
            }

            if line.len() > self.max_line_length {
                tracing::warn!(
                    len = line.len(),
                    max = self.max_line_length,
                    "Line exceeds maximum length, discarding"
                );
                continue;
            }

            match decode_line(&line) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(e) => {
                    self.unrecognized += 1;
                    tracing::debug!(error = %e, "Discarding line");
                }
            }
        }

        if self.buffer.len() > self.max_line_length {
            tracing::warn!(
                buffered = self.buffer.len(),
                max = self.max_line_length,
                "Line exceeds maximum length, discarding until next separator"
            );
            self.buffer.clear();
            self.discarding = true;
        }

        frames
    }

    /// Drop all carry-over state
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Number of carry-over bytes currently held
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of lines discarded as unrecognized
    pub fn unrecognized_count(&self) -> u64 {
        self.unrecognized
    }

}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}
