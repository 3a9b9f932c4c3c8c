//! Line framing over a chunked byte stream.

use std::fmt::Display;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::error::StreamError;

/// Pulls `\n`-terminated lines out of a byte stream.
///
/// Chunks may split a line anywhere, including inside a multi-byte UTF-8
/// sequence or between `\r` and `\n`; the reader buffers until a terminator
/// arrives. Returned lines have the terminator and one trailing `\r` removed.
///
/// When the source closes cleanly with an unterminated fragment pending, the
/// fragment is returned as a final line rather than dropped.
pub struct FrameReader<S> {
    source: Pin<Box<S>>,
    buffer: BytesMut,
    /// Prefix of `buffer` already known to hold no terminator.
    scanned: usize,
    finished: bool,
}

impl<S, E> FrameReader<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    /// Wrap a byte stream.
    pub fn new(source: S) -> Self {
        Self {
            source: Box::pin(source),
            buffer: BytesMut::new(),
            scanned: 0,
            finished: false,
        }
    }

    /// Read the next line.
    ///
    /// Returns `Ok(None)` once the source is exhausted. A transport failure
    /// is returned as [`StreamError::Read`]; the reader is fused afterwards and
    /// any partially buffered line is discarded.
    pub async fn next_line(&mut self) -> Result<Option<Bytes>, StreamError> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if self.finished {
                return Ok(None);
            }

            match self.source.next().await {
                Some(Ok(chunk)) => {
                    tracing::trace!(len = chunk.len(), "read chunk");
                    self.buffer.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    self.finished = true;
                    self.buffer.clear();
                    self.scanned = 0;
                    return Err(StreamError::Read(e.to_string()));
                }
                None => {
                    self.finished = true;
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    tracing::debug!(
                        len = self.buffer.len(),
                        "stream closed with unterminated line"
                    );
                    self.scanned = 0;
                    let rest = self.buffer.split();
                    return Ok(Some(strip_cr(rest)));
                }
            }
        }
    }

    /// Whether the source has ended or failed.
    pub fn is_finished(&self) -> bool {
        self.finished && self.buffer.is_empty()
    }

    fn take_line(&mut self) -> Option<Bytes> {
        match self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                let mut line = self.buffer.split_to(end + 1);
                line.truncate(end);
                self.scanned = 0;
                Some(strip_cr(line))
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }
}

fn strip_cr(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}
