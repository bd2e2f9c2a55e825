use crate::constants::LINE_DELIMITER;
use crate::err::{ProtocolError, Result};
use bytes::{Bytes, BytesMut};

/// Growable byte buffer that hands out newline-terminated header lines.
///
/// The total number of header bytes (consumed lines plus any unterminated
/// tail) is bounded by `limit`. Bytes behind the last consumed line stay in
/// the buffer untouched; they are the start of the body when the header ends.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    limit: usize,
    consumed: usize,
}

impl LineBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            limit,
            consumed: 0,
        }
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete line without its delimiter (a trailing `\r` is
    /// dropped too). `Ok(None)` means more bytes are needed.
    pub fn next_line(&mut self) -> Result<Option<Bytes>> {
        match self.buf.iter().position(|b| *b == LINE_DELIMITER) {
            Some(pos) => {
                if self.consumed + pos + 1 > self.limit {
                    return Err(ProtocolError::TooLarge { limit: self.limit });
                }
                let mut line = self.buf.split_to(pos + 1);
                self.consumed += pos + 1;
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                Ok(Some(line.freeze()))
            }
            None if self.consumed + self.buf.len() > self.limit => {
                Err(ProtocolError::TooLarge { limit: self.limit })
            }
            None => Ok(None),
        }
    }

    /// Bytes buffered after the last consumed line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Header bytes consumed so far, delimiters included.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn take_remaining(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}
