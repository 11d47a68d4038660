//! Buffered, forward-only, endian-aware byte reader.

use crate::error::{Error, Result};

/// A forward-only cursor over an in-memory byte slice.
///
/// This never reads past the slice it was constructed with; every method
/// that needs `n` more bytes than remain returns [`Error::UnexpectedEnd`]
/// instead of panicking.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Wraps `data` for reading from the start.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position, in bytes from the start.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads exactly `n` bytes and returns a view into the source slice.
    ///
    /// ## Errors
    ///
    /// If fewer than `n` bytes remain.
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::unexpected_end(format!(
                "{n} bytes at offset {}",
                self.pos
            )));
        }

        let view = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(view)
    }

    /// Skips `n` bytes without returning them.
    ///
    /// ## Errors
    ///
    /// If fewer than `n` bytes remain.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_exact(n).map(|_| ())
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16le(&mut self) -> Result<u16> {
        let b = self.read_exact(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32le(&mut self) -> Result<u32> {
        let b = self.read_exact(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32be(&mut self) -> Result<u32> {
        let b = self.read_exact(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Borrows every byte left to read, without advancing.
    #[must_use]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Copies every byte left to read and advances to the end.
    pub fn remaining_to_vec(&mut self) -> Vec<u8> {
        let rest = self.remaining_bytes().to_vec();
        self.pos = self.data.len();
        rest
    }

    /// Returns a bounded sub-reader over the next `n` bytes and advances past
    /// them, regardless of how much of the sub-reader the caller consumes.
    ///
    /// This is what lets a chunk handler (e.g. an XCursor `image` callback)
    /// read a fixed-size payload without being able to overrun into the next
    /// chunk — the caller gets its own `ByteReader` scoped to exactly that
    /// range.
    ///
    /// ## Errors
    ///
    /// If fewer than `n` bytes remain.
    pub fn bounded(&mut self, n: usize) -> Result<Self> {
        Ok(Self::new(self.read_exact(n)?))
    }

    /// Consumes the reader, failing if any bytes were left unread.
    ///
    /// Used to catch a chunk handler that under- or over-consumes a bounded
    /// sub-reader produced by [`Self::bounded`].
    ///
    /// ## Errors
    ///
    /// If [`Self::remaining`] is non-zero.
    pub fn finish(self, context: &str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::invalid_data(
                context,
                format!("{} unconsumed byte(s)", self.remaining()),
            ));
        }
        Ok(())
    }
}
