use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Cursor over a borrowed byte slice with big-endian field readers.
pub struct ByteReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, cursor: 0 }
    }

    /// Get current cursor position
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Get remaining bytes from current position
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.cursor)
    }

    /// Check if buffer has at least n bytes remaining
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Everything after the cursor, without advancing
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.cursor.min(self.data.len())..]
    }

    /// Read `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> IoResult<&'a [u8]> {
        if !self.has_remaining(len) {
            return Err(IoError::new(ErrorKind::UnexpectedEof, "Not enough bytes"));
        }
        let bytes = &self.data[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> IoResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> IoResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> IoResult<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16_be(&mut self) -> IoResult<i16> {
        Ok(BigEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u24_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u24(self.read_bytes(3)?))
    }

    /// Signed 24-bit, as used by the AVC composition time offset
    pub fn read_i24_be(&mut self) -> IoResult<i32> {
        Ok(BigEndian::read_i24(self.read_bytes(3)?))
    }

    pub fn read_u32_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u16_le(&mut self) -> IoResult<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32_le(&mut self) -> IoResult<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_f64_be(&mut self) -> IoResult<f64> {
        Ok(BigEndian::read_f64(self.read_bytes(8)?))
    }
}

/// Inbound byte queue.
///
/// Bytes are appended as they arrive from the transport and only leave the
/// queue through `consume`/`take`, so a parser can inspect a partial stage
/// with `peek` and come back once more data has been pushed.
#[derive(Debug, Default)]
pub struct InputBuffer {
    data: Vec<u8>,
    start: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        InputBuffer::default()
    }

    /// Append freshly received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 && self.start >= self.data.len() / 2 {
            self.data.drain(..self.start);
            self.start = 0;
        }
        self.data.extend_from_slice(bytes);
    }

    /// Number of unread bytes
    pub fn len(&self) -> usize {
        self.data.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether at least `n` unread bytes are buffered
    pub fn has(&self, n: usize) -> bool {
        self.len() >= n
    }

    /// Unread bytes, without consuming them
    pub fn peek(&self) -> &[u8] {
        &self.data[self.start..]
    }

    /// Drop `n` unread bytes
    pub fn consume(&mut self, n: usize) {
        self.start = (self.start + n).min(self.data.len());
        if self.start == self.data.len() {
            self.data.clear();
            self.start = 0;
        }
    }

    /// Remove and return `n` unread bytes
    pub fn take(&mut self, n: usize) -> IoResult<Vec<u8>> {
        if !self.has(n) {
            return Err(IoError::new(ErrorKind::UnexpectedEof, "Not enough bytes"));
        }
        let bytes = self.data[self.start..self.start + n].to_vec();
        self.consume(n);
        Ok(bytes)
    }
}
