//! Growable byte buffer with independent read and write cursors.
//!
//! One `IoBuffer` is owned per connection and reused across logical
//! messages: `reset()` rewinds both cursors without releasing storage.
//! Layout invariant: `read_pos <= used <= capacity`.
//!
//! Typed reads are bounds-checked and fail with
//! [`MdbError::BufferUnderrun`]; writes append at `used` and never fail,
//! growing the storage geometrically when needed. All multi-byte values are
//! Big Endian regardless of host byte order.

use bytes::BytesMut;

use crate::error::{MdbError, Result};

/// Initial storage size for a fresh buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 4096;

/// Read/write buffer for wire messages.
#[derive(Debug)]
pub struct IoBuffer {
    /// Backing storage. `storage.len()` is the writable extent; only
    /// `storage[..used]` holds message bytes.
    storage: BytesMut,
    /// Write cursor: number of valid bytes.
    used: usize,
    /// Read cursor, always `<= used`.
    read_pos: usize,
}

impl IoBuffer {
    /// Create a buffer with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Create a buffer with a specific initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut storage = BytesMut::with_capacity(capacity);
        storage.resize(capacity, 0);
        Self {
            storage,
            used: 0,
            read_pos: 0,
        }
    }

    /// Rewind both cursors without deallocating, so the storage is reused
    /// for the next message.
    pub fn reset(&mut self) {
        self.used = 0;
        self.read_pos = 0;
    }

    /// Number of valid bytes written so far.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Number of unread bytes between the read cursor and the write extent.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.used - self.read_pos
    }

    /// The written portion of the buffer.
    #[inline]
    pub fn as_written(&self) -> &[u8] {
        &self.storage[..self.used]
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let start = self.advance_read(1)?;
        Ok(self.storage[start])
    }

    /// Read a Big Endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a Big Endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().expect("4 bytes")))
    }

    /// Read a Big Endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().expect("8 bytes")))
    }

    /// Read a Big Endian i64.
    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_be_bytes(bytes.try_into().expect("8 bytes")))
    }

    /// Read a Big Endian f32.
    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_be_bytes(bytes.try_into().expect("4 bytes")))
    }

    /// Read a Big Endian f64.
    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        Ok(f64::from_be_bytes(bytes.try_into().expect("8 bytes")))
    }

    /// Read `num_bytes` as a UTF-8 string.
    pub fn read_string(&mut self, num_bytes: usize) -> Result<String> {
        let bytes = self.read_bytes(num_bytes)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| MdbError::Protocol("string payload is not valid UTF-8".into()))
    }

    /// Read `num_bytes` as a borrowed slice.
    pub fn read_bytes(&mut self, num_bytes: usize) -> Result<&[u8]> {
        let start = self.advance_read(num_bytes)?;
        Ok(&self.storage[start..start + num_bytes])
    }

    /// Pop a Big Endian u16 from the end of the written extent, shrinking it.
    ///
    /// The chunk layer receives `[body][next length]` in one read and pops
    /// the trailing length so only body bytes stay in the message.
    pub fn pop_u16(&mut self) -> Result<u16> {
        if self.remaining() < 2 {
            return Err(MdbError::BufferUnderrun {
                requested: 2,
                available: self.remaining(),
            });
        }
        let value = u16::from_be_bytes([self.storage[self.used - 2], self.storage[self.used - 1]]);
        self.used -= 2;
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Append a single byte.
    pub fn write_u8(&mut self, value: u8) {
        let start = self.advance_used(1);
        self.storage[start] = value;
    }

    /// Append a Big Endian u32.
    pub fn write_u32(&mut self, value: u32) {
        let start = self.advance_used(4);
        self.storage[start..start + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let start = self.advance_used(bytes.len());
        self.storage[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Reserve `num_bytes` of writable tail and return it for direct fill
    /// (e.g. a socket read straight into the buffer).
    ///
    /// The caller must follow up with [`IoBuffer::commit`] for the bytes
    /// actually written.
    pub fn tail_mut(&mut self, num_bytes: usize) -> &mut [u8] {
        self.ensure_capacity(num_bytes);
        let start = self.used;
        &mut self.storage[start..start + num_bytes]
    }

    /// Mark `num_bytes` of the tail reserved by [`IoBuffer::tail_mut`] as
    /// written.
    pub fn commit(&mut self, num_bytes: usize) {
        debug_assert!(self.used + num_bytes <= self.storage.len());
        self.used += num_bytes;
    }

    /// Grow storage so at least `extra` more bytes fit after `used`.
    fn ensure_capacity(&mut self, extra: usize) {
        let needed = self.used + extra;
        if needed > self.storage.len() {
            let new_len = needed.max(self.storage.len() * 2);
            self.storage.resize(new_len, 0);
        }
    }

    /// Advance the read cursor, returning the previous position.
    fn advance_read(&mut self, num_bytes: usize) -> Result<usize> {
        if self.remaining() < num_bytes {
            return Err(MdbError::BufferUnderrun {
                requested: num_bytes,
                available: self.remaining(),
            });
        }
        let previous = self.read_pos;
        self.read_pos += num_bytes;
        Ok(previous)
    }

    /// Advance the write cursor, growing storage if needed. Returns the
    /// previous position.
    fn advance_used(&mut self, num_bytes: usize) -> usize {
        self.ensure_capacity(num_bytes);
        let previous = self.used;
        self.used += num_bytes;
        previous
    }
}

impl Default for IoBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_round_trip() {
        let mut buffer = IoBuffer::new();
        buffer.write_u8(0xab);
        buffer.write_u32(0xdead_beef);
        buffer.write_bytes(b"hello");

        assert_eq!(buffer.used(), 10);
        assert_eq!(buffer.read_u8().unwrap(), 0xab);
        assert_eq!(buffer.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(buffer.read_bytes(5).unwrap(), b"hello");
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_reads_are_big_endian() {
        let mut buffer = IoBuffer::new();
        buffer.write_bytes(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(buffer.read_u64().unwrap(), 0x0102_0304_0506_0708);

        let mut buffer = IoBuffer::new();
        buffer.write_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(buffer.read_i64().unwrap(), -2);
    }

    #[test]
    fn test_float_reads() {
        let mut buffer = IoBuffer::new();
        buffer.write_bytes(&1.5f32.to_be_bytes());
        buffer.write_bytes(&(-2.25f64).to_be_bytes());
        assert_eq!(buffer.read_f32().unwrap(), 1.5);
        assert_eq!(buffer.read_f64().unwrap(), -2.25);
    }

    #[test]
    fn test_underrun_reports_sizes() {
        let mut buffer = IoBuffer::new();
        buffer.write_bytes(&[1, 2, 3]);
        let err = buffer.read_u32().unwrap_err();
        match err {
            MdbError::BufferUnderrun {
                requested,
                available,
            } => {
                assert_eq!(requested, 4);
                assert_eq!(available, 3);
            }
            other => panic!("expected BufferUnderrun, got {other:?}"),
        }
    }

    #[test]
    fn test_read_does_not_pass_write_extent() {
        let mut buffer = IoBuffer::with_capacity(64);
        buffer.write_u8(7);
        assert_eq!(buffer.read_u8().unwrap(), 7);
        // Capacity remains, but nothing more was written.
        assert!(buffer.read_u8().is_err());
    }

    #[test]
    fn test_growth_past_initial_capacity() {
        let mut buffer = IoBuffer::with_capacity(4);
        buffer.write_bytes(&[0u8; 100]);
        assert_eq!(buffer.used(), 100);
        assert_eq!(buffer.read_bytes(100).unwrap().len(), 100);
    }

    #[test]
    fn test_reset_reuses_storage() {
        let mut buffer = IoBuffer::with_capacity(8);
        buffer.write_bytes(b"abcdefgh");
        buffer.reset();
        assert_eq!(buffer.used(), 0);
        assert_eq!(buffer.remaining(), 0);
        buffer.write_bytes(b"xy");
        assert_eq!(buffer.read_bytes(2).unwrap(), b"xy");
    }

    #[test]
    fn test_pop_u16_takes_from_the_tail() {
        let mut buffer = IoBuffer::new();
        buffer.write_bytes(b"body");
        buffer.write_bytes(&[0x01, 0x02]);
        assert_eq!(buffer.pop_u16().unwrap(), 0x0102);
        assert_eq!(buffer.used(), 4);
        assert_eq!(buffer.read_bytes(4).unwrap(), b"body");
    }

    #[test]
    fn test_pop_u16_underrun() {
        let mut buffer = IoBuffer::new();
        buffer.write_u8(1);
        assert!(buffer.pop_u16().is_err());
    }

    #[test]
    fn test_tail_fill_and_commit() {
        let mut buffer = IoBuffer::with_capacity(2);
        let tail = buffer.tail_mut(5);
        tail.copy_from_slice(b"12345");
        buffer.commit(5);
        assert_eq!(buffer.read_string(5).unwrap(), "12345");
    }

    #[test]
    fn test_read_string_rejects_invalid_utf8() {
        let mut buffer = IoBuffer::new();
        buffer.write_bytes(&[0xff, 0xfe]);
        assert!(matches!(
            buffer.read_string(2),
            Err(MdbError::Protocol(_))
        ));
    }
}
