//! Forward-only cursor over a byte slice.

use crate::FromBytes;

/// A bounds-checked, forward-only reader over a borrowed byte slice.
///
/// Every read either succeeds completely and advances the cursor, or returns
/// `None` and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads a [`FromBytes`] value in native layout.
    pub fn read<T: FromBytes>(&mut self) -> Option<T> {
        let value = T::read_from(self.remaining())?;
        self.pos += core::mem::size_of::<T>();
        Some(value)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Option<u16> {
        self.read::<[u8; 2]>().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Option<u32> {
        self.read::<[u8; 4]>().map(u32::from_le_bytes)
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64_le(&mut self) -> Option<u64> {
        self.read::<[u8; 8]>().map(u64::from_le_bytes)
    }

    /// Reads `len` bytes as a borrowed sub-slice.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Returns the next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Advances the cursor by up to `n` bytes, stopping at the end of data.
    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }

    /// Returns the current cursor offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the total length of the underlying data.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` once every byte has been consumed.
    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the unread tail of the data.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or(&[])
    }

    /// Returns the whole underlying slice.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_u16_le(), Some(0x1234));
        assert_eq!(reader.read_u32_le(), Some(0x1234_5678));
        assert_eq!(reader.peek(), Some(0xAA));
        assert_eq!(reader.read_u16_le(), None);
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.read_u8(), Some(0xAA));
        assert!(reader.is_at_end());
    }

    #[test]
    fn read_bytes_is_bounds_checked() {
        let data = [1, 2, 3];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_bytes(4), None);
        assert_eq!(reader.read_bytes(2), Some(&[1, 2][..]));
        assert_eq!(reader.remaining(), &[3]);
        reader.skip(10);
        assert!(reader.is_at_end());
    }
}
