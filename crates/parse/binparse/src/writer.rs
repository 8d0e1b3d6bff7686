//! Forward-only cursor writing into a mutable byte slice.

use crate::AsBytes;

/// A bounds-checked writer over a borrowed mutable byte slice.
///
/// Writes that do not fit return `None` and leave both the buffer and the
/// cursor untouched.
#[derive(Debug)]
pub struct BinaryWriter<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> BinaryWriter<'a> {
    /// Creates a writer positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Writes a byte slice.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Option<()> {
        let end = self.pos.checked_add(bytes.len())?;
        self.data.get_mut(self.pos..end)?.copy_from_slice(bytes);
        self.pos = end;
        Some(())
    }

    /// Writes the raw bytes of an [`AsBytes`] value.
    pub fn write<T: AsBytes + ?Sized>(&mut self, value: &T) -> Option<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> Option<()> {
        self.write_bytes(&[value])
    }

    /// Writes a little-endian `u16`.
    pub fn write_u16_le(&mut self, value: u16) -> Option<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32_le(&mut self, value: u32) -> Option<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u64`.
    pub fn write_u64_le(&mut self, value: u64) -> Option<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes still available.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Consumes the writer and returns the written prefix of the buffer.
    #[must_use]
    pub fn into_written(self) -> &'a mut [u8] {
        let Self { data, pos } = self;
        &mut data[..pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_until_full() {
        let mut buf = [0u8; 5];
        let mut writer = BinaryWriter::new(&mut buf);
        assert_eq!(writer.write_u16_le(0xBEEF), Some(()));
        assert_eq!(writer.write_u32_le(1), None);
        assert_eq!(writer.position(), 2);
        assert_eq!(writer.write_bytes(&[1, 2, 3]), Some(()));
        assert_eq!(writer.remaining(), 0);
        assert_eq!(writer.into_written(), &[0xEF, 0xBE, 1, 2, 3]);
    }
}
