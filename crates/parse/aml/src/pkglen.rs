//! PkgLength encoding.
//!
//! ```text
//! PkgLeadByte  bit 7-6  number of ByteData that follow (0-3)
//!              bit 5-4  part of the value when no bytes follow, else zero
//!              bit 3-0  least significant nybble of the value
//! ```
//!
//! The encoded value counts the PkgLength bytes themselves plus everything up
//! to the end of the enclosing statement. The largest encodable value is
//! `2^28 - 1`.

use hadron_binparse::{BinaryReader, BinaryWriter};

use crate::error::AmlError;

/// Largest value a PkgLength can hold.
pub const MAX_PKG_LENGTH: u32 = (1 << 28) - 1;

/// Largest number of bytes a PkgLength occupies.
pub const MAX_PKG_LENGTH_WIDTH: usize = 4;

/// Reads a PkgLength.
///
/// Returns `(value, width)` where `width` is the number of bytes consumed.
///
/// # Errors
///
/// Returns [`AmlError::UnexpectedEnd`] if the encoding is truncated, or
/// [`AmlError::InvalidPkgLength`] if the reserved lead-byte bits are set in a
/// multi-byte encoding.
pub fn read(reader: &mut BinaryReader<'_>) -> Result<(u32, usize), AmlError> {
    let lead = reader.read_u8().ok_or(AmlError::UnexpectedEnd)?;
    let follow = usize::from(lead >> 6);

    if follow == 0 {
        return Ok((u32::from(lead & 0x3F), 1));
    }
    if lead & 0x30 != 0 {
        return Err(AmlError::InvalidPkgLength);
    }

    let bytes = reader.read_bytes(follow).ok_or(AmlError::UnexpectedEnd)?;
    let mut value = u32::from(lead & 0x0F);
    for (i, &byte) in bytes.iter().enumerate() {
        value |= u32::from(byte) << (4 + i * 8);
    }
    Ok((value, 1 + follow))
}

/// Returns the number of bytes needed to encode `value`.
///
/// # Errors
///
/// Returns [`AmlError::Overflow`] if `value` exceeds [`MAX_PKG_LENGTH`].
pub const fn width(value: u32) -> Result<usize, AmlError> {
    match value {
        0..0x40 => Ok(1),
        0x40..0x1000 => Ok(2),
        0x1000..0x10_0000 => Ok(3),
        0x10_0000..=MAX_PKG_LENGTH => Ok(4),
        _ => Err(AmlError::Overflow),
    }
}

/// Encodes `value` in its minimal form.
///
/// Returns the buffer and the number of bytes used.
///
/// # Errors
///
/// Returns [`AmlError::Overflow`] if `value` exceeds [`MAX_PKG_LENGTH`].
pub fn encode(value: u32) -> Result<([u8; MAX_PKG_LENGTH_WIDTH], usize), AmlError> {
    encode_with_width(value, width(value)?)
}

/// Encodes `value` on exactly `len` bytes.
///
/// Tables built by some compilers carry PkgLengths wider than necessary;
/// re-encoding them with their decoded width keeps the stream unchanged.
///
/// # Errors
///
/// Returns [`AmlError::Overflow`] if `value` exceeds [`MAX_PKG_LENGTH`], or
/// [`AmlError::InvalidPkgLength`] if `len` is too short for `value` or
/// longer than [`MAX_PKG_LENGTH_WIDTH`].
#[allow(clippy::cast_possible_truncation)]
pub fn encode_with_width(
    value: u32,
    len: usize,
) -> Result<([u8; MAX_PKG_LENGTH_WIDTH], usize), AmlError> {
    if len < width(value)? || len > MAX_PKG_LENGTH_WIDTH {
        return Err(AmlError::InvalidPkgLength);
    }
    let mut out = [0u8; MAX_PKG_LENGTH_WIDTH];
    if len == 1 {
        out[0] = value as u8;
        return Ok((out, 1));
    }
    let follow = len - 1;
    out[0] = ((follow as u8) << 6) | (value & 0x0F) as u8;
    for (i, byte) in out[1..len].iter_mut().enumerate() {
        *byte = (value >> (4 + i * 8)) as u8;
    }
    Ok((out, len))
}

/// Writes the minimal encoding of `value`.
///
/// # Errors
///
/// Returns [`AmlError::Overflow`] for unencodable values, or
/// [`AmlError::InvalidArgument`] if the writer runs out of space.
pub fn write(writer: &mut BinaryWriter<'_>, value: u32) -> Result<usize, AmlError> {
    let (bytes, width) = encode(value)?;
    writer
        .write_bytes(&bytes[..width])
        .ok_or(AmlError::InvalidArgument)?;
    Ok(width)
}

/// Computes the PkgLength value for a statement whose bytes after the
/// PkgLength field total `body_len`.
///
/// # Errors
///
/// Returns [`AmlError::Overflow`] if the result would exceed
/// [`MAX_PKG_LENGTH`].
pub fn for_body(body_len: u32) -> Result<u32, AmlError> {
    for candidate_width in 1..=MAX_PKG_LENGTH_WIDTH {
        #[allow(clippy::cast_possible_truncation)]
        let value = body_len
            .checked_add(candidate_width as u32)
            .ok_or(AmlError::Overflow)?;
        if width(value)? == candidate_width {
            return Ok(value);
        }
    }
    Err(AmlError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<(u32, usize), AmlError> {
        read(&mut BinaryReader::new(bytes))
    }

    #[test]
    fn single_byte() {
        assert_eq!(decode(&[0x3F]), Ok((63, 1)));
        assert_eq!(encode(0x25).map(|(b, w)| (b[0], w)), Ok((0x25, 1)));
    }

    #[test]
    fn multi_byte() {
        // 0x1234: lead nybble 4, then 0x23, then 0x01.
        assert_eq!(decode(&[0x84, 0x23, 0x01]), Ok((0x1234, 3)));
        let (bytes, width) = encode(0x1234).unwrap();
        assert_eq!(&bytes[..width], &[0x84, 0x23, 0x01]);

        let (bytes, width) = encode(MAX_PKG_LENGTH).unwrap();
        assert_eq!(width, 4);
        assert_eq!(decode(&bytes[..width]), Ok((MAX_PKG_LENGTH, 4)));
    }

    #[test]
    fn reserved_bits_and_truncation() {
        assert_eq!(decode(&[0x50, 0x01]), Err(AmlError::InvalidPkgLength));
        assert_eq!(decode(&[0xC0, 0x01]), Err(AmlError::UnexpectedEnd));
        assert_eq!(decode(&[]), Err(AmlError::UnexpectedEnd));
    }

    #[test]
    fn non_minimal_width_round_trips() {
        // 0x20 spread over two bytes: lead 0x40, then 0x02.
        assert_eq!(decode(&[0x40, 0x02]), Ok((0x20, 2)));
        let (bytes, width) = encode_with_width(0x20, 2).unwrap();
        assert_eq!(&bytes[..width], &[0x40, 0x02]);
        assert_eq!(encode_with_width(0x1234, 2), Err(AmlError::InvalidPkgLength));
        assert_eq!(encode_with_width(0x20, 5), Err(AmlError::InvalidPkgLength));
    }

    #[test]
    fn widths() {
        assert_eq!(width(63), Ok(1));
        assert_eq!(width(64), Ok(2));
        assert_eq!(width(0xFFF), Ok(2));
        assert_eq!(width(0x1000), Ok(3));
        assert_eq!(width(0x10_0000), Ok(4));
        assert_eq!(width(1 << 28), Err(AmlError::Overflow));
        assert_eq!(encode(1 << 28), Err(AmlError::Overflow));
    }

    #[test]
    fn body_length_includes_own_width() {
        assert_eq!(for_body(0), Ok(1));
        assert_eq!(for_body(62), Ok(63));
        // 63 + 1 would need two bytes, so the field grows.
        assert_eq!(for_body(63), Ok(65));
        assert_eq!(for_body(MAX_PKG_LENGTH), Err(AmlError::Overflow));
    }

    #[test]
    fn every_width_round_trips_minimally() {
        let boundaries = [0x3F, 0x40, 0xFFF, 0x1000, 0xF_FFFF, 0x10_0000, MAX_PKG_LENGTH];
        let edges = boundaries.into_iter().flat_map(|b| [b.saturating_sub(1), b, b.saturating_add(1)]);
        let sweep = (0..=MAX_PKG_LENGTH).step_by(0x1_0001);
        for value in edges.chain(sweep).filter(|&v| v <= MAX_PKG_LENGTH) {
            let (bytes, len) = encode(value).unwrap();
            assert_eq!(decode(&bytes[..len]), Ok((value, len)), "{value:#x}");
            let shortest = (1..=MAX_PKG_LENGTH_WIDTH)
                .find(|&w| encode_with_width(value, w).is_ok())
                .unwrap();
            assert_eq!(len, shortest, "{value:#x}");
        }
    }
}
