//! Field list elements.
//!
//! The byte list of `Field`, `IndexField` and `BankField` is a sequence of
//! field units:
//!
//! ```text
//! NamedField          := NameSeg PkgLength
//! ReservedField       := 0x00 PkgLength
//! AccessField         := 0x01 AccessType AccessAttrib
//! ConnectField        := 0x02 (NameString | BufferOp PkgLength ...)
//! ExtendedAccessField := 0x03 AccessType ExtendedAccessAttrib AccessLength
//! ```
//!
//! The PkgLength of a named or reserved field is a bit count, not a byte
//! extent.

use alloc::vec::Vec;

use hadron_binparse::BinaryReader;

use crate::error::AmlError;
use crate::grammar::op;
use crate::name::{NameSeg, NameString};
use crate::pkglen;

const RESERVED_FIELD: u8 = 0x00;
const ACCESS_FIELD: u8 = 0x01;
const CONNECT_FIELD: u8 = 0x02;
const EXTENDED_ACCESS_FIELD: u8 = 0x03;

/// Target of a `Connection ()` field unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectTarget<'a> {
    /// A named resource buffer.
    Name(NameString<'a>),
    /// An inline resource buffer, `BufferOp` and PkgLength included.
    Buffer(&'a [u8]),
}

/// One decoded field unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldElement<'a> {
    /// A named field of `bits` bits.
    Named {
        /// Field name.
        name: NameSeg,
        /// Width in bits.
        bits: u32,
    },
    /// `bits` unnamed bits (ASL `Offset ()` or `, n`).
    Reserved {
        /// Width in bits.
        bits: u32,
    },
    /// Changes the access type of the following fields.
    Access {
        /// Access type byte.
        access_type: u8,
        /// Access attribute byte.
        attrib: u8,
    },
    /// Connection resource of the following fields.
    Connect(ConnectTarget<'a>),
    /// Access type with an explicit byte length.
    ExtendedAccess {
        /// Access type byte.
        access_type: u8,
        /// Extended access attribute byte.
        attrib: u8,
        /// Access length in bytes.
        length: u8,
    },
}

impl<'a> FieldElement<'a> {
    /// Decodes the element at the start of `bytes`.
    ///
    /// Returns the element and the number of bytes it spans.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::UnexpectedEnd`] if the element is truncated,
    /// [`AmlError::InvalidNameString`] for a bad name, or
    /// [`AmlError::InvalidPkgLength`] for a bad bit count.
    pub fn decode(bytes: &'a [u8]) -> Result<(Self, usize), AmlError> {
        let mut reader = BinaryReader::new(bytes);
        let lead = reader.read_u8().ok_or(AmlError::UnexpectedEnd)?;
        let element = match lead {
            RESERVED_FIELD => {
                let (bits, _) = pkglen::read(&mut reader)?;
                Self::Reserved { bits }
            }
            ACCESS_FIELD => {
                let access_type = reader.read_u8().ok_or(AmlError::UnexpectedEnd)?;
                let attrib = reader.read_u8().ok_or(AmlError::UnexpectedEnd)?;
                Self::Access { access_type, attrib }
            }
            CONNECT_FIELD => {
                let rest = &bytes[1..];
                let target = if rest.first() == Some(&op::BUFFER) {
                    let mut inner = BinaryReader::new(&rest[1..]);
                    let (len, _) = pkglen::read(&mut inner)?;
                    let end = 1 + usize::try_from(len).map_err(|_| AmlError::InvalidPkgLength)?;
                    ConnectTarget::Buffer(rest.get(..end).ok_or(AmlError::UnexpectedEnd)?)
                } else {
                    ConnectTarget::Name(NameString::parse(rest)?)
                };
                let span = match target {
                    ConnectTarget::Buffer(buffer) => buffer.len(),
                    ConnectTarget::Name(name) => name.encoded_len(),
                };
                reader.skip(span);
                Self::Connect(target)
            }
            EXTENDED_ACCESS_FIELD => {
                let access = reader.read_bytes(3).ok_or(AmlError::UnexpectedEnd)?;
                Self::ExtendedAccess {
                    access_type: access[0],
                    attrib: access[1],
                    length: access[2],
                }
            }
            _ => {
                let seg = reader.read_bytes(4).ok_or(AmlError::UnexpectedEnd)?;
                let name = NameSeg::from_bytes(seg).ok_or(AmlError::InvalidNameString)?;
                let (bits, _) = pkglen::read(&mut reader)?;
                Self::Named { name, bits }
            }
        };
        Ok((element, reader.position()))
    }
}

/// Length of the field unit at the start of `bytes`, `None` if it does not
/// decode.
#[must_use]
pub fn element_len(bytes: &[u8]) -> Option<usize> {
    FieldElement::decode(bytes).ok().map(|(_, len)| len)
}

/// Splits a field list into its elements.
///
/// Returns `None` unless the whole list decodes cleanly.
#[must_use]
pub fn split(bytes: &[u8]) -> Option<Vec<&[u8]>> {
    let mut elements = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let len = element_len(rest)?;
        let (element, tail) = rest.split_at(len);
        elements.try_reserve(1).ok()?;
        elements.push(element);
        rest = tail;
    }
    Some(elements)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn named_and_reserved() {
        // "GPE0", 8 bits
        let (element, len) = FieldElement::decode(b"GPE0\x08").unwrap();
        assert_eq!(len, 5);
        assert_eq!(
            element,
            FieldElement::Named {
                name: NameSeg(*b"GPE0"),
                bits: 8
            }
        );

        // Offset (0x40) expressed as a reserved run of 0x200 bits.
        let (element, len) = FieldElement::decode(&[0x00, 0x40, 0x20]).unwrap();
        assert_eq!(len, 3);
        assert_eq!(element, FieldElement::Reserved { bits: 0x200 });
    }

    #[test]
    fn access_and_connection() {
        assert_eq!(element_len(&[0x01, 0x03, 0x00]), Some(3));
        assert_eq!(element_len(&[0x03, 0x0B, 0x06, 0x10]), Some(4));

        // Connection (GPIO)
        let (element, len) = FieldElement::decode(b"\x02GPIO").unwrap();
        assert_eq!(len, 5);
        assert!(matches!(element, FieldElement::Connect(ConnectTarget::Name(_))));

        // Connection (ResourceTemplate () {...}) with a three-byte body.
        let bytes = [0x02, 0x11, 0x04, 0xAA, 0xBB, 0xCC, 0x99];
        let (element, len) = FieldElement::decode(&bytes).unwrap();
        assert_eq!(len, 6);
        assert_eq!(element, FieldElement::Connect(ConnectTarget::Buffer(&bytes[1..6])));
    }

    #[test]
    fn split_all_or_nothing() {
        // AccessAs (ByteAcc), FLD0 8, FLD1 8
        let list = [0x01, 0x01, 0x00, b'F', b'L', b'D', b'0', 0x08, b'F', b'L', b'D', b'1', 0x08];
        let parts = split(&list).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], b"FLD0\x08");

        // Truncated trailing element.
        assert!(split(&list[..11]).is_none());
        // Lower-case is not a field name.
        assert!(split(b"fld0\x08").is_none());
        assert_eq!(split(&[]).map(|parts| parts.len()), Some(0));
    }
}
