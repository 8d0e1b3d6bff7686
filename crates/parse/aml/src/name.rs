//! AML NameStrings and their ASL spelling.
//!
//! ```text
//! NameString := RootChar NamePath | PrefixPath NamePath
//! PrefixPath := Nothing | '^' PrefixPath
//! NamePath   := NameSeg | DualNamePath | MultiNamePath | NullName
//! ```
//!
//! A NullName (`0x00`) is only accepted after a root or parent prefix.

use alloc::vec::Vec;
use core::fmt;

use crate::error::AmlError;
use crate::grammar::{is_lead_name_char, is_seg_char, op};

/// Size of one NameSeg in bytes.
pub const NAME_SEG_SIZE: usize = 4;

/// A 4-byte AML name segment (e.g., `_SB_`, `PCI0`, `_HID`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSeg(pub [u8; NAME_SEG_SIZE]);

impl NameSeg {
    /// Creates a `NameSeg` from the first four bytes of `bytes`.
    ///
    /// Returns `None` if the slice is too short or the bytes are not a valid
    /// segment.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let seg: [u8; NAME_SEG_SIZE] = bytes.get(..NAME_SEG_SIZE)?.try_into().ok()?;
        Self::is_valid(&seg).then_some(Self(seg))
    }

    /// Returns `true` if `seg` is a lead character followed by three name
    /// characters.
    #[must_use]
    pub fn is_valid(seg: &[u8; NAME_SEG_SIZE]) -> bool {
        is_lead_name_char(seg[0]) && seg[1..].iter().all(|&c| is_seg_char(c))
    }

    /// Returns the name as a string (segments are always ASCII).
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("")
    }

    /// Returns the name with trailing `_` padding removed, as written in ASL.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        let s = self.as_str();
        let trimmed = s.trim_end_matches('_');
        if trimmed.is_empty() { &s[..1] } else { trimmed }
    }
}

impl fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameSeg(\"{}\")", self.as_str())
    }
}

impl fmt::Display for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated NameString borrowed from an AML byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameString<'a> {
    root: bool,
    parent_prefixes: usize,
    segments: &'a [u8],
    encoded_len: usize,
}

impl<'a> NameString<'a> {
    /// Parses the NameString at the start of `bytes`.
    ///
    /// Trailing bytes are ignored; [`encoded_len`](Self::encoded_len) tells
    /// how many were consumed.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::UnexpectedEnd`] if the name is truncated, or
    /// [`AmlError::InvalidNameString`] if it is malformed.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, AmlError> {
        let mut pos = 0;
        let mut root = false;
        let mut parent_prefixes = 0;

        match bytes.first() {
            Some(&op::ROOT_CHAR) => {
                root = true;
                pos = 1;
            }
            Some(&op::PARENT_PREFIX) => {
                while bytes.get(pos) == Some(&op::PARENT_PREFIX) {
                    pos += 1;
                }
                parent_prefixes = pos;
            }
            Some(_) => {}
            None => return Err(AmlError::UnexpectedEnd),
        }

        let lead = *bytes.get(pos).ok_or(AmlError::UnexpectedEnd)?;
        let seg_count = match lead {
            op::DUAL_NAME_PREFIX => {
                pos += 1;
                2
            }
            op::MULTI_NAME_PREFIX => {
                let count = *bytes.get(pos + 1).ok_or(AmlError::UnexpectedEnd)?;
                if count == 0 {
                    return Err(AmlError::InvalidNameString);
                }
                pos += 2;
                usize::from(count)
            }
            0x00 => {
                if !root && parent_prefixes == 0 {
                    return Err(AmlError::InvalidNameString);
                }
                return Ok(Self {
                    root,
                    parent_prefixes,
                    segments: &[],
                    encoded_len: pos + 1,
                });
            }
            _ => 1,
        };

        let end = pos + seg_count * NAME_SEG_SIZE;
        let segments = bytes.get(pos..end).ok_or(AmlError::UnexpectedEnd)?;
        for seg in segments.chunks_exact(NAME_SEG_SIZE) {
            if NameSeg::from_bytes(seg).is_none() {
                return Err(AmlError::InvalidNameString);
            }
        }

        Ok(Self {
            root,
            parent_prefixes,
            segments,
            encoded_len: end,
        })
    }

    /// Parses `bytes` as exactly one NameString with nothing after it.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidNameString`] if the name is malformed or
    /// bytes remain after it.
    pub fn parse_exact(bytes: &'a [u8]) -> Result<Self, AmlError> {
        let name = Self::parse(bytes).map_err(|_| AmlError::InvalidNameString)?;
        if name.encoded_len != bytes.len() {
            return Err(AmlError::InvalidNameString);
        }
        Ok(name)
    }

    /// Number of bytes the name occupies in the AML stream.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// Returns `true` if the name starts at the namespace root.
    #[must_use]
    pub const fn is_absolute(&self) -> bool {
        self.root
    }

    /// Number of `^` prefixes.
    #[must_use]
    pub const fn parent_prefixes(&self) -> usize {
        self.parent_prefixes
    }

    /// Number of NameSegs.
    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.segments.len() / NAME_SEG_SIZE
    }

    /// Iterates over the NameSegs.
    pub fn segments(self) -> impl Iterator<Item = NameSeg> + 'a {
        self.segments
            .chunks_exact(NAME_SEG_SIZE)
            .filter_map(NameSeg::from_bytes)
    }
}

impl fmt::Display for NameString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root {
            f.write_str("\\")?;
        }
        for _ in 0..self.parent_prefixes {
            f.write_str("^")?;
        }
        for (i, seg) in self.segments().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg.trimmed())?;
        }
        Ok(())
    }
}

/// Returns `true` if `bytes` is exactly one valid NameString.
#[must_use]
pub fn is_valid_name_string(bytes: &[u8]) -> bool {
    NameString::parse_exact(bytes).is_ok()
}

/// Converts an ASL path such as `\_SB.pci0` or `^^DEV.foo` into its AML encoding.
///
/// Segments are upper-cased and padded with `_` to four characters. A path
/// that has only prefixes (`\`, `^^`) encodes to a NullName.
///
/// # Errors
///
/// Returns [`AmlError::InvalidNameString`] for empty paths, segments longer
/// than four characters, invalid characters or more than 255 segments.
pub fn aml_name_from_asl(asl: &str) -> Result<Vec<u8>, AmlError> {
    let bytes = asl.as_bytes();
    let mut pos = 0;
    let mut out = Vec::new();

    if bytes.first() == Some(&op::ROOT_CHAR) {
        out.push(op::ROOT_CHAR);
        pos = 1;
    } else {
        while bytes.get(pos) == Some(&op::PARENT_PREFIX) {
            out.push(op::PARENT_PREFIX);
            pos += 1;
        }
    }

    let path = &asl[pos..];
    if path.is_empty() {
        if out.is_empty() {
            return Err(AmlError::InvalidNameString);
        }
        out.push(0x00);
        return Ok(out);
    }

    let mut segs = Vec::new();
    for part in path.split('.') {
        segs.push(asl_seg(part)?);
    }
    match segs.len() {
        1 => {}
        2 => out.push(op::DUAL_NAME_PREFIX),
        n => {
            let count = u8::try_from(n).map_err(|_| AmlError::InvalidNameString)?;
            out.push(op::MULTI_NAME_PREFIX);
            out.push(count);
        }
    }
    for seg in &segs {
        out.extend_from_slice(&seg.0);
    }
    Ok(out)
}

/// Returns `true` if the AML NameString `aml` is the encoding of the ASL
/// path `asl` (case-insensitive, padding optional).
#[must_use]
pub fn aml_name_matches(aml: &[u8], asl: &str) -> bool {
    aml_name_from_asl(asl).is_ok_and(|encoded| encoded == aml)
}

fn asl_seg(part: &str) -> Result<NameSeg, AmlError> {
    let bytes = part.as_bytes();
    if bytes.is_empty() || bytes.len() > NAME_SEG_SIZE {
        return Err(AmlError::InvalidNameString);
    }
    let mut seg = [b'_'; NAME_SEG_SIZE];
    for (dst, &src) in seg.iter_mut().zip(bytes) {
        *dst = src.to_ascii_uppercase();
    }
    if !NameSeg::is_valid(&seg) {
        return Err(AmlError::InvalidNameString);
    }
    Ok(NameSeg(seg))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn single_segment() {
        let name = NameString::parse(b"_UIDxx").unwrap();
        assert_eq!(name.encoded_len(), 4);
        assert_eq!(name.segment_count(), 1);
        assert_eq!(name.to_string(), "_UID");
    }

    #[test]
    fn prefixed_paths() {
        // \_SB_.PCI0
        let bytes = b"\\\x2E_SB_PCI0";
        let name = NameString::parse_exact(bytes).unwrap();
        assert!(name.is_absolute());
        assert_eq!(name.segment_count(), 2);
        assert_eq!(name.to_string(), "\\_SB.PCI0");

        // ^^ + MultiNamePrefix(3)
        let bytes = b"^^\x2F\x03AAAABBBBCCCC";
        let name = NameString::parse_exact(bytes).unwrap();
        assert_eq!(name.parent_prefixes(), 2);
        assert_eq!(name.segment_count(), 3);
        assert_eq!(name.to_string(), "^^AAAA.BBBB.CCCC");
    }

    #[test]
    fn null_name_needs_prefix() {
        assert_eq!(NameString::parse(b"\\\0").unwrap().encoded_len(), 2);
        assert_eq!(NameString::parse(b"^^\0").unwrap().encoded_len(), 3);
        assert_eq!(NameString::parse(b"\0"), Err(AmlError::InvalidNameString));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(NameString::parse(b"1ABC"), Err(AmlError::InvalidNameString));
        assert_eq!(NameString::parse(b"AB"), Err(AmlError::UnexpectedEnd));
        assert_eq!(NameString::parse(b"\x2F\x00"), Err(AmlError::InvalidNameString));
        assert!(!is_valid_name_string(b"ABCDE"));
        assert!(is_valid_name_string(b"AB_1"));
    }

    #[test]
    fn asl_conversion() {
        assert_eq!(aml_name_from_asl("_SB").unwrap(), b"_SB_");
        assert_eq!(aml_name_from_asl("\\_sb.cmn6").unwrap(), b"\\\x2E_SB_CMN6");
        assert_eq!(
            aml_name_from_asl("^A.B.C").unwrap(),
            b"^\x2F\x03A___B___C___"
        );
        assert_eq!(aml_name_from_asl("\\").unwrap(), b"\\\0");
        assert_eq!(aml_name_from_asl(""), Err(AmlError::InvalidNameString));
        assert_eq!(aml_name_from_asl("TOOLONG"), Err(AmlError::InvalidNameString));
        assert_eq!(aml_name_from_asl("A..B"), Err(AmlError::InvalidNameString));
        assert_eq!(aml_name_from_asl("9ABC"), Err(AmlError::InvalidNameString));
    }

    #[test]
    fn asl_comparison() {
        assert!(aml_name_matches(b"_UID", "_uid"));
        assert!(aml_name_matches(b"\\\x2E_SB_PCI0", "\\_SB.PCI0"));
        assert!(!aml_name_matches(b"_UID", "_HID"));
        assert!(!aml_name_matches(b"_UID", "not a name"));
    }
}
