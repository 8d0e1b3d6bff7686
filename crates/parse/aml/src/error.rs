//! Error type shared by every AML operation.

use core::fmt;

/// Errors that can occur while decoding, editing or encoding AML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmlError {
    /// A handle, argument index or node type was not acceptable here.
    InvalidArgument,
    /// The AML stream ended in the middle of a construct.
    UnexpectedEnd,
    /// No grammar entry exists for the opcode.
    UnknownOpcode {
        /// First opcode byte.
        op: u8,
        /// Sub-opcode, or zero for single-byte opcodes.
        sub_op: u8,
    },
    /// A PkgLength encoding was malformed or its value out of range.
    InvalidPkgLength,
    /// A PkgLength extends past the enclosing buffer.
    PkgLengthOverrun,
    /// A NameString was malformed.
    InvalidNameString,
    /// A resource-data buffer failed validation.
    InvalidResourceData,
    /// The definition-block header was short, inconsistent or of the wrong
    /// signature.
    InvalidHeader,
    /// An allocation or arena slot could not be obtained.
    OutOfMemory,
    /// A lookup did not find the requested node.
    NotFound,
    /// The operation is valid AML but not supported by this crate.
    Unsupported,
    /// A size or count grew past what its encoding can hold.
    Overflow,
    /// A size or count shrank below zero.
    Underflow,
    /// The output buffer is too small; `required` bytes are needed.
    BufferTooSmall {
        /// Size of the serialized table in bytes.
        required: usize,
    },
    /// Serialization produced a size different from the header length.
    SizeMismatch,
}

/// Coarse classification of an [`AmlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed something unusable.
    InvalidArgument,
    /// The input bytes are not well-formed AML.
    MalformedInput,
    /// Resources were exhausted.
    OutOfMemory,
    /// The requested item does not exist.
    NotFound,
    /// Valid but unsupported input.
    Unsupported,
}

impl AmlError {
    /// Returns the coarse category of this error.
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::InvalidArgument
            | Self::Overflow
            | Self::Underflow
            | Self::BufferTooSmall { .. }
            | Self::SizeMismatch => ErrorKind::InvalidArgument,
            Self::UnexpectedEnd
            | Self::UnknownOpcode { .. }
            | Self::InvalidPkgLength
            | Self::PkgLengthOverrun
            | Self::InvalidNameString
            | Self::InvalidResourceData
            | Self::InvalidHeader => ErrorKind::MalformedInput,
            Self::OutOfMemory => ErrorKind::OutOfMemory,
            Self::NotFound => ErrorKind::NotFound,
            Self::Unsupported => ErrorKind::Unsupported,
        }
    }
}

impl fmt::Display for AmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::UnexpectedEnd => f.write_str("unexpected end of AML stream"),
            Self::UnknownOpcode { op, sub_op } => {
                write!(f, "unknown opcode 0x{op:02X} (sub-opcode 0x{sub_op:02X})")
            }
            Self::InvalidPkgLength => f.write_str("invalid PkgLength"),
            Self::PkgLengthOverrun => f.write_str("PkgLength exceeds enclosing buffer"),
            Self::InvalidNameString => f.write_str("invalid NameString"),
            Self::InvalidResourceData => f.write_str("invalid resource data"),
            Self::InvalidHeader => f.write_str("invalid definition block header"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::NotFound => f.write_str("node not found"),
            Self::Unsupported => f.write_str("unsupported operation"),
            Self::Overflow => f.write_str("size or count overflow"),
            Self::Underflow => f.write_str("size or count underflow"),
            Self::BufferTooSmall { required } => {
                write!(f, "buffer too small, {required} bytes required")
            }
            Self::SizeMismatch => f.write_str("serialized size does not match header length"),
        }
    }
}

impl core::error::Error for AmlError {}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use alloc::string::ToString;

    #[test]
    fn kinds() {
        assert_eq!(AmlError::PkgLengthOverrun.kind(), ErrorKind::MalformedInput);
        assert_eq!(AmlError::Overflow.kind(), ErrorKind::InvalidArgument);
        assert_eq!(AmlError::NotFound.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn display_includes_details() {
        let err = AmlError::UnknownOpcode { op: 0x5B, sub_op: 0x7F };
        assert_eq!(err.to_string(), "unknown opcode 0x5B (sub-opcode 0x7F)");
        let err = AmlError::BufferTooSmall { required: 42 };
        assert_eq!(err.to_string(), "buffer too small, 42 bytes required");
    }
}
