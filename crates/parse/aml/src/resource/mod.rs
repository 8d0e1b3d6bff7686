//! Resource-data (hardware descriptor) framing.
//!
//! Resource templates are the byte lists of `Buffer` objects such as `_CRS`.
//! They hold a sequence of small and large descriptors terminated by an end
//! tag, as defined in ACPI 6.5 §6.4:
//!
//! ```text
//! small  bit 7 = 0, bits 6-3 id, bits 2-0 payload length   1 + len bytes
//! large  bit 7 = 1, bits 6-0 id, u16 LE payload length      3 + len bytes
//! ```
//!
//! This module only deals with framing. [`descriptor`] decodes the payloads
//! and [`codegen`] builds new ones.

pub mod codegen;
pub mod descriptor;

use crate::error::AmlError;

pub use descriptor::Descriptor;

/// Size of a small descriptor header.
pub const SMALL_HEADER_SIZE: usize = 1;

/// Size of a large descriptor header.
pub const LARGE_HEADER_SIZE: usize = 3;

const LARGE_BIT: u8 = 0x80;

/// Small descriptor ids (bits 6-3 of the header).
pub mod small {
    /// IRQ descriptor.
    pub const IRQ: u8 = 0x04;
    /// DMA descriptor.
    pub const DMA: u8 = 0x05;
    /// Start dependent functions.
    pub const START_DEPENDENT_FN: u8 = 0x06;
    /// End dependent functions.
    pub const END_DEPENDENT_FN: u8 = 0x07;
    /// I/O port descriptor.
    pub const IO: u8 = 0x08;
    /// Fixed I/O port descriptor.
    pub const FIXED_IO: u8 = 0x09;
    /// Fixed DMA descriptor.
    pub const FIXED_DMA: u8 = 0x0A;
    /// Vendor-defined descriptor.
    pub const VENDOR: u8 = 0x0E;
    /// End tag.
    pub const END_TAG: u8 = 0x0F;
}

/// Large descriptor ids (bits 6-0 of the header).
pub mod large {
    /// 24-bit memory range.
    pub const MEMORY24: u8 = 0x01;
    /// Generic register.
    pub const GENERIC_REGISTER: u8 = 0x02;
    /// Vendor-defined descriptor.
    pub const VENDOR: u8 = 0x04;
    /// 32-bit memory range.
    pub const MEMORY32: u8 = 0x05;
    /// 32-bit fixed memory range.
    pub const FIXED_MEMORY32: u8 = 0x06;
    /// DWord address space.
    pub const DWORD_ADDRESS: u8 = 0x07;
    /// Word address space.
    pub const WORD_ADDRESS: u8 = 0x08;
    /// Extended interrupt.
    pub const EXTENDED_INTERRUPT: u8 = 0x09;
    /// QWord address space.
    pub const QWORD_ADDRESS: u8 = 0x0A;
    /// Extended address space.
    pub const EXTENDED_ADDRESS: u8 = 0x0B;
    /// GPIO connection.
    pub const GPIO: u8 = 0x0C;
    /// Pin function.
    pub const PIN_FUNCTION: u8 = 0x0D;
    /// Generic serial bus connection.
    pub const SERIAL_BUS: u8 = 0x0E;
}

/// The end tag with a zero checksum, as emitted by ASL compilers.
pub const END_TAG: [u8; 2] = [small_header(small::END_TAG, 1), 0x00];

/// Builds a small descriptor header byte.
#[must_use]
pub const fn small_header(id: u8, len: u8) -> u8 {
    ((id & 0x0F) << 3) | (len & 0x07)
}

/// Builds a large descriptor header byte.
#[must_use]
pub const fn large_header(id: u8) -> u8 {
    LARGE_BIT | (id & 0x7F)
}

/// Identifier of a descriptor, without its length bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorId {
    /// A small descriptor id (0-15).
    Small(u8),
    /// A large descriptor id (0-127).
    Large(u8),
}

impl DescriptorId {
    /// Extracts the id from the first byte of a descriptor.
    #[must_use]
    pub const fn from_header(header: u8) -> Self {
        if header & LARGE_BIT != 0 {
            Self::Large(header & 0x7F)
        } else {
            Self::Small((header >> 3) & 0x0F)
        }
    }

    /// Returns `true` for small descriptor ids.
    #[must_use]
    pub const fn is_small(self) -> bool {
        matches!(self, Self::Small(_))
    }
}

/// Returns the id of the descriptor starting at `bytes`.
#[must_use]
pub fn descriptor_id(bytes: &[u8]) -> Option<DescriptorId> {
    bytes.first().map(|&header| DescriptorId::from_header(header))
}

/// Returns `true` if `header` starts an end tag.
#[must_use]
pub const fn is_end_tag(header: u8) -> bool {
    matches!(DescriptorId::from_header(header), DescriptorId::Small(small::END_TAG))
}

/// Returns the total size of the descriptor starting at `bytes`.
///
/// Returns `None` if the buffer is empty or too short to hold a large
/// descriptor's length field. The returned size is not checked against the
/// buffer length.
#[must_use]
pub fn element_size(bytes: &[u8]) -> Option<usize> {
    let &header = bytes.first()?;
    if header & LARGE_BIT != 0 {
        let len = bytes.get(1..LARGE_HEADER_SIZE)?;
        Some(LARGE_HEADER_SIZE + usize::from(u16::from_le_bytes([len[0], len[1]])))
    } else {
        Some(SMALL_HEADER_SIZE + usize::from(header & 0x07))
    }
}

/// Checks that `bytes` is a well-framed resource template.
///
/// The buffer must not start with an end tag, every element must fit in the
/// buffer, an end dependent-function element needs an open start, and the
/// last element must be an end tag that ends exactly at the end of `bytes`.
/// A start dependent-function list that is never closed is accepted.
///
/// # Errors
///
/// Returns [`AmlError::InvalidResourceData`] if any check fails.
pub fn validate(bytes: &[u8]) -> Result<(), AmlError> {
    let &first = bytes.first().ok_or(AmlError::InvalidResourceData)?;
    if is_end_tag(first) {
        return Err(AmlError::InvalidResourceData);
    }

    let mut pos = 0;
    let mut in_dependent_fn = false;
    loop {
        let rest = &bytes[pos..];
        let size = element_size(rest).ok_or(AmlError::InvalidResourceData)?;
        if size > rest.len() {
            return Err(AmlError::InvalidResourceData);
        }

        match DescriptorId::from_header(rest[0]) {
            DescriptorId::Small(small::START_DEPENDENT_FN) => in_dependent_fn = true,
            DescriptorId::Small(small::END_DEPENDENT_FN) => {
                if !in_dependent_fn {
                    return Err(AmlError::InvalidResourceData);
                }
                in_dependent_fn = false;
            }
            DescriptorId::Small(small::END_TAG) => {
                return if pos + size == bytes.len() {
                    Ok(())
                } else {
                    Err(AmlError::InvalidResourceData)
                };
            }
            _ => {}
        }
        pos += size;
    }
}

/// Returns `true` if `bytes` passes [`validate`].
#[must_use]
pub fn is_resource_template(bytes: &[u8]) -> bool {
    validate(bytes).is_ok()
}

/// Iterator over the raw elements of a resource template.
///
/// Yields each descriptor, end tag included, as a sub-slice. Stops at the
/// first element that does not fit.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let size = element_size(self.rest)?;
        if size > self.rest.len() {
            self.rest = &[];
            return None;
        }
        let (element, rest) = self.rest.split_at(size);
        self.rest = rest;
        Some(element)
    }
}

/// Iterates over the raw elements of `bytes`.
#[must_use]
pub const fn elements(bytes: &[u8]) -> Elements<'_> {
    Elements { rest: bytes }
}
