//! Builders for resource descriptors that table patchers add to `_CRS`.
//!
//! Each function returns the element bytes, header included, ready to be
//! wrapped in a resource-data node with
//! [`AmlTree::new_resource_data`](crate::tree::AmlTree::new_resource_data).

use alloc::vec::Vec;

use super::descriptor::{AddressSpace, AddressWidth, Descriptor, InterruptFlags, U32List};
use crate::error::AmlError;

/// Address space resource type of memory ranges.
const RESOURCE_TYPE_MEMORY: u8 = 0;

bitflags::bitflags! {
    /// General flags of an address space descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AddressFlags: u8 {
        /// The device consumes the range (clear: produces it).
        const CONSUMER = 1 << 0;
        /// Subtractive decode (clear: positive decode).
        const SUB_DECODE = 1 << 1;
        /// The minimum address is fixed.
        const MIN_FIXED = 1 << 2;
        /// The maximum address is fixed.
        const MAX_FIXED = 1 << 3;
    }
}

/// Cacheability of a memory range (type-specific flag bits 2-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Cacheability {
    /// `NonCacheable`.
    NonCacheable = 0,
    /// `Cacheable`.
    Cacheable = 1,
    /// `WriteCombining`.
    WriteCombining = 2,
    /// `Prefetchable`.
    Prefetchable = 3,
}

/// Builds an Extended Interrupt descriptor (ASL `Interrupt ()`).
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if `irqs` is empty or holds more
/// than 255 entries.
pub fn extended_interrupt(flags: InterruptFlags, irqs: &[u32]) -> Result<Vec<u8>, AmlError> {
    if irqs.is_empty() || irqs.len() > usize::from(u8::MAX) {
        return Err(AmlError::InvalidArgument);
    }
    let mut table = Vec::new();
    table
        .try_reserve_exact(irqs.len() * 4)
        .map_err(|_| AmlError::OutOfMemory)?;
    for irq in irqs {
        table.extend_from_slice(&irq.to_le_bytes());
    }
    Descriptor::ExtendedInterrupt {
        flags,
        interrupts: U32List::new(&table),
        source: None,
    }
    .encode()
}

/// Builds an Extended Interrupt descriptor from individual flags.
///
/// # Errors
///
/// See [`extended_interrupt`].
#[allow(clippy::fn_params_excessive_bools)]
pub fn interrupt(
    consumer: bool,
    edge_triggered: bool,
    active_low: bool,
    shared: bool,
    irqs: &[u32],
) -> Result<Vec<u8>, AmlError> {
    let mut flags = InterruptFlags::empty();
    flags.set(InterruptFlags::CONSUMER, consumer);
    flags.set(InterruptFlags::EDGE_TRIGGERED, edge_triggered);
    flags.set(InterruptFlags::ACTIVE_LOW, active_low);
    flags.set(InterruptFlags::SHARED, shared);
    extended_interrupt(flags, irqs)
}

/// Builds a QWord memory address space descriptor (ASL `QWordMemory ()`)
/// covering `length` bytes from `base`, with no translation and byte
/// granularity.
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if `length` is zero or the range
/// wraps past `u64::MAX`.
pub fn qword_memory(
    flags: AddressFlags,
    cacheability: Cacheability,
    read_write: bool,
    base: u64,
    length: u64,
) -> Result<Vec<u8>, AmlError> {
    let max = length
        .checked_sub(1)
        .and_then(|span| base.checked_add(span))
        .ok_or(AmlError::InvalidArgument)?;
    let type_flags = ((cacheability as u8) << 1) | u8::from(read_write);
    Descriptor::Address(AddressSpace {
        width: AddressWidth::QWord,
        resource_type: RESOURCE_TYPE_MEMORY,
        general_flags: flags.bits(),
        type_flags,
        granularity: 0,
        min: base,
        max,
        translation: 0,
        length,
        source: None,
    })
    .encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{DescriptorId, large, validate};

    #[test]
    fn interrupt_layout() {
        let bytes = interrupt(true, true, false, false, &[0x29, 0x2A]).unwrap();
        assert_eq!(
            bytes,
            [
                0x89, 0x0A, 0x00, // large header, 10 payload bytes
                0x03, 0x02, // consumer | edge, two entries
                0x29, 0x00, 0x00, 0x00, // first irq
                0x2A, 0x00, 0x00, 0x00, // second irq
            ]
        );
    }

    #[test]
    fn interrupt_count_limits() {
        assert_eq!(
            extended_interrupt(InterruptFlags::empty(), &[]),
            Err(AmlError::InvalidArgument)
        );
        let many = [0u32; 256];
        assert_eq!(
            extended_interrupt(InterruptFlags::empty(), &many),
            Err(AmlError::InvalidArgument)
        );
        assert!(extended_interrupt(InterruptFlags::empty(), &many[..255]).is_ok());
    }

    #[test]
    fn qword_memory_range() {
        let flags = AddressFlags::CONSUMER | AddressFlags::MIN_FIXED | AddressFlags::MAX_FIXED;
        let bytes = qword_memory(flags, Cacheability::NonCacheable, true, 0x5000_0000, 0x1000).unwrap();
        assert_eq!(bytes.len(), 3 + 43);
        assert_eq!(&bytes[..6], &[0x8A, 0x2B, 0x00, 0x00, 0x0D, 0x01]);

        let mut template = bytes.clone();
        template.extend_from_slice(&crate::resource::END_TAG);
        assert!(validate(&template).is_ok());

        match Descriptor::decode(&bytes).unwrap() {
            Descriptor::Address(space) => {
                assert_eq!(space.min, 0x5000_0000);
                assert_eq!(space.max, 0x5000_0FFF);
                assert_eq!(space.length, 0x1000);
            }
            other => panic!("unexpected descriptor {other:?}"),
        }
        assert_eq!(
            Descriptor::decode(&bytes).unwrap().id(),
            DescriptorId::Large(large::QWORD_ADDRESS)
        );
    }

    #[test]
    fn qword_memory_rejects_empty_or_wrapping() {
        let flags = AddressFlags::empty();
        assert!(qword_memory(flags, Cacheability::Cacheable, false, 0, 0).is_err());
        assert!(qword_memory(flags, Cacheability::Cacheable, false, u64::MAX, 2).is_err());
    }
}
