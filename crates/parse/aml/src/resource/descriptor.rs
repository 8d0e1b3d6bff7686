//! Typed views of individual resource descriptors.
//!
//! [`Descriptor::decode`] borrows from the element bytes; variable-length
//! tails (pin tables, resource source names, vendor data) stay as slices.
//! [`Descriptor::encode`] produces the element bytes again, laying out the
//! variable parts of GPIO, pin-function and serial-bus descriptors in the
//! canonical order (pin table, source name, vendor data).

use alloc::vec::Vec;

use bitflags::bitflags;
use hadron_binparse::BinaryReader;

use super::{DescriptorId, LARGE_HEADER_SIZE, SMALL_HEADER_SIZE, element_size, large, small};
use crate::error::AmlError;

const BAD: AmlError = AmlError::InvalidResourceData;

bitflags! {
    /// Interrupt vector flags of an extended interrupt descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterruptFlags: u8 {
        /// The device consumes the interrupt (clear: produces it).
        const CONSUMER = 1 << 0;
        /// Edge triggered (clear: level triggered).
        const EDGE_TRIGGERED = 1 << 1;
        /// Active low (clear: active high).
        const ACTIVE_LOW = 1 << 2;
        /// Shared (clear: exclusive).
        const SHARED = 1 << 3;
        /// Wake capable.
        const WAKE_CAPABLE = 1 << 4;
    }
}

bitflags! {
    /// Information byte of the memory range descriptors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryFlags: u8 {
        /// The range is writable.
        const WRITABLE = 1 << 0;
    }
}

/// Optional `ResourceSourceIndex` / `ResourceSource` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSource<'a> {
    /// Resource source index.
    pub index: u8,
    /// Null-terminated resource source name, terminator included.
    pub name: &'a [u8],
}

/// Little-endian `u32` list, such as the interrupt table of an extended
/// interrupt descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U32List<'a>(&'a [u8]);

impl<'a> U32List<'a> {
    /// Wraps raw little-endian bytes; a trailing partial entry is ignored.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len() / 4
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.len() < 4
    }

    /// Iterates over the entries.
    pub fn iter(self) -> impl Iterator<Item = u32> + 'a {
        self.0
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    }

    /// Returns entry `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u32> {
        let c = self.0.get(index * 4..index * 4 + 4)?;
        Some(u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    }

    /// Raw little-endian bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// Little-endian `u16` list, such as a GPIO pin table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U16List<'a>(&'a [u8]);

impl<'a> U16List<'a> {
    /// Wraps raw little-endian bytes; a trailing partial entry is ignored.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len() / 2
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.len() < 2
    }

    /// Iterates over the entries.
    pub fn iter(self) -> impl Iterator<Item = u16> + 'a {
        self.0.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]))
    }

    /// Raw little-endian bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// Width of a Word/DWord/QWord address space descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    /// 16-bit fields (large id 0x08).
    Word,
    /// 32-bit fields (large id 0x07).
    DWord,
    /// 64-bit fields (large id 0x0A).
    QWord,
}

impl AddressWidth {
    /// Size of each numeric field in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Word => 2,
            Self::DWord => 4,
            Self::QWord => 8,
        }
    }

    const fn id(self) -> u8 {
        match self {
            Self::Word => large::WORD_ADDRESS,
            Self::DWord => large::DWORD_ADDRESS,
            Self::QWord => large::QWORD_ADDRESS,
        }
    }
}

/// Word, DWord or QWord address space descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace<'a> {
    /// Field width.
    pub width: AddressWidth,
    /// Resource type (0 memory, 1 I/O, 2 bus number, 192+ vendor).
    pub resource_type: u8,
    /// General flags.
    pub general_flags: u8,
    /// Type-specific flags.
    pub type_flags: u8,
    /// Address space granularity.
    pub granularity: u64,
    /// Range minimum.
    pub min: u64,
    /// Range maximum.
    pub max: u64,
    /// Translation offset.
    pub translation: u64,
    /// Range length.
    pub length: u64,
    /// Optional resource source.
    pub source: Option<ResourceSource<'a>>,
}

/// Extended address space descriptor (large id 0x0B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedAddress {
    /// Resource type.
    pub resource_type: u8,
    /// General flags.
    pub general_flags: u8,
    /// Type-specific flags.
    pub type_flags: u8,
    /// Revision id.
    pub revision: u8,
    /// Address space granularity.
    pub granularity: u64,
    /// Range minimum.
    pub min: u64,
    /// Range maximum.
    pub max: u64,
    /// Translation offset.
    pub translation: u64,
    /// Range length.
    pub length: u64,
    /// Type-specific attributes.
    pub attributes: u64,
}

/// GPIO connection descriptor (large id 0x0C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gpio<'a> {
    /// Revision id.
    pub revision: u8,
    /// 0 for interrupt connections, 1 for I/O connections.
    pub connection_type: u8,
    /// General flags.
    pub general_flags: u16,
    /// Interrupt and I/O flags.
    pub io_flags: u16,
    /// Pin pull configuration.
    pub pin_config: u8,
    /// Output drive strength in hundredths of mA.
    pub drive_strength: u16,
    /// Debounce timeout in hundredths of ms.
    pub debounce_timeout: u16,
    /// Resource source index.
    pub source_index: u8,
    /// Pin numbers.
    pub pins: U16List<'a>,
    /// Null-terminated resource source name.
    pub source_name: &'a [u8],
    /// Vendor data.
    pub vendor_data: &'a [u8],
}

/// Pin function descriptor (large id 0x0D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFunction<'a> {
    /// Revision id.
    pub revision: u8,
    /// Flags.
    pub flags: u16,
    /// Pin pull configuration.
    pub pull_config: u8,
    /// Function number.
    pub function: u16,
    /// Resource source index.
    pub source_index: u8,
    /// Pin numbers.
    pub pins: U16List<'a>,
    /// Null-terminated resource source name.
    pub source_name: &'a [u8],
    /// Vendor data.
    pub vendor_data: &'a [u8],
}

/// Generic serial bus connection descriptor (large id 0x0E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialBus<'a> {
    /// Revision id.
    pub revision: u8,
    /// Resource source index.
    pub source_index: u8,
    /// Bus type (1 I2C, 2 SPI, 3 UART, 4 CSI-2).
    pub bus_type: u8,
    /// General flags.
    pub general_flags: u8,
    /// Type-specific flags.
    pub type_flags: u16,
    /// Type-specific revision id.
    pub type_revision: u8,
    /// Type-specific data.
    pub type_data: &'a [u8],
    /// Null-terminated resource source name.
    pub source_name: &'a [u8],
}

/// A decoded resource descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor<'a> {
    /// IRQ descriptor; `info` is absent in the 2-byte form.
    Irq {
        /// Bit mask of IRQ lines 0-15.
        mask: u16,
        /// Interrupt information byte.
        info: Option<u8>,
    },
    /// DMA descriptor.
    Dma {
        /// Bit mask of channels 0-7.
        channel_mask: u8,
        /// Transfer type and bus master flags.
        flags: u8,
    },
    /// Start dependent functions; `priority` is absent in the 0-byte form.
    StartDependentFn {
        /// Priority byte.
        priority: Option<u8>,
    },
    /// End dependent functions.
    EndDependentFn,
    /// I/O port descriptor.
    Io {
        /// Bit 0 set for 16-bit decode.
        info: u8,
        /// Range minimum base address.
        min: u16,
        /// Range maximum base address.
        max: u16,
        /// Base alignment.
        alignment: u8,
        /// Range length.
        length: u8,
    },
    /// Fixed I/O port descriptor.
    FixedIo {
        /// Base address.
        base: u16,
        /// Range length.
        length: u8,
    },
    /// Fixed DMA descriptor.
    FixedDma {
        /// DMA request line.
        request_line: u16,
        /// DMA channel.
        channel: u16,
        /// Transfer width.
        transfer_width: u8,
    },
    /// Small vendor-defined descriptor.
    VendorSmall(&'a [u8]),
    /// End tag.
    EndTag {
        /// Checksum byte, zero when not computed.
        checksum: u8,
    },
    /// 24-bit memory range (values in 256-byte units).
    Memory24 {
        /// Information byte.
        info: MemoryFlags,
        /// Range minimum.
        min: u16,
        /// Range maximum.
        max: u16,
        /// Base alignment.
        alignment: u16,
        /// Range length.
        length: u16,
    },
    /// Generic register descriptor.
    GenericRegister {
        /// Address space id.
        address_space: u8,
        /// Register bit width.
        bit_width: u8,
        /// Register bit offset.
        bit_offset: u8,
        /// Access size.
        access_size: u8,
        /// Register address.
        address: u64,
    },
    /// Large vendor-defined descriptor.
    VendorLarge(&'a [u8]),
    /// 32-bit memory range.
    Memory32 {
        /// Information byte.
        info: MemoryFlags,
        /// Range minimum.
        min: u32,
        /// Range maximum.
        max: u32,
        /// Base alignment.
        alignment: u32,
        /// Range length.
        length: u32,
    },
    /// 32-bit fixed memory range.
    FixedMemory32 {
        /// Information byte.
        info: MemoryFlags,
        /// Base address.
        base: u32,
        /// Range length.
        length: u32,
    },
    /// Word, DWord or QWord address space.
    Address(AddressSpace<'a>),
    /// Extended address space.
    ExtendedAddress(ExtendedAddress),
    /// Extended interrupt descriptor.
    ExtendedInterrupt {
        /// Interrupt vector flags.
        flags: InterruptFlags,
        /// Interrupt numbers.
        interrupts: U32List<'a>,
        /// Optional resource source.
        source: Option<ResourceSource<'a>>,
    },
    /// GPIO connection.
    Gpio(Gpio<'a>),
    /// Pin function.
    PinFunction(PinFunction<'a>),
    /// Generic serial bus connection.
    SerialBus(SerialBus<'a>),
    /// Any other descriptor, kept as its payload bytes.
    Unknown {
        /// Descriptor id.
        id: DescriptorId,
        /// Payload after the header.
        body: &'a [u8],
    },
}

fn read_uint(reader: &mut BinaryReader<'_>, width: usize) -> Option<u64> {
    match width {
        2 => reader.read_u16_le().map(u64::from),
        4 => reader.read_u32_le().map(u64::from),
        8 => reader.read_u64_le(),
        _ => None,
    }
}

fn read_source<'a>(reader: &mut BinaryReader<'a>) -> Option<ResourceSource<'a>> {
    let index = reader.read_u8()?;
    let name = reader.remaining();
    reader.skip(name.len());
    Some(ResourceSource { index, name })
}

fn exact(body: &[u8], len: usize) -> Result<BinaryReader<'_>, AmlError> {
    if body.len() == len {
        Ok(BinaryReader::new(body))
    } else {
        Err(BAD)
    }
}

/// Returns `element[start..end]`, with offsets relative to the descriptor start.
fn region(element: &[u8], start: u16, end: u16) -> Result<&[u8], AmlError> {
    element.get(usize::from(start)..usize::from(end)).ok_or(BAD)
}

impl<'a> Descriptor<'a> {
    /// Decodes the descriptor at the start of `bytes`.
    ///
    /// Bytes after the element are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidResourceData`] if the element is truncated
    /// or its payload length does not fit its id.
    #[allow(clippy::too_many_lines)]
    pub fn decode(bytes: &'a [u8]) -> Result<Self, AmlError> {
        let size = element_size(bytes).ok_or(BAD)?;
        let element = bytes.get(..size).ok_or(BAD)?;
        let id = DescriptorId::from_header(element[0]);
        let header_size = if id.is_small() { SMALL_HEADER_SIZE } else { LARGE_HEADER_SIZE };
        let body = &element[header_size..];

        let descriptor = match id {
            DescriptorId::Small(small::IRQ) => {
                let mut r = BinaryReader::new(body);
                match body.len() {
                    2 | 3 => Self::Irq {
                        mask: r.read_u16_le().ok_or(BAD)?,
                        info: r.read_u8(),
                    },
                    _ => return Err(BAD),
                }
            }
            DescriptorId::Small(small::DMA) => {
                let mut r = exact(body, 2)?;
                Self::Dma {
                    channel_mask: r.read_u8().ok_or(BAD)?,
                    flags: r.read_u8().ok_or(BAD)?,
                }
            }
            DescriptorId::Small(small::START_DEPENDENT_FN) => match body {
                [] => Self::StartDependentFn { priority: None },
                [priority] => Self::StartDependentFn { priority: Some(*priority) },
                _ => return Err(BAD),
            },
            DescriptorId::Small(small::END_DEPENDENT_FN) => {
                exact(body, 0)?;
                Self::EndDependentFn
            }
            DescriptorId::Small(small::IO) => {
                let mut r = exact(body, 7)?;
                Self::Io {
                    info: r.read_u8().ok_or(BAD)?,
                    min: r.read_u16_le().ok_or(BAD)?,
                    max: r.read_u16_le().ok_or(BAD)?,
                    alignment: r.read_u8().ok_or(BAD)?,
                    length: r.read_u8().ok_or(BAD)?,
                }
            }
            DescriptorId::Small(small::FIXED_IO) => {
                let mut r = exact(body, 3)?;
                Self::FixedIo {
                    base: r.read_u16_le().ok_or(BAD)?,
                    length: r.read_u8().ok_or(BAD)?,
                }
            }
            DescriptorId::Small(small::FIXED_DMA) => {
                let mut r = exact(body, 5)?;
                Self::FixedDma {
                    request_line: r.read_u16_le().ok_or(BAD)?,
                    channel: r.read_u16_le().ok_or(BAD)?,
                    transfer_width: r.read_u8().ok_or(BAD)?,
                }
            }
            DescriptorId::Small(small::VENDOR) if !body.is_empty() => Self::VendorSmall(body),
            DescriptorId::Small(small::END_TAG) => {
                let mut r = exact(body, 1)?;
                Self::EndTag { checksum: r.read_u8().ok_or(BAD)? }
            }
            DescriptorId::Large(large::MEMORY24) => {
                let mut r = exact(body, 9)?;
                Self::Memory24 {
                    info: MemoryFlags::from_bits_retain(r.read_u8().ok_or(BAD)?),
                    min: r.read_u16_le().ok_or(BAD)?,
                    max: r.read_u16_le().ok_or(BAD)?,
                    alignment: r.read_u16_le().ok_or(BAD)?,
                    length: r.read_u16_le().ok_or(BAD)?,
                }
            }
            DescriptorId::Large(large::GENERIC_REGISTER) => {
                let mut r = exact(body, 12)?;
                Self::GenericRegister {
                    address_space: r.read_u8().ok_or(BAD)?,
                    bit_width: r.read_u8().ok_or(BAD)?,
                    bit_offset: r.read_u8().ok_or(BAD)?,
                    access_size: r.read_u8().ok_or(BAD)?,
                    address: r.read_u64_le().ok_or(BAD)?,
                }
            }
            DescriptorId::Large(large::VENDOR) => Self::VendorLarge(body),
            DescriptorId::Large(large::MEMORY32) => {
                let mut r = exact(body, 17)?;
                Self::Memory32 {
                    info: MemoryFlags::from_bits_retain(r.read_u8().ok_or(BAD)?),
                    min: r.read_u32_le().ok_or(BAD)?,
                    max: r.read_u32_le().ok_or(BAD)?,
                    alignment: r.read_u32_le().ok_or(BAD)?,
                    length: r.read_u32_le().ok_or(BAD)?,
                }
            }
            DescriptorId::Large(large::FIXED_MEMORY32) => {
                let mut r = exact(body, 9)?;
                Self::FixedMemory32 {
                    info: MemoryFlags::from_bits_retain(r.read_u8().ok_or(BAD)?),
                    base: r.read_u32_le().ok_or(BAD)?,
                    length: r.read_u32_le().ok_or(BAD)?,
                }
            }
            DescriptorId::Large(
                id @ (large::WORD_ADDRESS | large::DWORD_ADDRESS | large::QWORD_ADDRESS),
            ) => {
                let width = match id {
                    large::WORD_ADDRESS => AddressWidth::Word,
                    large::DWORD_ADDRESS => AddressWidth::DWord,
                    _ => AddressWidth::QWord,
                };
                Self::Address(decode_address(body, width)?)
            }
            DescriptorId::Large(large::EXTENDED_ADDRESS) => {
                let mut r = exact(body, 53)?;
                let resource_type = r.read_u8().ok_or(BAD)?;
                let general_flags = r.read_u8().ok_or(BAD)?;
                let type_flags = r.read_u8().ok_or(BAD)?;
                let revision = r.read_u8().ok_or(BAD)?;
                r.skip(1);
                Self::ExtendedAddress(ExtendedAddress {
                    resource_type,
                    general_flags,
                    type_flags,
                    revision,
                    granularity: r.read_u64_le().ok_or(BAD)?,
                    min: r.read_u64_le().ok_or(BAD)?,
                    max: r.read_u64_le().ok_or(BAD)?,
                    translation: r.read_u64_le().ok_or(BAD)?,
                    length: r.read_u64_le().ok_or(BAD)?,
                    attributes: r.read_u64_le().ok_or(BAD)?,
                })
            }
            DescriptorId::Large(large::EXTENDED_INTERRUPT) => {
                let mut r = BinaryReader::new(body);
                let flags = InterruptFlags::from_bits_retain(r.read_u8().ok_or(BAD)?);
                let count = usize::from(r.read_u8().ok_or(BAD)?);
                if count == 0 {
                    return Err(BAD);
                }
                let interrupts = U32List(r.read_bytes(count * 4).ok_or(BAD)?);
                let source = if r.is_at_end() { None } else { read_source(&mut r) };
                Self::ExtendedInterrupt {
                    flags,
                    interrupts,
                    source,
                }
            }
            DescriptorId::Large(large::GPIO) => Self::Gpio(decode_gpio(element)?),
            DescriptorId::Large(large::PIN_FUNCTION) => {
                Self::PinFunction(decode_pin_function(element)?)
            }
            DescriptorId::Large(large::SERIAL_BUS) => Self::SerialBus(decode_serial_bus(body)?),
            id => Self::Unknown { id, body },
        };
        Ok(descriptor)
    }

    /// Returns the descriptor id.
    #[must_use]
    pub const fn id(&self) -> DescriptorId {
        match self {
            Self::Irq { .. } => DescriptorId::Small(small::IRQ),
            Self::Dma { .. } => DescriptorId::Small(small::DMA),
            Self::StartDependentFn { .. } => DescriptorId::Small(small::START_DEPENDENT_FN),
            Self::EndDependentFn => DescriptorId::Small(small::END_DEPENDENT_FN),
            Self::Io { .. } => DescriptorId::Small(small::IO),
            Self::FixedIo { .. } => DescriptorId::Small(small::FIXED_IO),
            Self::FixedDma { .. } => DescriptorId::Small(small::FIXED_DMA),
            Self::VendorSmall(_) => DescriptorId::Small(small::VENDOR),
            Self::EndTag { .. } => DescriptorId::Small(small::END_TAG),
            Self::Memory24 { .. } => DescriptorId::Large(large::MEMORY24),
            Self::GenericRegister { .. } => DescriptorId::Large(large::GENERIC_REGISTER),
            Self::VendorLarge(_) => DescriptorId::Large(large::VENDOR),
            Self::Memory32 { .. } => DescriptorId::Large(large::MEMORY32),
            Self::FixedMemory32 { .. } => DescriptorId::Large(large::FIXED_MEMORY32),
            Self::Address(space) => DescriptorId::Large(space.width.id()),
            Self::ExtendedAddress(_) => DescriptorId::Large(large::EXTENDED_ADDRESS),
            Self::ExtendedInterrupt { .. } => DescriptorId::Large(large::EXTENDED_INTERRUPT),
            Self::Gpio(_) => DescriptorId::Large(large::GPIO),
            Self::PinFunction(_) => DescriptorId::Large(large::PIN_FUNCTION),
            Self::SerialBus(_) => DescriptorId::Large(large::SERIAL_BUS),
            Self::Unknown { id, .. } => *id,
        }
    }

    /// Encodes the descriptor, header included.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidResourceData`] if a payload does not fit its
    /// length field (more than 7 bytes for a small descriptor, more than
    /// 65535 for a large one), or if an address field does not fit the
    /// descriptor width.
    #[allow(clippy::too_many_lines)]
    pub fn encode(&self) -> Result<Vec<u8>, AmlError> {
        let mut body = Vec::new();
        match *self {
            Self::Irq { mask, info } => {
                body.extend_from_slice(&mask.to_le_bytes());
                body.extend(info);
            }
            Self::Dma { channel_mask, flags } => body.extend_from_slice(&[channel_mask, flags]),
            Self::StartDependentFn { priority } => body.extend(priority),
            Self::EndDependentFn => {}
            Self::Io {
                info,
                min,
                max,
                alignment,
                length,
            } => {
                body.push(info);
                body.extend_from_slice(&min.to_le_bytes());
                body.extend_from_slice(&max.to_le_bytes());
                body.extend_from_slice(&[alignment, length]);
            }
            Self::FixedIo { base, length } => {
                body.extend_from_slice(&base.to_le_bytes());
                body.push(length);
            }
            Self::FixedDma {
                request_line,
                channel,
                transfer_width,
            } => {
                body.extend_from_slice(&request_line.to_le_bytes());
                body.extend_from_slice(&channel.to_le_bytes());
                body.push(transfer_width);
            }
            Self::VendorSmall(data) | Self::VendorLarge(data) => body.extend_from_slice(data),
            Self::EndTag { checksum } => body.push(checksum),
            Self::Memory24 {
                info,
                min,
                max,
                alignment,
                length,
            } => {
                body.push(info.bits());
                for value in [min, max, alignment, length] {
                    body.extend_from_slice(&value.to_le_bytes());
                }
            }
            Self::GenericRegister {
                address_space,
                bit_width,
                bit_offset,
                access_size,
                address,
            } => {
                body.extend_from_slice(&[address_space, bit_width, bit_offset, access_size]);
                body.extend_from_slice(&address.to_le_bytes());
            }
            Self::Memory32 {
                info,
                min,
                max,
                alignment,
                length,
            } => {
                body.push(info.bits());
                for value in [min, max, alignment, length] {
                    body.extend_from_slice(&value.to_le_bytes());
                }
            }
            Self::FixedMemory32 { info, base, length } => {
                body.push(info.bits());
                body.extend_from_slice(&base.to_le_bytes());
                body.extend_from_slice(&length.to_le_bytes());
            }
            Self::Address(ref space) => encode_address(space, &mut body)?,
            Self::ExtendedAddress(ref ext) => {
                body.extend_from_slice(&[
                    ext.resource_type,
                    ext.general_flags,
                    ext.type_flags,
                    ext.revision,
                    0,
                ]);
                for value in [
                    ext.granularity,
                    ext.min,
                    ext.max,
                    ext.translation,
                    ext.length,
                    ext.attributes,
                ] {
                    body.extend_from_slice(&value.to_le_bytes());
                }
            }
            Self::ExtendedInterrupt {
                flags,
                interrupts,
                source,
            } => {
                let count = u8::try_from(interrupts.len()).map_err(|_| BAD)?;
                if count == 0 {
                    return Err(BAD);
                }
                body.extend_from_slice(&[flags.bits(), count]);
                body.extend_from_slice(interrupts.as_bytes());
                if let Some(source) = source {
                    body.push(source.index);
                    body.extend_from_slice(source.name);
                }
            }
            Self::Gpio(ref gpio) => encode_gpio(gpio, &mut body)?,
            Self::PinFunction(ref function) => encode_pin_function(function, &mut body)?,
            Self::SerialBus(ref bus) => {
                let type_len = u16::try_from(bus.type_data.len()).map_err(|_| BAD)?;
                body.extend_from_slice(&[
                    bus.revision,
                    bus.source_index,
                    bus.bus_type,
                    bus.general_flags,
                ]);
                body.extend_from_slice(&bus.type_flags.to_le_bytes());
                body.push(bus.type_revision);
                body.extend_from_slice(&type_len.to_le_bytes());
                body.extend_from_slice(bus.type_data);
                body.extend_from_slice(bus.source_name);
            }
            Self::Unknown { body: data, .. } => body.extend_from_slice(data),
        }
        frame(self.id(), &body)
    }
}

/// Prepends the header for `id` to `body`.
///
/// # Errors
///
/// Returns [`AmlError::InvalidResourceData`] if `body` is too long for the
/// header's length field.
pub fn frame(id: DescriptorId, body: &[u8]) -> Result<Vec<u8>, AmlError> {
    let mut out = Vec::new();
    match id {
        DescriptorId::Small(id) => {
            let len = u8::try_from(body.len()).ok().filter(|&len| len <= 7).ok_or(BAD)?;
            out.reserve_exact(SMALL_HEADER_SIZE + body.len());
            out.push(super::small_header(id, len));
        }
        DescriptorId::Large(id) => {
            let len = u16::try_from(body.len()).map_err(|_| BAD)?;
            out.reserve_exact(LARGE_HEADER_SIZE + body.len());
            out.push(super::large_header(id));
            out.extend_from_slice(&len.to_le_bytes());
        }
    }
    out.extend_from_slice(body);
    Ok(out)
}

fn decode_address(body: &[u8], width: AddressWidth) -> Result<AddressSpace<'_>, AmlError> {
    let w = width.bytes();
    if body.len() < 3 + 5 * w {
        return Err(BAD);
    }
    let mut r = BinaryReader::new(body);
    let resource_type = r.read_u8().ok_or(BAD)?;
    let general_flags = r.read_u8().ok_or(BAD)?;
    let type_flags = r.read_u8().ok_or(BAD)?;
    let granularity = read_uint(&mut r, w).ok_or(BAD)?;
    let min = read_uint(&mut r, w).ok_or(BAD)?;
    let max = read_uint(&mut r, w).ok_or(BAD)?;
    let translation = read_uint(&mut r, w).ok_or(BAD)?;
    let length = read_uint(&mut r, w).ok_or(BAD)?;
    let source = if r.is_at_end() { None } else { read_source(&mut r) };
    Ok(AddressSpace {
        width,
        resource_type,
        general_flags,
        type_flags,
        granularity,
        min,
        max,
        translation,
        length,
        source,
    })
}

fn encode_address(space: &AddressSpace<'_>, body: &mut Vec<u8>) -> Result<(), AmlError> {
    body.extend_from_slice(&[space.resource_type, space.general_flags, space.type_flags]);
    let fields = [
        space.granularity,
        space.min,
        space.max,
        space.translation,
        space.length,
    ];
    for value in fields {
        match space.width {
            AddressWidth::Word => {
                let v = u16::try_from(value).map_err(|_| BAD)?;
                body.extend_from_slice(&v.to_le_bytes());
            }
            AddressWidth::DWord => {
                let v = u32::try_from(value).map_err(|_| BAD)?;
                body.extend_from_slice(&v.to_le_bytes());
            }
            AddressWidth::QWord => body.extend_from_slice(&value.to_le_bytes()),
        }
    }
    if let Some(source) = space.source {
        body.push(source.index);
        body.extend_from_slice(source.name);
    }
    Ok(())
}

// ─── Offset-based descriptors ──────────────────────────────────────────────
//
// GPIO and pin-function descriptors locate their variable parts with offsets
// measured from the first byte of the descriptor.

const GPIO_FIXED_SIZE: u16 = 23;
const PIN_FUNCTION_FIXED_SIZE: u16 = 18;

fn decode_gpio(element: &[u8]) -> Result<Gpio<'_>, AmlError> {
    if element.len() < usize::from(GPIO_FIXED_SIZE) {
        return Err(BAD);
    }
    let mut r = BinaryReader::new(&element[LARGE_HEADER_SIZE..]);
    let revision = r.read_u8().ok_or(BAD)?;
    let connection_type = r.read_u8().ok_or(BAD)?;
    let general_flags = r.read_u16_le().ok_or(BAD)?;
    let io_flags = r.read_u16_le().ok_or(BAD)?;
    let pin_config = r.read_u8().ok_or(BAD)?;
    let drive_strength = r.read_u16_le().ok_or(BAD)?;
    let debounce_timeout = r.read_u16_le().ok_or(BAD)?;
    let pin_offset = r.read_u16_le().ok_or(BAD)?;
    let source_index = r.read_u8().ok_or(BAD)?;
    let name_offset = r.read_u16_le().ok_or(BAD)?;
    let vendor_offset = r.read_u16_le().ok_or(BAD)?;
    let vendor_len = r.read_u16_le().ok_or(BAD)?;
    let (pins, source_name, vendor_data) =
        split_tail(element, pin_offset, name_offset, vendor_offset, vendor_len)?;
    Ok(Gpio {
        revision,
        connection_type,
        general_flags,
        io_flags,
        pin_config,
        drive_strength,
        debounce_timeout,
        source_index,
        pins,
        source_name,
        vendor_data,
    })
}

fn decode_pin_function(element: &[u8]) -> Result<PinFunction<'_>, AmlError> {
    if element.len() < usize::from(PIN_FUNCTION_FIXED_SIZE) {
        return Err(BAD);
    }
    let mut r = BinaryReader::new(&element[LARGE_HEADER_SIZE..]);
    let revision = r.read_u8().ok_or(BAD)?;
    let flags = r.read_u16_le().ok_or(BAD)?;
    let pull_config = r.read_u8().ok_or(BAD)?;
    let function = r.read_u16_le().ok_or(BAD)?;
    let pin_offset = r.read_u16_le().ok_or(BAD)?;
    let source_index = r.read_u8().ok_or(BAD)?;
    let name_offset = r.read_u16_le().ok_or(BAD)?;
    let vendor_offset = r.read_u16_le().ok_or(BAD)?;
    let vendor_len = r.read_u16_le().ok_or(BAD)?;
    let (pins, source_name, vendor_data) =
        split_tail(element, pin_offset, name_offset, vendor_offset, vendor_len)?;
    Ok(PinFunction {
        revision,
        flags,
        pull_config,
        function,
        source_index,
        pins,
        source_name,
        vendor_data,
    })
}

/// Splits the pin table, source name and vendor data of an offset-based
/// descriptor.
fn split_tail(
    element: &[u8],
    pin_offset: u16,
    name_offset: u16,
    vendor_offset: u16,
    vendor_len: u16,
) -> Result<(U16List<'_>, &[u8], &[u8]), AmlError> {
    let total = u16::try_from(element.len()).map_err(|_| BAD)?;
    let name_end = if vendor_len == 0 { total } else { vendor_offset };
    let vendor_end = vendor_offset.checked_add(vendor_len).ok_or(BAD)?;
    let pins = region(element, pin_offset, name_offset)?;
    if pins.len() % 2 != 0 {
        return Err(BAD);
    }
    let source_name = region(element, name_offset, name_end)?;
    let vendor_data = if vendor_len == 0 {
        &[][..]
    } else {
        region(element, vendor_offset, vendor_end)?
    };
    Ok((U16List(pins), source_name, vendor_data))
}

/// Returns `(pin_offset, name_offset, vendor_offset)` for a canonical layout
/// after a fixed part of `fixed` bytes.
fn tail_offsets(
    fixed: u16,
    pins: U16List<'_>,
    source_name: &[u8],
) -> Result<(u16, u16, u16), AmlError> {
    let pin_offset = fixed;
    let pins_len = u16::try_from(pins.as_bytes().len()).map_err(|_| BAD)?;
    let name_offset = pin_offset.checked_add(pins_len).ok_or(BAD)?;
    let name_len = u16::try_from(source_name.len()).map_err(|_| BAD)?;
    let vendor_offset = name_offset.checked_add(name_len).ok_or(BAD)?;
    Ok((pin_offset, name_offset, vendor_offset))
}

fn encode_gpio(gpio: &Gpio<'_>, body: &mut Vec<u8>) -> Result<(), AmlError> {
    let (pin_offset, name_offset, vendor_offset) =
        tail_offsets(GPIO_FIXED_SIZE, gpio.pins, gpio.source_name)?;
    let vendor_len = u16::try_from(gpio.vendor_data.len()).map_err(|_| BAD)?;
    body.extend_from_slice(&[gpio.revision, gpio.connection_type]);
    body.extend_from_slice(&gpio.general_flags.to_le_bytes());
    body.extend_from_slice(&gpio.io_flags.to_le_bytes());
    body.push(gpio.pin_config);
    body.extend_from_slice(&gpio.drive_strength.to_le_bytes());
    body.extend_from_slice(&gpio.debounce_timeout.to_le_bytes());
    body.extend_from_slice(&pin_offset.to_le_bytes());
    body.push(gpio.source_index);
    body.extend_from_slice(&name_offset.to_le_bytes());
    body.extend_from_slice(&vendor_offset.to_le_bytes());
    body.extend_from_slice(&vendor_len.to_le_bytes());
    body.extend_from_slice(gpio.pins.as_bytes());
    body.extend_from_slice(gpio.source_name);
    body.extend_from_slice(gpio.vendor_data);
    Ok(())
}

fn encode_pin_function(function: &PinFunction<'_>, body: &mut Vec<u8>) -> Result<(), AmlError> {
    let (pin_offset, name_offset, vendor_offset) =
        tail_offsets(PIN_FUNCTION_FIXED_SIZE, function.pins, function.source_name)?;
    let vendor_len = u16::try_from(function.vendor_data.len()).map_err(|_| BAD)?;
    body.push(function.revision);
    body.extend_from_slice(&function.flags.to_le_bytes());
    body.push(function.pull_config);
    body.extend_from_slice(&function.function.to_le_bytes());
    body.extend_from_slice(&pin_offset.to_le_bytes());
    body.push(function.source_index);
    body.extend_from_slice(&name_offset.to_le_bytes());
    body.extend_from_slice(&vendor_offset.to_le_bytes());
    body.extend_from_slice(&vendor_len.to_le_bytes());
    body.extend_from_slice(function.pins.as_bytes());
    body.extend_from_slice(function.source_name);
    body.extend_from_slice(function.vendor_data);
    Ok(())
}

fn decode_serial_bus(body: &[u8]) -> Result<SerialBus<'_>, AmlError> {
    let mut r = BinaryReader::new(body);
    let revision = r.read_u8().ok_or(BAD)?;
    let source_index = r.read_u8().ok_or(BAD)?;
    let bus_type = r.read_u8().ok_or(BAD)?;
    let general_flags = r.read_u8().ok_or(BAD)?;
    let type_flags = r.read_u16_le().ok_or(BAD)?;
    let type_revision = r.read_u8().ok_or(BAD)?;
    let type_len = r.read_u16_le().ok_or(BAD)?;
    let type_data = r.read_bytes(usize::from(type_len)).ok_or(BAD)?;
    let source_name = r.remaining();
    Ok(SerialBus {
        revision,
        source_index,
        bus_type,
        general_flags,
        type_flags,
        type_revision,
        type_data,
        source_name,
    })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec;
    use std::vec::Vec;

    #[test]
    fn decode_io() {
        // I/O descriptor: tag 0x47, decode=1, min=0x1000, max=0x1020, align=0x10, len=4
        let data = [0x47, 0x01, 0x00, 0x10, 0x20, 0x10, 0x10, 0x04];
        let io = Descriptor::decode(&data).unwrap();
        assert_eq!(
            io,
            Descriptor::Io {
                info: 1,
                min: 0x1000,
                max: 0x1020,
                alignment: 0x10,
                length: 4,
            }
        );
        assert_eq!(io.encode().unwrap(), data);
    }

    #[test]
    fn decode_irq_forms() {
        // IRQ without flags (0x22) and with flags (0x23), IRQ 4.
        let short = Descriptor::decode(&[0x22, 0x10, 0x00]).unwrap();
        assert_eq!(short, Descriptor::Irq { mask: 0x10, info: None });
        let long = Descriptor::decode(&[0x23, 0x10, 0x00, 0x09]).unwrap();
        assert_eq!(long, Descriptor::Irq { mask: 0x10, info: Some(0x09) });
        assert_eq!(long.encode().unwrap(), [0x23, 0x10, 0x00, 0x09]);
        // Payload length 1 is not an IRQ descriptor.
        assert_eq!(Descriptor::decode(&[0x21, 0x10]), Err(AmlError::InvalidResourceData));
    }

    #[test]
    fn decode_extended_interrupt() {
        let data = [
            0x89, 0x0A, 0x00, // tag + length 10
            0x03, // consumer, edge triggered
            0x02, // two interrupts
            0x20, 0x00, 0x00, 0x00, // GSI 32
            0x21, 0x00, 0x00, 0x00, // GSI 33
        ];
        let desc = Descriptor::decode(&data).unwrap();
        let Descriptor::ExtendedInterrupt {
            flags,
            interrupts,
            source,
        } = desc
        else {
            panic!("expected an extended interrupt, got {desc:?}");
        };
        assert_eq!(flags, InterruptFlags::CONSUMER | InterruptFlags::EDGE_TRIGGERED);
        assert_eq!(interrupts.iter().collect::<Vec<_>>(), vec![32, 33]);
        assert_eq!(source, None);
        assert_eq!(desc.encode().unwrap(), data);
    }

    #[test]
    fn decode_qword_memory() {
        let mut data = vec![0x8A, 0x2B, 0x00, 0x00, 0x0C, 0x01];
        for value in [0u64, 0x1_0000_0000, 0x1_0000_0FFF, 0, 0x1000] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        let desc = Descriptor::decode(&data).unwrap();
        let Descriptor::Address(space) = desc else {
            panic!("expected an address space, got {desc:?}");
        };
        assert_eq!(space.width, AddressWidth::QWord);
        assert_eq!(space.min, 0x1_0000_0000);
        assert_eq!(space.length, 0x1000);
        assert_eq!(desc.encode().unwrap(), data);
    }

    #[test]
    fn dword_address_rejects_wide_values() {
        let space = AddressSpace {
            width: AddressWidth::DWord,
            resource_type: 0,
            general_flags: 0,
            type_flags: 0,
            granularity: 0,
            min: 1 << 40,
            max: 0,
            translation: 0,
            length: 0,
            source: None,
        };
        assert_eq!(
            Descriptor::Address(space).encode(),
            Err(AmlError::InvalidResourceData)
        );
    }

    #[test]
    fn gpio_round_trip() {
        let gpio = Gpio {
            revision: 1,
            connection_type: 0,
            general_flags: 0,
            io_flags: 0x0001,
            pin_config: 0,
            drive_strength: 0,
            debounce_timeout: 0,
            source_index: 0,
            pins: U16List(&[0x05, 0x00, 0x06, 0x00]),
            source_name: b"\\_SB.GPI0\0",
            vendor_data: &[],
        };
        let bytes = Descriptor::Gpio(gpio).encode().unwrap();
        assert_eq!(bytes.len(), 23 + 4 + 10);
        assert_eq!(Descriptor::decode(&bytes).unwrap(), Descriptor::Gpio(gpio));
    }

    #[test]
    fn unknown_ids_are_kept() {
        // Large id 0x7F with two payload bytes.
        let data = [0xFF, 0x02, 0x00, 0xAA, 0xBB];
        let desc = Descriptor::decode(&data).unwrap();
        assert_eq!(
            desc,
            Descriptor::Unknown {
                id: DescriptorId::Large(0x7F),
                body: &[0xAA, 0xBB],
            }
        );
        assert_eq!(desc.encode().unwrap(), data);
    }

    #[test]
    fn frame_limits() {
        assert_eq!(
            frame(DescriptorId::Small(small::VENDOR), &[0; 8]),
            Err(AmlError::InvalidResourceData)
        );
        assert_eq!(frame(DescriptorId::Small(small::END_TAG), &[0]).unwrap(), [0x79, 0x00]);
    }
}
