//! Definition-block header and checksum utilities.

use hadron_binparse::{AsBytes, FromBytes};

/// Signature of the Differentiated System Description Table.
pub const DSDT_SIGNATURE: [u8; 4] = *b"DSDT";

/// Signature of a Secondary System Description Table.
pub const SSDT_SIGNATURE: [u8; 4] = *b"SSDT";

/// Offset of the checksum byte within an [`SdtHeader`].
pub const CHECKSUM_OFFSET: usize = 9;

/// Standard ACPI System Description Table header.
///
/// This 36-byte header starts every definition block (DSDT, SSDT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, AsBytes)]
#[repr(C, packed)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table, including the header, in bytes.
    pub length: u32,
    /// Revision of the table structure.
    pub revision: u8,
    /// Checksum byte. The entire table, including the header, must sum to zero.
    pub checksum: u8,
    /// OEM-supplied identification string.
    pub oem_id: [u8; 6],
    /// OEM-supplied table identification string.
    pub oem_table_id: [u8; 8],
    /// OEM-supplied revision number.
    pub oem_revision: u32,
    /// Vendor ID of the utility that created the table.
    pub creator_id: u32,
    /// Revision of the utility that created the table.
    pub creator_revision: u32,
}

impl SdtHeader {
    /// The size of an SDT header in bytes.
    pub const SIZE: usize = 36;

    /// Builds a header with the given identity. The length covers the header
    /// alone and the checksum is zero.
    #[must_use]
    pub const fn new(
        signature: [u8; 4],
        revision: u8,
        oem_id: [u8; 6],
        oem_table_id: [u8; 8],
        oem_revision: u32,
    ) -> Self {
        Self {
            signature,
            #[allow(clippy::cast_possible_truncation)]
            length: Self::SIZE as u32,
            revision,
            checksum: 0,
            oem_id,
            oem_table_id,
            oem_revision,
            creator_id: 0,
            creator_revision: 0,
        }
    }

    /// Read an [`SdtHeader`] from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than [`SdtHeader::SIZE`] bytes.
    #[must_use]
    pub fn read_from_bytes(data: &[u8]) -> Option<Self> {
        Self::read_from(data)
    }

    /// Returns the 4-byte signature.
    #[must_use]
    pub const fn signature(&self) -> [u8; 4] {
        self.signature
    }

    /// Returns the total length of this table (header included).
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Returns `true` for DSDT and SSDT signatures.
    #[must_use]
    pub fn is_definition_block(&self) -> bool {
        matches!(self.signature, DSDT_SIGNATURE | SSDT_SIGNATURE)
    }
}

/// Validate the checksum of a byte slice.
///
/// ACPI tables are designed so that the sum of all bytes in the table equals
/// zero (mod 256).
#[must_use]
pub fn validate_checksum(data: &[u8]) -> bool {
    byte_sum(data) == 0
}

/// Rewrites the checksum byte of `table` so that it validates.
///
/// Does nothing if `table` is too short to hold a header.
pub fn compute_checksum(table: &mut [u8]) {
    if table.len() < SdtHeader::SIZE {
        return;
    }
    table[CHECKSUM_OFFSET] = 0;
    table[CHECKSUM_OFFSET] = byte_sum(table).wrapping_neg();
}

fn byte_sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        assert_eq!(core::mem::size_of::<SdtHeader>(), SdtHeader::SIZE);
        let header = SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"TESTTBL ", 1);
        let bytes = header.as_bytes();
        assert_eq!(&bytes[..4], b"SSDT");
        assert_eq!(&bytes[4..8], &36u32.to_le_bytes());
        assert_eq!(SdtHeader::read_from_bytes(bytes), Some(header));
        assert!(header.is_definition_block());
    }

    #[test]
    fn checksum_round_trip() {
        let mut table = [0u8; 40];
        table[..4].copy_from_slice(b"DSDT");
        table[36..].copy_from_slice(&[0x10, 0x22, 0xFE, 0x01]);
        compute_checksum(&mut table);
        assert!(validate_checksum(&table));
        table[37] ^= 1;
        assert!(!validate_checksum(&table));
    }
}
