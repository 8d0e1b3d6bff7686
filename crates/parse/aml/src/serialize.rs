//! AML encoder.
//!
//! Walks the tree in pre-order and writes each object's opcode, its
//! PkgLength (with the width it was decoded or last propagated with), then
//! its fixed and variable arguments; data nodes write their bytes verbatim.
//! The header goes first and the checksum is stored last.

use alloc::vec::Vec;

use hadron_binparse::BinaryWriter;

use crate::error::AmlError;
use crate::pkglen;
use crate::sdt::compute_checksum;
use crate::tree::{AmlTree, NodeId, NodeKind};

impl AmlTree {
    /// Size of the serialized table, header included.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::SizeMismatch`] if a stored PkgLength or the
    /// header length disagrees with the tree.
    pub fn serialized_size(&self) -> Result<usize, AmlError> {
        let size = self.verify_sizes(self.root())?;
        usize::try_from(size).map_err(|_| AmlError::Overflow)
    }

    /// Serializes the table into `out` and stores its checksum.
    ///
    /// Returns the number of bytes written. Call with an empty slice to learn
    /// the size first.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::BufferTooSmall`] with the required size if `out`
    /// is too short, or [`AmlError::SizeMismatch`] for an inconsistent tree.
    pub fn serialize(&self, out: &mut [u8]) -> Result<usize, AmlError> {
        let required = self.serialized_size()?;
        let Some(out) = out.get_mut(..required) else {
            return Err(AmlError::BufferTooSmall { required });
        };

        let mut header = *self.header();
        header.checksum = 0;
        let mut writer = BinaryWriter::new(out);
        writer.write(&header).ok_or(AmlError::BufferTooSmall { required })?;
        for &child in self.node(self.root())?.var_args() {
            self.write_node(&mut writer, child, required)?;
        }
        if writer.remaining() != 0 {
            crate::aml_error!("aml: serialized {} of {required} bytes", writer.position());
            return Err(AmlError::SizeMismatch);
        }

        let table = writer.into_written();
        compute_checksum(table);
        Ok(required)
    }

    /// Serializes the table into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfMemory`] if the buffer cannot be allocated,
    /// or any error of [`serialize`](Self::serialize).
    pub fn serialize_to_vec(&self) -> Result<Vec<u8>, AmlError> {
        let size = self.serialized_size()?;
        let mut out = Vec::new();
        out.try_reserve_exact(size).map_err(|_| AmlError::OutOfMemory)?;
        out.resize(size, 0);
        self.serialize(&mut out)?;
        Ok(out)
    }

    fn write_node(&self, writer: &mut BinaryWriter<'_>, id: NodeId, required: usize) -> Result<(), AmlError> {
        let short = AmlError::BufferTooSmall { required };
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Data(data) => return writer.write_bytes(data.bytes()).ok_or(short),
            NodeKind::Object(object) => {
                let encoding = object.encoding();
                writer.write_u8(encoding.op).ok_or(short)?;
                if encoding.is_ext() {
                    writer.write_u8(encoding.sub_op).ok_or(short)?;
                }
                if object.pkg_len().is_some() {
                    let (bytes, len) = pkglen::encode_with_width(object.pkg_len, usize::from(object.pkg_width))?;
                    writer.write_bytes(&bytes[..len]).ok_or(short)?;
                }
            }
            NodeKind::Root(_) => return Err(AmlError::InvalidArgument),
        }
        for child in node.children() {
            self.write_node(writer, child, required)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::grammar::op;
    use crate::sdt::{SSDT_SIGNATURE, SdtHeader, validate_checksum};

    #[test]
    fn two_pass_protocol() {
        let mut tree = AmlTree::new(SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"SERTEST ", 1));
        let int = tree.new_integer(0x1234).unwrap();
        let root = tree.root();
        tree.insert_tail(root, int).unwrap();

        assert_eq!(tree.serialized_size(), Ok(39));
        assert_eq!(tree.serialize(&mut []), Err(AmlError::BufferTooSmall { required: 39 }));

        let mut out = [0xEEu8; 48];
        assert_eq!(tree.serialize(&mut out), Ok(39));
        assert_eq!(&out[..4], b"SSDT");
        assert_eq!(&out[4..8], &39u32.to_le_bytes());
        assert_eq!(&out[36..39], &[op::WORD_PREFIX, 0x34, 0x12]);
        assert!(validate_checksum(&out[..39]));
        assert_eq!(out[39], 0xEE);
    }

    #[test]
    fn keeps_wide_pkg_length() {
        // Scope (\) {} with a two-byte PkgLength.
        let mut table = std::vec![0u8; 36];
        table.extend_from_slice(&[0x10, 0x44, 0x00, 0x5C, 0x00]);
        table[..4].copy_from_slice(b"SSDT");
        table[4..8].copy_from_slice(&41u32.to_le_bytes());
        compute_checksum(&mut table);

        let tree = AmlTree::parse(&table).unwrap();
        assert_eq!(tree.serialize_to_vec().unwrap(), table);
    }

    #[test]
    fn inconsistent_tree_is_rejected() {
        let mut tree = AmlTree::new(SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"SERTEST ", 1));
        let root = tree.root();
        let one = tree.new_integer(1).unwrap();
        tree.link_var(root, None, one).unwrap();
        assert_eq!(tree.serialized_size(), Err(AmlError::SizeMismatch));
        assert_eq!(tree.serialize_to_vec(), Err(AmlError::SizeMismatch));
    }
}
