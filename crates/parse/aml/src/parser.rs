//! AML decoder.
//!
//! Builds an [`AmlTree`] from a DSDT or SSDT, driven by the grammar table.
//! Each statement is decoded recursively: the opcode selects a grammar
//! entry, the PkgLength (if any) fences the rest of the statement, fixed
//! arguments are decoded in grammar order, then the child statements or the
//! byte list.
//!
//! Every byte of the stream ends up in the tree, so an unknown opcode is a
//! hard error rather than something to skip.

use hadron_binparse::BinaryReader;

use crate::error::AmlError;
use crate::grammar::{self, ArgFormat, OpAttributes, OpEncoding, op};
use crate::name::NameString;
use crate::sdt::{SdtHeader, validate_checksum};
use crate::tree::{AmlTree, DataType, NodeId, NodeKind};
use crate::{field, pkglen, resource};

/// Decoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Split `Buffer` byte lists that form a valid resource template into one
    /// resource-data node per descriptor.
    pub split_resource_data: bool,
    /// Split the byte lists of `Field`, `IndexField` and `BankField` into
    /// one node per field unit.
    pub split_field_list: bool,
    /// Deepest statement nesting accepted.
    pub max_depth: u32,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            split_resource_data: true,
            split_field_list: true,
            max_depth: 128,
        }
    }
}

impl AmlTree {
    /// Decodes a definition block with the default [`ParseConfig`].
    ///
    /// # Errors
    ///
    /// See [`parse_with`](Self::parse_with).
    pub fn parse(table: &[u8]) -> Result<Self, AmlError> {
        Self::parse_with(table, &ParseConfig::default())
    }

    /// Decodes a definition block.
    ///
    /// Bytes past the header length are ignored. A wrong checksum is logged
    /// and otherwise tolerated; the serializer recomputes it.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidHeader`] if the table is not a DSDT or
    /// SSDT or its length is inconsistent, and a decode error for malformed
    /// AML. No partial tree is returned.
    pub fn parse_with(table: &[u8], config: &ParseConfig) -> Result<Self, AmlError> {
        let header = SdtHeader::read_from_bytes(table).ok_or(AmlError::InvalidHeader)?;
        if !header.is_definition_block() {
            return Err(AmlError::InvalidHeader);
        }
        let length = header.length() as usize;
        if length < SdtHeader::SIZE || length > table.len() {
            crate::aml_error!(
                "aml: header length {length:#x} does not fit a {:#x}-byte table",
                table.len()
            );
            return Err(AmlError::InvalidHeader);
        }
        let table = &table[..length];
        if !validate_checksum(table) {
            crate::aml_warn!("aml: {} checksum mismatch", header.signature().escape_ascii());
        }

        let mut tree = Self::with_header(header);
        let root = tree.root();
        let mut reader = BinaryReader::new(&table[SdtHeader::SIZE..]);
        while !reader.is_at_end() {
            let offset = SdtHeader::SIZE + reader.position();
            let node = tree.decode_term(&mut reader, config, 0).inspect_err(|err| {
                crate::aml_error!("aml: decode failed in statement at {offset:#x}: {err}");
            })?;
            tree.link_var(root, None, node)?;
        }
        crate::aml_info!(
            "aml: decoded {} ({length} bytes, {} nodes)",
            tree.header().signature().escape_ascii(),
            tree.node_count()
        );
        Ok(tree)
    }

    /// Decodes exactly one AML statement into a detached subtree.
    ///
    /// # Errors
    ///
    /// Returns a decode error for malformed AML, or
    /// [`AmlError::InvalidArgument`] if bytes remain after the statement.
    pub fn decode_statement(&mut self, bytes: &[u8]) -> Result<NodeId, AmlError> {
        let mut reader = BinaryReader::new(bytes);
        let node = self.decode_term(&mut reader, &ParseConfig::default(), 0)?;
        if !reader.is_at_end() {
            self.free_subtree(node);
            return Err(AmlError::InvalidArgument);
        }
        Ok(node)
    }

    /// Decodes the statement or NameString under the reader.
    fn decode_term(
        &mut self,
        reader: &mut BinaryReader<'_>,
        config: &ParseConfig,
        depth: u32,
    ) -> Result<NodeId, AmlError> {
        if depth >= config.max_depth {
            crate::aml_warn!("aml: statements nested deeper than {}", config.max_depth);
            return Err(AmlError::Unsupported);
        }
        let lead = reader.peek().ok_or(AmlError::UnexpectedEnd)?;
        if grammar::is_name_char(lead) {
            return self.decode_name(reader);
        }

        let encoding = grammar::lookup_stream(reader.remaining()).ok_or_else(|| {
            let sub_op = if lead == op::EXT_OP {
                reader.remaining().get(1).copied().unwrap_or(0)
            } else {
                0
            };
            AmlError::UnknownOpcode { op: lead, sub_op }
        })?;
        reader.skip(encoding.opcode_len());
        crate::aml_trace!("aml: {:>width$}{}", "", encoding.name, width = depth as usize * 2);

        let node = self.alloc_object(encoding)?;
        match self.decode_object(node, encoding, reader, config, depth) {
            Ok(()) => Ok(node),
            Err(err) => {
                self.free_subtree(node);
                Err(err)
            }
        }
    }

    fn decode_object(
        &mut self,
        node: NodeId,
        encoding: &'static OpEncoding,
        reader: &mut BinaryReader<'_>,
        config: &ParseConfig,
        depth: u32,
    ) -> Result<(), AmlError> {
        if !encoding.has(OpAttributes::HAS_PKG_LENGTH) {
            return self.decode_args(node, encoding, reader, config, depth);
        }

        let (value, width) = pkglen::read(reader)?;
        let body_len = (value as usize).checked_sub(width).ok_or(AmlError::InvalidPkgLength)?;
        let body = reader.read_bytes(body_len).ok_or_else(|| {
            crate::aml_error!(
                "aml: {} PkgLength {value:#x} runs past its enclosing scope",
                encoding.name
            );
            AmlError::PkgLengthOverrun
        })?;
        if let NodeKind::Object(object) = &mut self.node_mut(node)?.kind {
            object.pkg_len = value;
            #[allow(clippy::cast_possible_truncation)]
            let width = width as u8;
            object.pkg_width = width;
        }

        let mut fenced = BinaryReader::new(body);
        self.decode_args(node, encoding, &mut fenced, config, depth)?;
        if !fenced.is_at_end() {
            return Err(AmlError::PkgLengthOverrun);
        }
        Ok(())
    }

    /// Decodes fixed arguments, then the variable list.
    fn decode_args(
        &mut self,
        node: NodeId,
        encoding: &'static OpEncoding,
        reader: &mut BinaryReader<'_>,
        config: &ParseConfig,
        depth: u32,
    ) -> Result<(), AmlError> {
        for (index, &format) in encoding.fixed_formats().iter().enumerate() {
            if reader.is_at_end() {
                break;
            }
            let arg = match format {
                ArgFormat::None => break,
                ArgFormat::Uint8 | ArgFormat::Uint16 | ArgFormat::Uint32 | ArgFormat::Uint64 => {
                    let width = format.int_width().unwrap_or(1);
                    let bytes = reader.read_bytes(width).ok_or(AmlError::UnexpectedEnd)?;
                    self.alloc_data(DataType::Uint, bytes)?
                }
                ArgFormat::Name => self.decode_name(reader)?,
                ArgFormat::String => {
                    let rest = reader.remaining();
                    let nul = rest.iter().position(|&b| b == 0).ok_or(AmlError::UnexpectedEnd)?;
                    let bytes = reader.read_bytes(nul + 1).ok_or(AmlError::UnexpectedEnd)?;
                    self.alloc_data(DataType::String, bytes)?
                }
                ArgFormat::Object => self.decode_term(reader, config, depth + 1)?,
            };
            if let Err(err) = self.link_fixed(node, index, arg) {
                self.free_subtree(arg);
                return Err(err);
            }
        }

        if encoding.has(OpAttributes::HAS_CHILD_OBJ) {
            while !reader.is_at_end() {
                let child = self.decode_term(reader, config, depth + 1)?;
                if let Err(err) = self.link_var(node, None, child) {
                    self.free_subtree(child);
                    return Err(err);
                }
            }
        }

        if encoding.has(OpAttributes::HAS_BYTE_LIST) {
            let list = reader.remaining();
            reader.skip(list.len());
            self.decode_byte_list(node, encoding, list, config)?;
        }
        Ok(())
    }

    /// Splits a byte list into resource-data or field-element nodes when it
    /// parses as such, or keeps it as one raw node.
    fn decode_byte_list(
        &mut self,
        node: NodeId,
        encoding: &'static OpEncoding,
        list: &[u8],
        config: &ParseConfig,
    ) -> Result<(), AmlError> {
        if list.is_empty() {
            return Ok(());
        }

        if encoding.op == op::BUFFER && config.split_resource_data {
            if resource::is_resource_template(list) {
                for element in resource::elements(list) {
                    self.link_new_data(node, DataType::ResourceData, element)?;
                }
                return Ok(());
            }
            crate::aml_debug!("aml: {}-byte buffer is not a resource template", list.len());
        }

        let is_field = encoding.is_ext()
            && matches!(encoding.sub_op, op::ext::FIELD | op::ext::INDEX_FIELD | op::ext::BANK_FIELD);
        if is_field && config.split_field_list {
            if let Some(elements) = field::split(list) {
                for element in elements {
                    self.link_new_data(node, DataType::FieldElement, element)?;
                }
                return Ok(());
            }
            crate::aml_debug!("aml: {} field list kept as raw bytes", encoding.name);
        }

        self.link_new_data(node, DataType::Raw, list)
    }

    fn link_new_data(&mut self, parent: NodeId, data_type: DataType, bytes: &[u8]) -> Result<(), AmlError> {
        let data = self.alloc_data(data_type, bytes)?;
        if let Err(err) = self.link_var(parent, None, data) {
            self.free_subtree(data);
            return Err(err);
        }
        Ok(())
    }

    fn decode_name(&mut self, reader: &mut BinaryReader<'_>) -> Result<NodeId, AmlError> {
        let len = NameString::parse(reader.remaining())?.encoded_len();
        let bytes = reader.read_bytes(len).ok_or(AmlError::UnexpectedEnd)?;
        self.alloc_data(DataType::NameString, bytes)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::sdt::{CHECKSUM_OFFSET, SSDT_SIGNATURE, compute_checksum};

    fn table(body: &[u8]) -> Vec<u8> {
        let header = SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"PARSER  ", 1);
        let mut out = AmlTree::new(header).serialize_to_vec().unwrap();
        out.extend_from_slice(body);
        let length = u32::try_from(out.len()).unwrap();
        out[4..8].copy_from_slice(&length.to_le_bytes());
        out[CHECKSUM_OFFSET] = 0;
        compute_checksum(&mut out);
        out
    }

    #[test]
    fn name_with_string() {
        // Name (_HID, "PNP0A08")
        let body = b"\x08_HID\x0DPNP0A08\x00";
        let tree = AmlTree::parse(&table(body)).unwrap();
        let root = tree.node(tree.root()).unwrap();
        let name = tree.object(root.var_args()[0]).unwrap();
        assert_eq!(name.op(), op::NAME);
        let string = tree.object(name.fixed_arg(1).unwrap()).unwrap();
        assert_eq!(string.op(), op::STRING_PREFIX);
        assert_eq!(tree.data(string.fixed_arg(0).unwrap()).unwrap().bytes(), b"PNP0A08\0");
    }

    #[test]
    fn field_list_split_or_raw() {
        // Field (GNVS, AnyAcc, NoLock, Preserve) { FLD0, 8, FLD1, 8 }
        let body = [
            0x5B, 0x81, 0x10, b'G', b'N', b'V', b'S', 0x00, // Field, PkgLength, name, flags
            b'F', b'L', b'D', b'0', 0x08, //
            b'F', b'L', b'D', b'1', 0x08,
        ];
        let bytes = table(&body);

        let tree = AmlTree::parse(&bytes).unwrap();
        let field = tree.node(tree.root()).unwrap().var_args()[0];
        let units = tree.object(field).unwrap().var_args();
        assert_eq!(units.len(), 2);
        assert_eq!(tree.data(units[1]).unwrap().data_type(), DataType::FieldElement);

        let config = ParseConfig {
            split_field_list: false,
            ..ParseConfig::default()
        };
        let tree = AmlTree::parse_with(&bytes, &config).unwrap();
        let field = tree.node(tree.root()).unwrap().var_args()[0];
        let units = tree.object(field).unwrap().var_args();
        assert_eq!(units.len(), 1);
        assert_eq!(tree.data(units[0]).unwrap().bytes().len(), 10);
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let err = AmlError::UnknownOpcode { op: 0x5B, sub_op: 0x7F };
        assert_eq!(AmlTree::parse(&table(&[0x5B, 0x7F])).unwrap_err(), err);
    }

    #[test]
    fn header_checks() {
        let mut bytes = table(&[0xA3]); // Noop
        bytes[0..4].copy_from_slice(b"FACP");
        assert_eq!(AmlTree::parse(&bytes).unwrap_err(), AmlError::InvalidHeader);

        let mut bytes = table(&[0xA3]);
        bytes[4..8].copy_from_slice(&0x100u32.to_le_bytes());
        assert_eq!(AmlTree::parse(&bytes).unwrap_err(), AmlError::InvalidHeader);

        // A bad checksum is tolerated.
        let mut bytes = table(&[0xA3]);
        bytes[CHECKSUM_OFFSET] ^= 0xFF;
        assert!(AmlTree::parse(&bytes).is_ok());
    }

    #[test]
    fn nesting_limit() {
        // Scope (\) { Scope (\) { Scope (\) {} } }
        let body = [0x10, 0x0B, 0x5C, 0x00, 0x10, 0x07, 0x5C, 0x00, 0x10, 0x03, 0x5C, 0x00];
        let config = ParseConfig {
            max_depth: 2,
            ..ParseConfig::default()
        };
        assert_eq!(AmlTree::parse_with(&table(&body), &config).unwrap_err(), AmlError::Unsupported);
        assert!(AmlTree::parse(&table(&body)).is_ok());
    }

    #[test]
    fn statement_must_be_complete() {
        let mut tree = AmlTree::parse(&table(&[])).unwrap();
        let node = tree.decode_statement(&[0x0B, 0x2C, 0x01]).unwrap();
        assert!(tree.is_detached(node));
        assert_eq!(tree.integer_value(node), Ok(300));

        let before = tree.node_count();
        assert_eq!(tree.decode_statement(&[0x0A, 0x01, 0x00]), Err(AmlError::InvalidArgument));
        assert_eq!(tree.decode_statement(&[0x0B, 0x2C]), Err(AmlError::UnexpectedEnd));
        assert_eq!(tree.node_count(), before);
    }
}
