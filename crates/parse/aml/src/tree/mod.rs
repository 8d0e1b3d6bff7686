//! The AML tree.
//!
//! An [`AmlTree`] owns every node of one definition block in an arena and
//! hands out [`NodeId`] handles. Three kinds of node exist:
//!
//! - the root, holding the top-level statements (the header is kept on the
//!   tree itself);
//! - object nodes, one per AML statement, with up to six fixed arguments
//!   and, depending on the grammar, a variable argument list;
//! - data nodes, holding the encoded bytes of integers, names, strings,
//!   resource descriptors and raw byte lists.
//!
//! Nodes created by the caller start detached. Editing primitives in
//! [`edit`] attach and detach them while keeping every PkgLength, element
//! count and the header length consistent.

pub mod edit;
pub mod iter;
pub mod node;
mod propagate;

use alloc::vec::Vec;

use crate::error::AmlError;
use crate::grammar::{self, ArgFormat, OpAttributes, op};
use crate::name::{aml_name_from_asl, is_valid_name_string};
use crate::sdt::SdtHeader;
use crate::{field, pkglen, resource};

pub use iter::{Cursor, IterMode};
pub use node::{DataNode, DataType, Node, NodeId, NodeKind, NodeType, ObjectNode, RootNode};

#[allow(clippy::cast_possible_truncation)]
const HEADER_SIZE: u32 = SdtHeader::SIZE as u32;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// An editable AML definition block.
#[derive(Debug, Clone)]
pub struct AmlTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    header: SdtHeader,
}

impl AmlTree {
    /// Creates a tree with no statements.
    ///
    /// The header length is reset to the header size; the checksum is left
    /// for the serializer.
    #[must_use]
    pub fn new(mut header: SdtHeader) -> Self {
        header.length = HEADER_SIZE;
        Self::with_header(header)
    }

    /// Creates a tree whose root carries `header` unchanged.
    pub(crate) fn with_header(header: SdtHeader) -> Self {
        let root = Node {
            parent: None,
            kind: NodeKind::Root(RootNode { children: Vec::new() }),
        };
        Self {
            slots: alloc::vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            header,
        }
    }

    /// Handle of the root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The table header. Its length always covers the whole tree.
    #[must_use]
    pub const fn header(&self) -> &SdtHeader {
        &self.header
    }

    /// Replaces the header identity fields.
    ///
    /// The length is recomputed from the tree and the checksum cleared; only
    /// `DSDT` and `SSDT` signatures are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidHeader`] for other signatures, or
    /// [`AmlError::Overflow`] if the tree does not fit a 32-bit length.
    pub fn set_header(&mut self, mut header: SdtHeader) -> Result<(), AmlError> {
        if !header.is_definition_block() {
            return Err(AmlError::InvalidHeader);
        }
        header.length = self.node_size(self.root)?;
        header.checksum = 0;
        self.header = header;
        Ok(())
    }

    /// Number of live nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Resolves a handle.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(usize::try_from(id.index).ok()?)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    /// Resolves a handle.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for stale or foreign handles.
    pub fn node(&self, id: NodeId) -> Result<&Node, AmlError> {
        self.get(id).ok_or(AmlError::InvalidArgument)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AmlError> {
        let slot = usize::try_from(id.index)
            .ok()
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(AmlError::InvalidArgument)?;
        if slot.generation != id.generation {
            return Err(AmlError::InvalidArgument);
        }
        slot.node.as_mut().ok_or(AmlError::InvalidArgument)
    }

    /// Resolves an object node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not an object node.
    pub fn object(&self, id: NodeId) -> Result<&ObjectNode, AmlError> {
        self.node(id)?.as_object().ok_or(AmlError::InvalidArgument)
    }

    /// Resolves a data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a data node.
    pub fn data(&self, id: NodeId) -> Result<&DataNode, AmlError> {
        self.node(id)?.as_data().ok_or(AmlError::InvalidArgument)
    }

    /// Parent of `id`, `None` for the root and detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Returns `true` if `id` is a live node with no parent (the root
    /// excluded).
    #[must_use]
    pub fn is_detached(&self, id: NodeId) -> bool {
        id != self.root && self.get(id).is_some_and(|node| node.parent.is_none())
    }

    /// If `id` is a fixed argument of its parent, returns the slot index.
    #[must_use]
    pub fn fixed_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.object(self.parent(id)?).ok()?;
        parent.fixed_args().iter().position(|&slot| slot == Some(id))
    }

    /// Sibling following `id` in its parent's variable list.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let list = self.get(self.parent(id)?)?.var_args();
        let pos = list.iter().position(|&n| n == id)?;
        list.get(pos + 1).copied()
    }

    /// Sibling preceding `id` in its parent's variable list.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let list = self.get(self.parent(id)?)?.var_args();
        let pos = list.iter().position(|&n| n == id)?;
        pos.checked_sub(1).map(|prev| list[prev])
    }

    // ─── Arena ────────────────────────────────────────────────────────────

    fn alloc(&mut self, node: Node) -> Result<NodeId, AmlError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return Ok(NodeId {
                index,
                generation: slot.generation,
            });
        }
        let index = u32::try_from(self.slots.len()).map_err(|_| AmlError::OutOfMemory)?;
        self.slots.try_reserve(1).map_err(|_| AmlError::OutOfMemory)?;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        Ok(NodeId {
            index,
            generation: 0,
        })
    }

    /// Frees `id` and its descendants without checking attachment.
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        for child in node.children() {
            self.free_subtree(child);
        }
    }

    pub(crate) fn alloc_object(&mut self, encoding: &'static grammar::OpEncoding) -> Result<NodeId, AmlError> {
        self.alloc(Node {
            parent: None,
            kind: NodeKind::Object(ObjectNode::new(encoding)),
        })
    }

    pub(crate) fn alloc_data(&mut self, data_type: DataType, bytes: &[u8]) -> Result<NodeId, AmlError> {
        let mut owned = Vec::new();
        owned.try_reserve_exact(bytes.len()).map_err(|_| AmlError::OutOfMemory)?;
        owned.extend_from_slice(bytes);
        self.alloc(Node {
            parent: None,
            kind: NodeKind::Data(DataNode {
                data_type,
                bytes: owned,
            }),
        })
    }

    // ─── Node creation ────────────────────────────────────────────────────

    /// Creates a detached object node for `(op, sub_op)` with empty fixed
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::UnknownOpcode`] if the grammar has no such entry,
    /// or [`AmlError::InvalidArgument`] for name characters, which are not
    /// statements.
    pub fn new_object(&mut self, op: u8, sub_op: u8) -> Result<NodeId, AmlError> {
        let sub_op = if op == op::EXT_OP { sub_op } else { 0 };
        let encoding = grammar::lookup(op, sub_op).ok_or(AmlError::UnknownOpcode { op, sub_op })?;
        if encoding.has(OpAttributes::IS_NAME_CHAR) {
            return Err(AmlError::InvalidArgument);
        }
        self.alloc_object(encoding)
    }

    /// Creates a detached data node holding a copy of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `bytes` is not a valid
    /// encoding of `data_type`.
    pub fn new_data(&mut self, data_type: DataType, bytes: &[u8]) -> Result<NodeId, AmlError> {
        check_data(data_type, bytes)?;
        self.alloc_data(data_type, bytes)
    }

    /// Creates a detached NameString data node from an ASL path.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidNameString`] if the path is malformed.
    pub fn new_name_string(&mut self, asl: &str) -> Result<NodeId, AmlError> {
        let bytes = aml_name_from_asl(asl)?;
        self.alloc_data(DataType::NameString, &bytes)
    }

    /// Creates a detached String data node; the terminator is added.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `s` contains a NUL or
    /// non-ASCII character.
    pub fn new_string(&mut self, s: &str) -> Result<NodeId, AmlError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(s.len() + 1).map_err(|_| AmlError::OutOfMemory)?;
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(0);
        self.new_data(DataType::String, &bytes)
    }

    /// Creates a detached resource-data node for one descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] unless `bytes` is exactly one
    /// descriptor.
    pub fn new_resource_data(&mut self, bytes: &[u8]) -> Result<NodeId, AmlError> {
        self.new_data(DataType::ResourceData, bytes)
    }

    /// Creates a detached integer object: Zero, One, or the smallest prefix
    /// that holds `value`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfMemory`] if the arena is exhausted.
    pub fn new_integer(&mut self, value: u64) -> Result<NodeId, AmlError> {
        let op = match value {
            0 => op::ZERO,
            1 => op::ONE,
            _ => propagate::integer_prefix(value),
        };
        let node = self.new_object(op, 0)?;
        if let Some(width) = propagate::prefix_width(op) {
            let data = match self.alloc_data(DataType::Uint, &value.to_le_bytes()[..width]) {
                Ok(data) => data,
                Err(err) => {
                    self.free_subtree(node);
                    return Err(err);
                }
            };
            self.link_fixed(node, 0, data)?;
        }
        Ok(node)
    }

    /// Deletes a detached node and all its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is the root, stale, or
    /// still attached; nothing is freed in that case.
    pub fn delete(&mut self, id: NodeId) -> Result<(), AmlError> {
        if !self.is_detached(id) {
            return Err(AmlError::InvalidArgument);
        }
        self.free_subtree(id);
        Ok(())
    }

    /// Deep-copies the subtree at `id` into a new detached subtree.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for the root or a stale handle,
    /// [`AmlError::OutOfMemory`] if the arena is exhausted.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, AmlError> {
        if id == self.root {
            return Err(AmlError::InvalidArgument);
        }
        let node = self.node(id)?;
        let copy = match &node.kind {
            NodeKind::Data(data) => {
                let (data_type, bytes) = (data.data_type, data.bytes.clone());
                return self.alloc_data(data_type, &bytes);
            }
            NodeKind::Object(object) => {
                let mut fresh = ObjectNode::new(object.encoding);
                fresh.pkg_len = object.pkg_len;
                fresh.pkg_width = object.pkg_width;
                fresh
            }
            NodeKind::Root(_) => return Err(AmlError::InvalidArgument),
        };
        let fixed: Vec<(usize, NodeId)> = node
            .as_object()
            .map(|object| {
                object
                    .fixed_args()
                    .iter()
                    .enumerate()
                    .filter_map(|(i, slot)| slot.map(|n| (i, n)))
                    .collect()
            })
            .unwrap_or_default();
        let var = node.var_args().to_vec();

        let new = self.alloc(Node {
            parent: None,
            kind: NodeKind::Object(copy),
        })?;
        match self.clone_children(new, &fixed, &var) {
            Ok(()) => Ok(new),
            Err(err) => {
                self.free_subtree(new);
                Err(err)
            }
        }
    }

    fn clone_children(&mut self, new: NodeId, fixed: &[(usize, NodeId)], var: &[NodeId]) -> Result<(), AmlError> {
        for &(index, child) in fixed {
            let copy = self.clone_subtree(child)?;
            if let Err(err) = self.link_fixed(new, index, copy) {
                self.free_subtree(copy);
                return Err(err);
            }
        }
        for &child in var {
            let copy = self.clone_subtree(child)?;
            if let Err(err) = self.link_var(new, None, copy) {
                self.free_subtree(copy);
                return Err(err);
            }
        }
        Ok(())
    }

    // ─── Raw linking (no propagation) ────────────────────────────────────

    /// Puts `child` in fixed slot `index` of `parent`. Used while building.
    pub(crate) fn link_fixed(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), AmlError> {
        let node = self.node_mut(parent)?;
        match &mut node.kind {
            NodeKind::Object(object) if index < usize::from(object.encoding.max_index) => {
                object.fixed[index] = Some(child);
            }
            _ => return Err(AmlError::InvalidArgument),
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Inserts `child` in the variable list of `parent` at `at`, or at the
    /// end. Used while building.
    pub(crate) fn link_var(&mut self, parent: NodeId, at: Option<usize>, child: NodeId) -> Result<(), AmlError> {
        let list = self.node_mut(parent)?.var_args_mut().ok_or(AmlError::InvalidArgument)?;
        list.try_reserve(1).map_err(|_| AmlError::OutOfMemory)?;
        match at {
            Some(index) if index <= list.len() => list.insert(index, child),
            Some(_) => return Err(AmlError::InvalidArgument),
            None => list.push(child),
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    // ─── Sizes ────────────────────────────────────────────────────────────

    /// Encoded size of the subtree at `id`, computed bottom-up.
    ///
    /// For the root this includes the header.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for stale handles, or
    /// [`AmlError::Overflow`] past `u32::MAX`.
    pub fn node_size(&self, id: NodeId) -> Result<u32, AmlError> {
        let node = self.node(id)?;
        let own = match &node.kind {
            NodeKind::Data(data) => return u32::try_from(data.bytes.len()).map_err(|_| AmlError::Overflow),
            NodeKind::Root(_) => HEADER_SIZE,
            NodeKind::Object(object) => opcode_size(object) + u32::from(object.pkg_width),
        };
        node.children().try_fold(own, |total, child| {
            total.checked_add(self.node_size(child)?).ok_or(AmlError::Overflow)
        })
    }

    /// Checks that every stored PkgLength in the subtree, and the header
    /// length when `id` is the root, match the bottom-up sizes.
    ///
    /// Returns the size of the subtree.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::SizeMismatch`] on the first disagreement.
    pub fn verify_sizes(&self, id: NodeId) -> Result<u32, AmlError> {
        let node = self.node(id)?;
        let mut body = 0u32;
        for child in node.children() {
            body = body.checked_add(self.verify_sizes(child)?).ok_or(AmlError::Overflow)?;
        }
        match &node.kind {
            NodeKind::Data(data) => u32::try_from(data.bytes.len()).map_err(|_| AmlError::Overflow),
            NodeKind::Root(_) => {
                let total = body.checked_add(HEADER_SIZE).ok_or(AmlError::Overflow)?;
                if self.header.length() != total {
                    crate::aml_error!(
                        "aml: header length {:#x} but tree holds {:#x} bytes",
                        self.header.length(),
                        total
                    );
                    return Err(AmlError::SizeMismatch);
                }
                Ok(total)
            }
            NodeKind::Object(object) => {
                let pkg = u32::from(object.pkg_width);
                let covered = body.checked_add(pkg).ok_or(AmlError::Overflow)?;
                if object.pkg_len().is_some() && object.pkg_len != covered {
                    return Err(AmlError::SizeMismatch);
                }
                covered.checked_add(opcode_size(object)).ok_or(AmlError::Overflow)
            }
        }
    }

    // ─── Integers ─────────────────────────────────────────────────────────

    /// Value of an integer object (Zero, One, Ones or a prefixed constant).
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not an integer object.
    pub fn integer_value(&self, id: NodeId) -> Result<u64, AmlError> {
        let object = self.object(id)?;
        match object.op() {
            op::ZERO => Ok(0),
            op::ONE => Ok(1),
            op::ONES => Ok(u64::MAX),
            op::BYTE_PREFIX | op::WORD_PREFIX | op::DWORD_PREFIX | op::QWORD_PREFIX => {
                let data = object.fixed_arg(0).ok_or(AmlError::InvalidArgument)?;
                self.data(data)?.uint().ok_or(AmlError::InvalidArgument)
            }
            _ => Err(AmlError::InvalidArgument),
        }
    }
}

/// Checks that `bytes` is a valid encoding of `data_type`.
pub(crate) fn check_data(data_type: DataType, bytes: &[u8]) -> Result<(), AmlError> {
    let ok = match data_type {
        _ if bytes.is_empty() => false,
        DataType::Uint => matches!(bytes.len(), 1 | 2 | 4 | 8),
        DataType::NameString => is_valid_name_string(bytes),
        DataType::String => match bytes.split_last() {
            Some((0, text)) => text.iter().all(|&c| (0x01..=0x7F).contains(&c)),
            _ => false,
        },
        DataType::ResourceData => resource::element_size(bytes) == Some(bytes.len()),
        DataType::FieldElement => field::element_len(bytes) == Some(bytes.len()),
        DataType::Raw => true,
    };
    if ok { Ok(()) } else { Err(AmlError::InvalidArgument) }
}

/// Checks that `format` accepts `node` as a fixed argument.
pub(crate) fn slot_accepts(format: ArgFormat, node: &Node) -> bool {
    match (format, &node.kind) {
        (ArgFormat::Uint8 | ArgFormat::Uint16 | ArgFormat::Uint32 | ArgFormat::Uint64, NodeKind::Data(data)) => {
            data.data_type == DataType::Uint && format.int_width() == Some(data.bytes.len())
        }
        (ArgFormat::Name, NodeKind::Data(data)) => data.data_type == DataType::NameString,
        (ArgFormat::String, NodeKind::Data(data)) => data.data_type == DataType::String,
        (ArgFormat::Object, NodeKind::Object(_)) => true,
        (ArgFormat::Object, NodeKind::Data(data)) => data.data_type == DataType::NameString,
        _ => false,
    }
}

/// Checks that the variable list of `parent` accepts `node`.
pub(crate) fn list_accepts(parent: &Node, node: &Node) -> bool {
    let byte_list = match &parent.kind {
        NodeKind::Root(_) => false,
        NodeKind::Object(object) if object.encoding.has(OpAttributes::HAS_BYTE_LIST) => true,
        NodeKind::Object(object) if object.encoding.has(OpAttributes::HAS_CHILD_OBJ) => false,
        _ => return false,
    };
    match &node.kind {
        NodeKind::Object(_) => !byte_list,
        NodeKind::Data(data) if byte_list => matches!(
            data.data_type,
            DataType::Raw | DataType::ResourceData | DataType::FieldElement
        ),
        NodeKind::Data(data) => data.data_type == DataType::NameString,
        NodeKind::Root(_) => false,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn opcode_size(object: &ObjectNode) -> u32 {
    object.encoding.opcode_len() as u32
}

/// Width of the PkgLength needed for a statement body of `body` bytes.
pub(crate) fn pkg_for_body(body: u32) -> Result<(u32, u8), AmlError> {
    let value = pkglen::for_body(body)?;
    #[allow(clippy::cast_possible_truncation)]
    let width = pkglen::width(value)? as u8;
    Ok((value, width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdt::SSDT_SIGNATURE;

    fn empty_tree() -> AmlTree {
        AmlTree::new(SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"TEST    ", 1))
    }

    #[test]
    fn stale_handles_do_not_resolve() {
        let mut tree = empty_tree();
        let a = tree.new_integer(5).unwrap();
        tree.delete(a).unwrap();
        let b = tree.new_integer(6).unwrap();
        assert!(tree.get(a).is_none());
        assert!(tree.get(b).is_some());
        assert_eq!(tree.integer_value(a), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn integer_objects() {
        let mut tree = empty_tree();
        for (value, op, size) in [
            (0, op::ZERO, 1),
            (1, op::ONE, 1),
            (0x2C, op::BYTE_PREFIX, 2),
            (300, op::WORD_PREFIX, 3),
            (0x1_0000, op::DWORD_PREFIX, 5),
            (0x1_0000_0000, op::QWORD_PREFIX, 9),
        ] {
            let node = tree.new_integer(value).unwrap();
            assert_eq!(tree.object(node).unwrap().op(), op);
            assert_eq!(tree.integer_value(node), Ok(value));
            assert_eq!(tree.node_size(node), Ok(size));
        }
    }

    #[test]
    fn data_validation() {
        let mut tree = empty_tree();
        assert!(tree.new_data(DataType::Uint, &[1, 2, 3]).is_err());
        assert!(tree.new_data(DataType::Raw, &[]).is_err());
        assert!(tree.new_data(DataType::NameString, b"_UID").is_ok());
        assert!(tree.new_data(DataType::NameString, b"_UI").is_err());
        assert!(tree.new_string("PNP0A08").is_ok());
        assert!(tree.new_data(DataType::String, b"abc").is_err());
        assert!(tree.new_resource_data(&[0x79, 0x00]).is_ok());
        assert!(tree.new_resource_data(&[0x79, 0x00, 0x00]).is_err());
    }

    #[test]
    fn delete_requires_detached() {
        let mut tree = empty_tree();
        let root = tree.root();
        assert_eq!(tree.delete(root), Err(AmlError::InvalidArgument));

        let int = tree.new_integer(0x10).unwrap();
        let data = tree.object(int).unwrap().fixed_arg(0).unwrap();
        let before = tree.node_count();
        assert_eq!(tree.delete(data), Err(AmlError::InvalidArgument));
        assert_eq!(tree.node_count(), before);

        tree.delete(int).unwrap();
        assert_eq!(tree.node_count(), before - 2);
        assert!(tree.get(data).is_none());
    }

    #[test]
    fn clone_is_deep_and_detached() {
        let mut tree = empty_tree();
        let int = tree.new_integer(0x1234).unwrap();
        let copy = tree.clone_subtree(int).unwrap();
        assert!(tree.is_detached(copy));
        assert_ne!(tree.object(copy).unwrap().fixed_arg(0), tree.object(int).unwrap().fixed_arg(0));
        assert_eq!(tree.integer_value(copy), Ok(0x1234));
        assert_eq!(tree.clone_subtree(tree.root()), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn set_header_checks_signature() {
        let mut tree = empty_tree();
        let bad = SdtHeader::new(*b"FACP", 1, *b"HADRON", *b"TEST    ", 1);
        assert_eq!(tree.set_header(bad), Err(AmlError::InvalidHeader));
        let good = SdtHeader::new(*b"DSDT", 2, *b"HADRON", *b"NEWTABLE", 7);
        tree.set_header(good).unwrap();
        assert_eq!(tree.header().signature(), *b"DSDT");
        assert_eq!(tree.header().length(), 36);
    }

    #[test]
    fn header_length_follows_root_edits() {
        let mut tree = empty_tree();
        let root = tree.root();
        let one = tree.new_integer(1).unwrap();
        tree.insert_tail(root, one).unwrap();
        assert_eq!(tree.header().length(), 37);
        assert_eq!(tree.verify_sizes(root), Ok(37));

        let header = SdtHeader::new(*b"DSDT", 2, *b"HADRON", *b"NEWTABLE", 7);
        tree.set_header(header).unwrap();
        assert_eq!(tree.header().length(), 37);

        tree.remove(one).unwrap();
        assert_eq!(tree.header().length(), 36);
        assert_eq!(tree.header().signature(), *b"DSDT");
        assert_eq!(tree.verify_sizes(root), Ok(36));
    }
}
