//! Node types stored in an [`AmlTree`](super::AmlTree).

use alloc::vec::Vec;

use crate::grammar::{MAX_FIXED_ARGS, OpAttributes, OpEncoding, op};

/// Handle to a node of an [`AmlTree`](super::AmlTree).
///
/// Handles are generational: once a node is deleted its handle stops
/// resolving, even after the arena slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// The three kinds of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The definition block itself.
    Root,
    /// An AML statement.
    Object,
    /// A leaf holding encoded bytes.
    Data,
}

/// Meaning of the bytes held by a data node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Little-endian unsigned integer of 1, 2, 4 or 8 bytes.
    Uint,
    /// An AML NameString.
    NameString,
    /// A null-terminated ASCII string, terminator included.
    String,
    /// Uninterpreted bytes.
    Raw,
    /// One resource descriptor, header included.
    ResourceData,
    /// One element of a field list.
    FieldElement,
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// The node owning this one, `None` when detached (or for the root).
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the node payload.
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the node type.
    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Root(_) => NodeType::Root,
            NodeKind::Object(_) => NodeType::Object,
            NodeKind::Data(_) => NodeType::Data,
        }
    }

    /// Returns the root payload, if this is the root.
    #[must_use]
    pub const fn as_root(&self) -> Option<&RootNode> {
        match &self.kind {
            NodeKind::Root(root) => Some(root),
            _ => None,
        }
    }

    /// Returns the object payload, if this is an object node.
    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the data payload, if this is a data node.
    #[must_use]
    pub const fn as_data(&self) -> Option<&DataNode> {
        match &self.kind {
            NodeKind::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Nodes in serialization order: fixed arguments, then the variable list.
    pub(crate) fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        let (fixed, var): (&[Option<NodeId>], &[NodeId]) = match &self.kind {
            NodeKind::Root(root) => (&[], &root.children),
            NodeKind::Object(object) => (object.fixed_args(), &object.children),
            NodeKind::Data(_) => (&[], &[]),
        };
        fixed.iter().flatten().chain(var).copied()
    }

    /// The variable argument list, empty for data nodes.
    pub(crate) fn var_args(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Root(root) => &root.children,
            NodeKind::Object(object) => &object.children,
            NodeKind::Data(_) => &[],
        }
    }

    pub(crate) fn var_args_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            NodeKind::Root(root) => Some(&mut root.children),
            NodeKind::Object(object) if object.has_var_args() => Some(&mut object.children),
            _ => None,
        }
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The definition block.
    Root(RootNode),
    /// An AML statement.
    Object(ObjectNode),
    /// Encoded bytes.
    Data(DataNode),
}

/// The definition block's top-level statements.
///
/// The header itself lives on the [`AmlTree`](super::AmlTree).
#[derive(Debug, Clone)]
pub struct RootNode {
    pub(crate) children: Vec<NodeId>,
}

impl RootNode {
    /// Top-level statements.
    #[must_use]
    pub fn var_args(&self) -> &[NodeId] {
        &self.children
    }
}

/// An AML statement.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    pub(crate) encoding: &'static OpEncoding,
    pub(crate) fixed: [Option<NodeId>; MAX_FIXED_ARGS],
    pub(crate) children: Vec<NodeId>,
    pub(crate) pkg_len: u32,
    pub(crate) pkg_width: u8,
}

impl ObjectNode {
    pub(crate) fn new(encoding: &'static OpEncoding) -> Self {
        // An empty body still needs one byte of PkgLength.
        let (pkg_len, pkg_width) = if encoding.has(OpAttributes::HAS_PKG_LENGTH) {
            (1, 1)
        } else {
            (0, 0)
        };
        Self {
            encoding,
            fixed: [None; MAX_FIXED_ARGS],
            children: Vec::new(),
            pkg_len,
            pkg_width,
        }
    }

    /// Grammar entry of the statement.
    #[must_use]
    pub const fn encoding(&self) -> &'static OpEncoding {
        self.encoding
    }

    /// Opcode byte.
    #[must_use]
    pub const fn op(&self) -> u8 {
        self.encoding.op
    }

    /// Returns `true` if the statement is `(op, sub_op)`.
    #[must_use]
    pub const fn is(&self, op: u8, sub_op: u8) -> bool {
        self.encoding.matches(op, sub_op)
    }

    /// Fixed argument slots, as many as the grammar entry declares.
    #[must_use]
    pub fn fixed_args(&self) -> &[Option<NodeId>] {
        &self.fixed[..usize::from(self.encoding.max_index)]
    }

    /// Fixed argument `index`, if set.
    #[must_use]
    pub fn fixed_arg(&self, index: usize) -> Option<NodeId> {
        self.fixed_args().get(index).copied().flatten()
    }

    /// Variable argument list (child statements or byte-list elements).
    #[must_use]
    pub fn var_args(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns `true` if the statement takes a variable argument list.
    #[must_use]
    pub const fn has_var_args(&self) -> bool {
        self.encoding.has(OpAttributes::HAS_CHILD_OBJ) || self.encoding.has(OpAttributes::HAS_BYTE_LIST)
    }

    /// Decoded PkgLength, for statements that have one.
    #[must_use]
    pub const fn pkg_len(&self) -> Option<u32> {
        if self.encoding.has(OpAttributes::HAS_PKG_LENGTH) {
            Some(self.pkg_len)
        } else {
            None
        }
    }

    /// Number of bytes taken by the PkgLength field, zero when absent.
    #[must_use]
    pub const fn pkg_width(&self) -> u8 {
        self.pkg_width
    }

    /// Returns `true` for Zero, One, Ones and the integer prefixes.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self.encoding.op,
            op::ZERO | op::ONE | op::ONES | op::BYTE_PREFIX | op::WORD_PREFIX | op::DWORD_PREFIX | op::QWORD_PREFIX
        )
    }

    /// Returns `true` if the statement opens a namespace scope.
    #[must_use]
    pub const fn opens_scope(&self) -> bool {
        self.encoding.has(OpAttributes::IN_NAMESPACE.union(OpAttributes::HAS_CHILD_OBJ))
    }

    /// Index of the fixed argument holding the declared name, for statements
    /// that add a name to the namespace.
    #[must_use]
    pub const fn declared_name_index(&self) -> Option<usize> {
        if !self.encoding.has(OpAttributes::IN_NAMESPACE) {
            return None;
        }
        match self.encoding.op {
            op::ALIAS => Some(1),
            op::EXTERNAL => None,
            _ => Some(0),
        }
    }
}

/// Encoded bytes of a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    pub(crate) data_type: DataType,
    pub(crate) bytes: Vec<u8>,
}

impl DataNode {
    /// Meaning of the bytes.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The bytes, exactly as serialized.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The value of an integer node.
    #[must_use]
    pub fn uint(&self) -> Option<u64> {
        if self.data_type != DataType::Uint || self.bytes.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..self.bytes.len()].copy_from_slice(&self.bytes);
        Some(u64::from_le_bytes(buf))
    }
}
