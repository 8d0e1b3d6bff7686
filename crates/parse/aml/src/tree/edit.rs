//! Editing primitives.
//!
//! Every primitive validates its arguments and plans the size/count
//! propagation before changing anything, so a failed edit leaves the tree
//! exactly as it was. Nodes entering the tree must be detached; nodes
//! leaving it come back detached and can be re-inserted or deleted.

use alloc::vec::Vec;

use super::propagate::prefix_for_width;
use super::{AmlTree, DataType, NodeId, NodeKind, check_data, list_accepts, slot_accepts};
use crate::error::AmlError;
use crate::grammar;

/// Where to insert in a variable argument list.
#[derive(Debug, Clone, Copy)]
enum Position {
    Head,
    Tail,
    Before(NodeId),
    After(NodeId),
}

impl AmlTree {
    /// Inserts `node` first in the variable list of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is not detached,
    /// `parent` has no variable list, or the list does not accept this kind
    /// of node, and a propagation error if an enclosing length or count
    /// overflows.
    pub fn insert_head(&mut self, parent: NodeId, node: NodeId) -> Result<(), AmlError> {
        self.insert(parent, Position::Head, node)
    }

    /// Inserts `node` last in the variable list of `parent`.
    ///
    /// # Errors
    ///
    /// See [`insert_head`](Self::insert_head).
    pub fn insert_tail(&mut self, parent: NodeId, node: NodeId) -> Result<(), AmlError> {
        self.insert(parent, Position::Tail, node)
    }

    /// Inserts `node` just before `sibling`, which must be in a variable list.
    ///
    /// # Errors
    ///
    /// See [`insert_head`](Self::insert_head).
    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(sibling).ok_or(AmlError::InvalidArgument)?;
        self.insert(parent, Position::Before(sibling), node)
    }

    /// Inserts `node` just after `sibling`, which must be in a variable list.
    ///
    /// # Errors
    ///
    /// See [`insert_head`](Self::insert_head).
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(sibling).ok_or(AmlError::InvalidArgument)?;
        self.insert(parent, Position::After(sibling), node)
    }

    fn insert(&mut self, parent: NodeId, position: Position, node: NodeId) -> Result<(), AmlError> {
        self.check_insertable(parent, node)?;
        if !list_accepts(self.node(parent)?, self.node(node)?) {
            return Err(AmlError::InvalidArgument);
        }

        let list = self.node(parent)?.var_args();
        let index = match position {
            Position::Head => 0,
            Position::Tail => list.len(),
            Position::Before(sibling) => list.iter().position(|&n| n == sibling).ok_or(AmlError::InvalidArgument)?,
            Position::After(sibling) => {
                list.iter().position(|&n| n == sibling).ok_or(AmlError::InvalidArgument)? + 1
            }
        };

        let size = i64::from(self.node_size(node)?);
        let fixups = self.plan_propagation(parent, true, size, 1)?;
        self.link_var(parent, Some(index), node)?;
        if let Err(err) = self.apply(&fixups) {
            self.unlink_var(parent, node);
            return Err(err);
        }
        Ok(())
    }

    /// Detaches `node` from the variable list it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is detached or is a
    /// fixed argument, and a propagation error if an enclosing count would
    /// underflow.
    pub fn remove(&mut self, node: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(node).ok_or(AmlError::InvalidArgument)?;
        if !self.node(parent)?.var_args().contains(&node) {
            return Err(AmlError::InvalidArgument);
        }
        let size = i64::from(self.node_size(node)?);
        let fixups = self.plan_propagation(parent, true, -size, -1)?;
        self.apply(&fixups)?;
        self.unlink_var(parent, node);
        Ok(())
    }

    /// Puts `node` in fixed argument slot `index` of `parent`.
    ///
    /// Returns the previous occupant, now detached.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is not detached, the
    /// index is past the statement's fixed arguments, or the slot's grammar
    /// format does not accept `node`.
    pub fn set_fixed_arg(&mut self, parent: NodeId, index: usize, node: NodeId) -> Result<Option<NodeId>, AmlError> {
        self.check_insertable(parent, node)?;
        let object = self.object(parent)?;
        if index >= object.fixed_args().len() || !slot_accepts(object.encoding.format(index), self.node(node)?) {
            return Err(AmlError::InvalidArgument);
        }
        let old = object.fixed_arg(index);

        let old_size = match old {
            Some(old) => i64::from(self.node_size(old)?),
            None => 0,
        };
        let delta = i64::from(self.node_size(node)?) - old_size;
        let fixups = self.plan_propagation(parent, false, delta, 0)?;
        self.apply(&fixups)?;

        self.link_fixed(parent, index, node)?;
        if let Some(old) = old {
            self.node_mut(old)?.parent = None;
        }
        Ok(old)
    }

    /// Replaces `old`, a fixed or variable argument, with the detached
    /// `new`. `old` comes back detached.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `old` is detached, `new` is
    /// attached, or `new` does not fit where `old` sits.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(old).ok_or(AmlError::InvalidArgument)?;
        if let Some(index) = self.fixed_index(old) {
            return self.set_fixed_arg(parent, index, new).map(|_| ());
        }

        self.check_insertable(parent, new)?;
        if !list_accepts(self.node(parent)?, self.node(new)?) {
            return Err(AmlError::InvalidArgument);
        }
        let delta = i64::from(self.node_size(new)?) - i64::from(self.node_size(old)?);
        let fixups = self.plan_propagation(parent, true, delta, 0)?;
        self.apply(&fixups)?;

        let list = self.node_mut(parent)?.var_args_mut().ok_or(AmlError::InvalidArgument)?;
        if let Some(slot) = list.iter_mut().find(|n| **n == old) {
            *slot = new;
        }
        self.node_mut(new)?.parent = Some(parent);
        self.node_mut(old)?.parent = None;
        Ok(())
    }

    /// Overwrites the bytes of a data node, keeping its type.
    ///
    /// An integer may only change width when it is the value of a Byte,
    /// Word, DWord or QWord prefix; the prefix is switched to match.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `bytes` is not a valid
    /// encoding of the node's type, or [`AmlError::Unsupported`] if an
    /// integer changes width where the grammar fixes it.
    pub fn update_data_buffer(&mut self, node: NodeId, bytes: &[u8]) -> Result<(), AmlError> {
        let data = self.data(node)?;
        check_data(data.data_type, bytes)?;
        let old_len = data.bytes.len();
        let parent = self.parent(node);

        let mut new_prefix = None;
        if data.data_type == DataType::Uint && bytes.len() != old_len {
            let owner = parent.map(|p| self.object(p)).transpose()?;
            match owner {
                Some(owner) if owner.is_integer() => new_prefix = prefix_for_width(bytes.len()),
                Some(_) => return Err(AmlError::Unsupported),
                None => {}
            }
        }

        let delta = i64::try_from(bytes.len()).map_err(|_| AmlError::Overflow)?
            - i64::try_from(old_len).map_err(|_| AmlError::Overflow)?;
        let fixups = match parent {
            Some(parent) if delta != 0 => {
                let from_var_list = self.node(parent)?.var_args().contains(&node);
                self.plan_propagation(parent, from_var_list, delta, 0)?
            }
            _ => Vec::new(),
        };

        let mut owned = Vec::new();
        owned.try_reserve_exact(bytes.len()).map_err(|_| AmlError::OutOfMemory)?;
        owned.extend_from_slice(bytes);
        self.apply(&fixups)?;

        if let NodeKind::Data(data) = &mut self.node_mut(node)?.kind {
            data.bytes = owned;
        }
        if let (Some(parent), Some(prefix)) = (parent, new_prefix) {
            let encoding = grammar::lookup(prefix, 0).ok_or(AmlError::InvalidArgument)?;
            if let NodeKind::Object(object) = &mut self.node_mut(parent)?.kind {
                object.encoding = encoding;
            }
        }
        Ok(())
    }

    // ─── Helpers ──────────────────────────────────────────────────────────

    /// Checks that `node` may be attached below `parent`: it must be
    /// detached and must not be `parent` or one of its ancestors.
    fn check_insertable(&self, parent: NodeId, node: NodeId) -> Result<(), AmlError> {
        if !self.is_detached(node) {
            return Err(AmlError::InvalidArgument);
        }
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == node {
                return Err(AmlError::InvalidArgument);
            }
            cursor = self.node(current)?.parent;
        }
        Ok(())
    }

    fn unlink_var(&mut self, parent: NodeId, node: NodeId) {
        if let Some(list) = self.node_mut(parent).ok().and_then(|p| p.var_args_mut()) {
            list.retain(|&n| n != node);
        }
        if let Ok(node) = self.node_mut(node) {
            node.parent = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::op;
    use crate::sdt::{SSDT_SIGNATURE, SdtHeader};

    fn tree() -> AmlTree {
        AmlTree::new(SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"EDITTEST", 1))
    }

    /// `Name (NAME, Package () {})` attached to the root.
    fn named_package(tree: &mut AmlTree) -> (NodeId, NodeId) {
        let name = tree.new_object(op::NAME, 0).unwrap();
        let seg = tree.new_name_string("PKG0").unwrap();
        tree.set_fixed_arg(name, 0, seg).unwrap();
        let package = tree.new_object(op::PACKAGE, 0).unwrap();
        let count = tree.new_data(DataType::Uint, &[0]).unwrap();
        tree.set_fixed_arg(package, 0, count).unwrap();
        tree.set_fixed_arg(name, 1, package).unwrap();
        tree.insert_tail(tree.root(), name).unwrap();
        (name, package)
    }

    #[test]
    fn package_count_tracks_elements() {
        let mut tree = tree();
        let (_, package) = named_package(&mut tree);
        // Name(1) + "PKG0"(4) + Package(1) + PkgLength(1) + count(1)
        assert_eq!(tree.header().length(), 36 + 8);

        let a = tree.new_integer(0x20).unwrap();
        let b = tree.new_integer(1).unwrap();
        tree.insert_tail(package, a).unwrap();
        tree.insert_head(package, b).unwrap();

        let count = tree.object(package).unwrap().fixed_arg(0).unwrap();
        assert_eq!(tree.data(count).unwrap().bytes(), &[2]);
        assert_eq!(tree.object(package).unwrap().var_args(), &[b, a]);
        assert_eq!(tree.object(package).unwrap().pkg_len(), Some(5));
        assert_eq!(tree.header().length(), 36 + 11);
        assert_eq!(tree.verify_sizes(tree.root()), Ok(47));

        tree.remove(b).unwrap();
        assert!(tree.is_detached(b));
        assert_eq!(tree.data(count).unwrap().bytes(), &[1]);
        assert_eq!(tree.verify_sizes(tree.root()), Ok(46));
    }

    /// `Name (VPK0, VarPackage (count) {})` attached to the root.
    fn named_var_package(tree: &mut AmlTree, count: NodeId) -> NodeId {
        let name = tree.new_object(op::NAME, 0).unwrap();
        let seg = tree.new_name_string("VPK0").unwrap();
        tree.set_fixed_arg(name, 0, seg).unwrap();
        let package = tree.new_object(op::VAR_PACKAGE, 0).unwrap();
        tree.set_fixed_arg(package, 0, count).unwrap();
        tree.set_fixed_arg(name, 1, package).unwrap();
        tree.insert_tail(tree.root(), name).unwrap();
        package
    }

    #[test]
    fn package_count_overflow_is_refused() {
        let mut tree = tree();
        let (_, package) = named_package(&mut tree);
        for _ in 0..255 {
            let element = tree.new_integer(0).unwrap();
            tree.insert_tail(package, element).unwrap();
        }
        let count = tree.object(package).unwrap().fixed_arg(0).unwrap();
        assert_eq!(tree.data(count).unwrap().bytes(), &[0xFF]);
        let before = tree.serialize_to_vec().unwrap();

        let extra = tree.new_integer(0).unwrap();
        assert_eq!(tree.insert_tail(package, extra), Err(AmlError::Overflow));
        assert!(tree.is_detached(extra));
        assert_eq!(tree.object(package).unwrap().var_args().len(), 255);
        assert_eq!(tree.data(count).unwrap().bytes(), &[0xFF]);
        assert_eq!(tree.serialize_to_vec().unwrap(), before);
        tree.delete(extra).unwrap();
    }

    #[test]
    fn var_package_count_keeps_its_width() {
        let mut tree = tree();
        let count = tree.new_integer(0xFE).unwrap();
        let package = named_var_package(&mut tree, count);
        // Name(1) + "VPK0"(4) + VarPackage(1) + PkgLength(1) + BytePrefix(2)
        assert_eq!(tree.header().length(), 36 + 9);

        let a = tree.new_integer(0).unwrap();
        tree.insert_tail(package, a).unwrap();
        assert_eq!(tree.object(count).unwrap().op(), op::BYTE_PREFIX);
        assert_eq!(tree.integer_value(count), Ok(0xFF));
        assert_eq!(tree.verify_sizes(tree.root()), Ok(36 + 10));

        // 0x100 would need a word prefix.
        let before = tree.serialize_to_vec().unwrap();
        let b = tree.new_integer(0).unwrap();
        assert_eq!(tree.insert_tail(package, b), Err(AmlError::Unsupported));
        assert!(tree.is_detached(b));
        assert_eq!(tree.integer_value(count), Ok(0xFF));
        assert_eq!(tree.serialize_to_vec().unwrap(), before);

        tree.remove(a).unwrap();
        assert_eq!(tree.integer_value(count), Ok(0xFE));
        assert_eq!(tree.verify_sizes(tree.root()), Ok(36 + 9));
    }

    #[test]
    fn var_package_zero_count_cannot_change() {
        let mut tree = tree();
        let zero = tree.new_integer(0).unwrap();
        let package = named_var_package(&mut tree, zero);
        let length = tree.header().length();

        let element = tree.new_integer(1).unwrap();
        assert_eq!(tree.insert_tail(package, element), Err(AmlError::Unsupported));
        assert_eq!(tree.object(zero).unwrap().op(), op::ZERO);
        assert!(tree.object(package).unwrap().var_args().is_empty());
        assert_eq!(tree.header().length(), length);
    }

    #[test]
    fn var_package_count_must_be_a_constant() {
        let mut tree = tree();
        let local = tree.new_object(0x60, 0).unwrap();
        let package = named_var_package(&mut tree, local);
        let before = tree.serialize_to_vec().unwrap();

        let element = tree.new_integer(1).unwrap();
        assert_eq!(tree.insert_tail(package, element), Err(AmlError::Unsupported));
        assert!(tree.is_detached(element));
        assert_eq!(tree.serialize_to_vec().unwrap(), before);
    }

    #[test]
    fn rejects_attached_and_cyclic_inserts() {
        let mut tree = tree();
        let (name, package) = named_package(&mut tree);
        let root = tree.root();
        assert_eq!(tree.insert_tail(root, name), Err(AmlError::InvalidArgument));

        let scope = tree.new_object(op::SCOPE, 0).unwrap();
        let inner = tree.new_object(op::SCOPE, 0).unwrap();
        tree.insert_tail(scope, inner).unwrap();
        // `scope` is detached but is an ancestor of `inner`.
        assert_eq!(tree.insert_tail(inner, scope), Err(AmlError::InvalidArgument));
        // Byte lists only take data nodes; packages take objects.
        let raw = tree.new_data(DataType::Raw, &[1, 2]).unwrap();
        assert_eq!(tree.insert_tail(package, raw), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn remove_refuses_fixed_arguments() {
        let mut tree = tree();
        let (name, _) = named_package(&mut tree);
        let seg = tree.object(name).unwrap().fixed_arg(0).unwrap();
        assert_eq!(tree.remove(seg), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn replace_checks_slot_format() {
        let mut tree = tree();
        let (name, package) = named_package(&mut tree);
        let length = tree.header().length();

        // A string cannot stand where a NameString is expected.
        let s = tree.new_string("X").unwrap();
        let seg = tree.object(name).unwrap().fixed_arg(0).unwrap();
        assert_eq!(tree.replace(seg, s), Err(AmlError::InvalidArgument));
        assert_eq!(tree.header().length(), length);

        // Replacing the three-byte package with One shrinks the table.
        let one = tree.new_integer(1).unwrap();
        tree.replace(package, one).unwrap();
        assert!(tree.is_detached(package));
        assert_eq!(tree.header().length(), length - 2);
        assert_eq!(tree.verify_sizes(tree.root()), Ok(length - 2));
        tree.delete(package).unwrap();
    }

    #[test]
    fn integer_width_change_switches_prefix() {
        let mut tree = tree();
        let (name, package) = named_package(&mut tree);
        let int = tree.new_integer(0x10).unwrap();
        tree.replace(package, int).unwrap();
        let data = tree.object(int).unwrap().fixed_arg(0).unwrap();
        let before = tree.header().length();

        tree.update_data_buffer(data, &0x1234u16.to_le_bytes()).unwrap();
        assert_eq!(tree.object(int).unwrap().op(), op::WORD_PREFIX);
        assert_eq!(tree.integer_value(int), Ok(0x1234));
        assert_eq!(tree.header().length(), before + 1);

        // The NameString slot of Name has no room for a width change.
        let seg = tree.object(name).unwrap().fixed_arg(0).unwrap();
        assert_eq!(tree.update_data_buffer(seg, b"AB"), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn update_integer_promotes_constants() {
        let mut tree = tree();
        let (_, package) = named_package(&mut tree);
        let zero = tree.new_integer(0).unwrap();
        tree.insert_tail(package, zero).unwrap();
        let before = tree.header().length();

        tree.update_integer(zero, 0).unwrap();
        assert_eq!(tree.object(zero).unwrap().op(), op::ZERO);

        tree.update_integer(zero, 0x1_0000).unwrap();
        assert_eq!(tree.object(zero).unwrap().op(), op::DWORD_PREFIX);
        assert_eq!(tree.header().length(), before + 4);
        assert_eq!(tree.verify_sizes(tree.root()), Ok(before + 4));
    }

    #[test]
    fn buffer_size_follows_byte_list() {
        let mut tree = tree();
        let buffer = tree.new_object(op::BUFFER, 0).unwrap();
        let size = tree.new_integer(0).unwrap();
        tree.set_fixed_arg(buffer, 0, size).unwrap();
        let raw = tree.new_data(DataType::Raw, &[0xAA, 0xBB]).unwrap();
        tree.insert_tail(buffer, raw).unwrap();
        // Zero is promoted to a byte prefix.
        assert_eq!(tree.object(size).unwrap().op(), op::BYTE_PREFIX);
        assert_eq!(tree.integer_value(size), Ok(2));

        tree.update_data_buffer(raw, &[0xAA]).unwrap();
        assert_eq!(tree.integer_value(size), Ok(1));
        assert_eq!(tree.verify_sizes(buffer), Ok(1 + 1 + 2 + 1));
    }
}
