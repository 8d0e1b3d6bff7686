//! Depth-first traversal.
//!
//! Nodes are visited in serialization order: a node, then its fixed
//! arguments, then its variable arguments.

use super::{AmlTree, NodeId};

/// Extent of a [`Cursor`] walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterMode {
    /// Visit every node of the tree, starting anywhere.
    Linear,
    /// Stay inside the subtree of the node the cursor was created on.
    Branch,
}

/// Bidirectional pre-order cursor over an [`AmlTree`].
#[derive(Debug, Clone)]
pub struct Cursor<'t> {
    tree: &'t AmlTree,
    top: NodeId,
    mode: IterMode,
    current: Option<NodeId>,
}

impl Cursor<'_> {
    /// Node under the cursor; `None` once the walk ran off either end.
    #[must_use]
    pub const fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Moves to the next node in pre-order.
    pub fn move_next(&mut self) -> Option<NodeId> {
        self.current = self.current.and_then(|node| self.tree.next_node(node, self.bound()));
        self.current
    }

    /// Moves to the previous node in pre-order.
    pub fn move_prev(&mut self) -> Option<NodeId> {
        self.current = self.current.and_then(|node| self.tree.prev_node(node, self.bound()));
        self.current
    }

    fn bound(&self) -> Option<NodeId> {
        match self.mode {
            IterMode::Linear => None,
            IterMode::Branch => Some(self.top),
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = NodeId;

    /// Yields the current node, then advances.
    fn next(&mut self) -> Option<NodeId> {
        let node = self.current?;
        self.move_next();
        Some(node)
    }
}

impl AmlTree {
    /// Creates a cursor positioned on `node`.
    ///
    /// A stale handle gives a cursor that yields nothing.
    #[must_use]
    pub fn cursor(&self, node: NodeId, mode: IterMode) -> Cursor<'_> {
        Cursor {
            tree: self,
            top: node,
            mode,
            current: self.get(node).map(|_| node),
        }
    }

    /// `node` and every node below it, in pre-order.
    pub fn descendants(&self, node: NodeId) -> Cursor<'_> {
        self.cursor(node, IterMode::Branch)
    }

    /// Pre-order successor of `node`, not leaving the subtree of `bound`.
    fn next_node(&self, node: NodeId, bound: Option<NodeId>) -> Option<NodeId> {
        if let Some(first) = self.get(node)?.children().next() {
            return Some(first);
        }
        let mut current = node;
        loop {
            if Some(current) == bound {
                return None;
            }
            let parent = self.parent(current)?;
            let mut siblings = self.get(parent)?.children().skip_while(|&n| n != current);
            siblings.next();
            if let Some(next) = siblings.next() {
                return Some(next);
            }
            current = parent;
        }
    }

    /// Pre-order predecessor of `node`, not leaving the subtree of `bound`.
    fn prev_node(&self, node: NodeId, bound: Option<NodeId>) -> Option<NodeId> {
        if Some(node) == bound {
            return None;
        }
        let parent = self.parent(node)?;
        let prev = self.get(parent)?.children().take_while(|&n| n != node).last();
        let Some(mut current) = prev else {
            return Some(parent);
        };
        // Deepest last descendant of the previous sibling.
        while let Some(last) = self.get(current)?.children().last() {
            current = last;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::grammar::op;
    use crate::sdt::{SSDT_SIGNATURE, SdtHeader};

    /// Root -> [Scope(\_SB) -> [Name(X, One)], Name(Y, Zero)]
    fn sample() -> (AmlTree, Vec<NodeId>) {
        let mut tree = AmlTree::new(SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"ITERTEST", 1));
        let scope = tree.new_object(op::SCOPE, 0).unwrap();
        let sb = tree.new_name_string("\\_SB").unwrap();
        tree.set_fixed_arg(scope, 0, sb).unwrap();
        let x = tree.new_object(op::NAME, 0).unwrap();
        let x_name = tree.new_name_string("X").unwrap();
        let one = tree.new_integer(1).unwrap();
        tree.set_fixed_arg(x, 0, x_name).unwrap();
        tree.set_fixed_arg(x, 1, one).unwrap();
        tree.insert_tail(scope, x).unwrap();
        let y = tree.new_object(op::NAME, 0).unwrap();
        let y_name = tree.new_name_string("Y").unwrap();
        let zero = tree.new_integer(0).unwrap();
        tree.set_fixed_arg(y, 0, y_name).unwrap();
        tree.set_fixed_arg(y, 1, zero).unwrap();
        let root = tree.root();
        tree.insert_tail(root, scope).unwrap();
        tree.insert_tail(root, y).unwrap();
        let order = [root, scope, sb, x, x_name, one, y, y_name, zero].to_vec();
        (tree, order)
    }

    #[test]
    fn linear_walk_is_pre_order() {
        let (tree, order) = sample();
        let walked: Vec<_> = tree.cursor(tree.root(), IterMode::Linear).collect();
        assert_eq!(walked, order);

        let mut cursor = tree.cursor(order[8], IterMode::Linear);
        let mut back = Vec::new();
        while let Some(node) = cursor.current() {
            back.push(node);
            cursor.move_prev();
        }
        back.reverse();
        assert_eq!(back, order);
    }

    #[test]
    fn linear_walk_leaves_the_start_subtree() {
        let (tree, order) = sample();
        // Starting at `x` continues into `y` after its own subtree.
        let walked: Vec<_> = tree.cursor(order[3], IterMode::Linear).collect();
        assert_eq!(walked, order[3..]);
    }

    #[test]
    fn branch_walk_stays_inside() {
        let (tree, order) = sample();
        let walked: Vec<_> = tree.descendants(order[1]).collect();
        assert_eq!(walked, order[1..6]);

        let mut cursor = tree.cursor(order[1], IterMode::Branch);
        assert_eq!(cursor.move_prev(), None);
        assert_eq!(cursor.current(), None);
    }
}
