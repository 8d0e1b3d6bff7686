//! Size and count propagation.
//!
//! Every edit changes the encoded size of one subtree by some delta and may
//! add or remove elements of one variable list. Walking from the edited
//! node's parent to the root, each ancestor absorbs the change:
//!
//! 1. `Package` / `VarPackage` update their element count when elements
//!    were added or removed (only at the first level);
//! 2. `Buffer` updates its byte-count argument when its byte list changed;
//! 3. statements with a PkgLength grow or shrink it;
//! 4. the root adjusts the header length.
//!
//! Steps 1 to 3 can change the width of an encoded integer or PkgLength,
//! which is folded into the delta passed upwards. The walk stops as soon as
//! the delta reaches zero.
//!
//! The whole walk is planned against the unmodified tree first, so an edit
//! that would overflow any field fails without touching anything.

use alloc::vec::Vec;

use super::{AmlTree, DataType, NodeId, NodeKind, pkg_for_body};
use crate::error::AmlError;
use crate::grammar::{self, op};
use crate::sdt::SdtHeader;

/// One field rewritten by a planned propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fixup {
    /// New PkgLength value and width of an object.
    PkgLength { node: NodeId, value: u32, width: u8 },
    /// New header length.
    HeaderLength(u32),
    /// New value of a one-byte count data node.
    Count { node: NodeId, value: u8 },
    /// New opcode and value of an integer object.
    Integer { node: NodeId, op: u8, value: u64 },
}

/// Whether an integer object may switch to a wider or narrower prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WidthPolicy {
    Adaptive,
    Fixed,
}

/// Smallest integer prefix that holds `value`.
pub(crate) const fn integer_prefix(value: u64) -> u8 {
    if value > u32::MAX as u64 {
        op::QWORD_PREFIX
    } else if value > u16::MAX as u64 {
        op::DWORD_PREFIX
    } else if value > u8::MAX as u64 {
        op::WORD_PREFIX
    } else {
        op::BYTE_PREFIX
    }
}

/// Width of the data following an integer prefix.
pub(crate) const fn prefix_width(op: u8) -> Option<usize> {
    match op {
        op::BYTE_PREFIX => Some(1),
        op::WORD_PREFIX => Some(2),
        op::DWORD_PREFIX => Some(4),
        op::QWORD_PREFIX => Some(8),
        _ => None,
    }
}

/// Prefix for data of `width` bytes.
pub(crate) const fn prefix_for_width(width: usize) -> Option<u8> {
    match width {
        1 => Some(op::BYTE_PREFIX),
        2 => Some(op::WORD_PREFIX),
        4 => Some(op::DWORD_PREFIX),
        8 => Some(op::QWORD_PREFIX),
        _ => None,
    }
}

fn integer_size(op: u8) -> i64 {
    match op {
        op::BYTE_PREFIX => 2,
        op::WORD_PREFIX => 3,
        op::DWORD_PREFIX => 5,
        op::QWORD_PREFIX => 9,
        _ => 1,
    }
}

fn fits(value: u64, width: usize) -> bool {
    width >= 8 || value >> (width * 8) == 0
}

fn offset(value: u64, delta: i64) -> Result<u64, AmlError> {
    value.checked_add_signed(delta).ok_or(if delta < 0 {
        AmlError::Underflow
    } else {
        AmlError::Overflow
    })
}

impl AmlTree {
    /// Plans re-encoding the integer object `node` with `value`.
    ///
    /// Returns the fixup, if any, and the change in encoded size.
    pub(crate) fn plan_integer(
        &self,
        node: NodeId,
        value: u64,
        policy: WidthPolicy,
    ) -> Result<(Option<Fixup>, i64), AmlError> {
        let current = self.integer_value(node)?;
        let old_op = self.object(node)?.op();
        if current == value {
            return Ok((None, 0));
        }
        let new_op = match (policy, prefix_width(old_op)) {
            (WidthPolicy::Adaptive, _) => integer_prefix(value),
            (WidthPolicy::Fixed, Some(width)) if fits(value, width) => old_op,
            (WidthPolicy::Fixed, _) => {
                crate::aml_warn!("aml: value {value:#x} does not fit the fixed-width integer");
                return Err(AmlError::Unsupported);
            }
        };
        let fixup = Fixup::Integer {
            node,
            op: new_op,
            value,
        };
        Ok((Some(fixup), integer_size(new_op) - integer_size(old_op)))
    }

    /// Plans the propagation of an edit below `start`.
    ///
    /// `from_var_list` tells whether the edited node sits in the variable
    /// list of `start`, `delta` is the size change and `count` the change in
    /// the number of variable arguments of `start`.
    pub(crate) fn plan_propagation(
        &self,
        start: NodeId,
        from_var_list: bool,
        delta: i64,
        count: i64,
    ) -> Result<Vec<Fixup>, AmlError> {
        let mut fixups = Vec::new();
        let (mut node, mut from_var_list, mut delta, mut count) = (start, from_var_list, delta, count);

        loop {
            let current = self.node(node)?;
            let object = match &current.kind {
                NodeKind::Root(_) => {
                    if delta != 0 {
                        let length = offset(u64::from(self.header.length()), delta)?;
                        let length = u32::try_from(length).map_err(|_| AmlError::Overflow)?;
                        if (length as usize) < SdtHeader::SIZE {
                            return Err(AmlError::Underflow);
                        }
                        fixups.push(Fixup::HeaderLength(length));
                    }
                    return Ok(fixups);
                }
                NodeKind::Object(object) => object,
                NodeKind::Data(_) => return Err(AmlError::InvalidArgument),
            };

            if count != 0 {
                match object.op() {
                    op::PACKAGE => {
                        let counter = object.fixed_arg(0).ok_or(AmlError::InvalidArgument)?;
                        let old = self.data(counter)?.uint().ok_or(AmlError::InvalidArgument)?;
                        let new = offset(old, count)?;
                        let value = u8::try_from(new).map_err(|_| AmlError::Overflow)?;
                        fixups.push(Fixup::Count { node: counter, value });
                    }
                    op::VAR_PACKAGE => {
                        let counter = object.fixed_arg(0).ok_or(AmlError::InvalidArgument)?;
                        let new = offset(self.integer_value(counter).map_err(|_| AmlError::Unsupported)?, count)?;
                        let (fixup, width_delta) = self.plan_integer(counter, new, WidthPolicy::Fixed)?;
                        fixups.extend(fixup);
                        delta += width_delta;
                    }
                    _ => {}
                }
            }

            if object.op() == op::BUFFER && from_var_list && delta != 0 {
                let size = object.fixed_arg(0).ok_or(AmlError::InvalidArgument)?;
                let old = self.integer_value(size).map_err(|_| AmlError::Unsupported)?;
                let (fixup, width_delta) = self.plan_integer(size, offset(old, delta)?, WidthPolicy::Adaptive)?;
                fixups.extend(fixup);
                delta += width_delta;
            }

            if object.pkg_len().is_some() && delta != 0 {
                let old_width = i64::from(object.pkg_width);
                let body = i64::from(object.pkg_len) - old_width + delta;
                if body < 0 {
                    return Err(AmlError::Underflow);
                }
                let body = u32::try_from(body).map_err(|_| AmlError::Overflow)?;
                let (value, width) = pkg_for_body(body).inspect_err(|_| {
                    crate::aml_warn!("aml: PkgLength overflow, body of {body:#x} bytes");
                })?;
                fixups.push(Fixup::PkgLength { node, value, width });
                delta += i64::from(width) - old_width;
            }

            let Some(parent) = current.parent else {
                return Ok(fixups);
            };
            if delta == 0 {
                return Ok(fixups);
            }
            from_var_list = self.node(parent)?.var_args().contains(&node);
            node = parent;
            count = 0;
        }
    }

    /// Nodes to allocate before `fixups` can be applied: one data node per
    /// Zero, One or Ones promoted to a prefixed constant.
    fn spare_nodes_needed(&self, fixups: &[Fixup]) -> usize {
        fixups
            .iter()
            .filter(|fixup| match **fixup {
                Fixup::Integer { node, .. } => self.object(node).is_ok_and(|object| object.fixed_arg(0).is_none()),
                _ => false,
            })
            .count()
    }

    /// Applies a plan produced by [`plan_propagation`](Self::plan_propagation).
    ///
    /// Allocation is the only thing that can fail, and it happens before any
    /// node is modified.
    pub(crate) fn apply(&mut self, fixups: &[Fixup]) -> Result<(), AmlError> {
        let needed = self.spare_nodes_needed(fixups);
        let mut spares = Vec::new();
        spares.try_reserve_exact(needed).map_err(|_| AmlError::OutOfMemory)?;
        for _ in 0..needed {
            match self.alloc_data(DataType::Uint, &[0]) {
                Ok(spare) => spares.push(spare),
                Err(err) => {
                    for spare in spares {
                        self.free_subtree(spare);
                    }
                    return Err(err);
                }
            }
        }

        for &fixup in fixups {
            match fixup {
                Fixup::PkgLength { node, value, width } => {
                    if let NodeKind::Object(object) = &mut self.node_mut(node)?.kind {
                        object.pkg_len = value;
                        object.pkg_width = width;
                    }
                }
                Fixup::HeaderLength(length) => self.header.length = length,
                Fixup::Count { node, value } => {
                    if let NodeKind::Data(data) = &mut self.node_mut(node)?.kind {
                        data.bytes.clear();
                        data.bytes.push(value);
                    }
                }
                Fixup::Integer { node, op, value } => {
                    let encoding = grammar::lookup(op, 0).ok_or(AmlError::InvalidArgument)?;
                    let data = match self.object(node)?.fixed_arg(0) {
                        Some(data) => Some(data),
                        None if prefix_width(op).is_some() => spares.pop(),
                        None => None,
                    };
                    if let NodeKind::Object(object) = &mut self.node_mut(node)?.kind {
                        object.encoding = encoding;
                    }
                    if let (Some(data), Some(width)) = (data, prefix_width(op)) {
                        if let NodeKind::Data(payload) = &mut self.node_mut(data)?.kind {
                            payload.bytes.clear();
                            payload.bytes.extend_from_slice(&value.to_le_bytes()[..width]);
                        }
                        self.link_fixed(node, 0, data)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Sets the value of an integer object, switching to the smallest
    /// encoding that holds it (Zero, One and Ones are kept only when the
    /// value does not change).
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is not an integer
    /// object, or a propagation error if an enclosing length overflows. The
    /// tree is unchanged on error.
    pub fn update_integer(&mut self, node: NodeId, value: u64) -> Result<(), AmlError> {
        let (fixup, delta) = self.plan_integer(node, value, WidthPolicy::Adaptive)?;
        let Some(fixup) = fixup else {
            return Ok(());
        };
        let mut fixups = alloc::vec![fixup];
        if let Some(parent) = self.parent(node).filter(|_| delta != 0) {
            let from_var_list = self.node(parent)?.var_args().contains(&node);
            fixups.extend(self.plan_propagation(parent, from_var_list, delta, 0)?);
        }
        self.apply(&fixups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_selection() {
        assert_eq!(integer_prefix(0), op::BYTE_PREFIX);
        assert_eq!(integer_prefix(0xFF), op::BYTE_PREFIX);
        assert_eq!(integer_prefix(0x100), op::WORD_PREFIX);
        assert_eq!(integer_prefix(0x1_0000), op::DWORD_PREFIX);
        assert_eq!(integer_prefix(0xFFFF_FFFF), op::DWORD_PREFIX);
        assert_eq!(integer_prefix(0x1_0000_0000), op::QWORD_PREFIX);
        assert_eq!(prefix_for_width(2), Some(op::WORD_PREFIX));
        assert_eq!(prefix_for_width(3), None);
    }

    #[test]
    fn fixed_width_bounds() {
        assert!(fits(0xFF, 1));
        assert!(!fits(0x100, 1));
        assert!(fits(u64::MAX, 8));
        assert_eq!(offset(1, -2), Err(AmlError::Underflow));
        assert_eq!(offset(u64::MAX, 1), Err(AmlError::Overflow));
    }
}
