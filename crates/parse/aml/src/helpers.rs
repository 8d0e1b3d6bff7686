//! Table-patching helpers.
//!
//! Shortcuts for the edits platform table generators make to a template
//! SSDT: renaming a device, setting `_UID`, and walking or extending the
//! resource template of a `Name (_CRS, ResourceTemplate () {...})`.

use alloc::vec::Vec;

use crate::error::AmlError;
use crate::grammar::op;
use crate::name::{aml_name_from_asl, aml_name_matches};
use crate::resource::codegen::extended_interrupt;
use crate::resource::descriptor::InterruptFlags;
use crate::resource::{DescriptorId, descriptor_id, is_end_tag, large};
use crate::tree::{AmlTree, DataType, NodeId};

/// Offset of the first interrupt number in an Extended Interrupt descriptor.
const EXT_IRQ_TABLE_OFFSET: usize = 5;

/// Offsets of the range fields in a QWord address space descriptor.
const QWORD_MIN_OFFSET: usize = 14;
const QWORD_MAX_OFFSET: usize = 22;
const QWORD_LENGTH_OFFSET: usize = 38;
const QWORD_DESCRIPTOR_SIZE: usize = 46;

impl AmlTree {
    /// Returns `true` if `node` is `Name (<asl_name>, ...)`.
    ///
    /// The name is compared as encoded, so `"_uid"` matches `_UID`.
    #[must_use]
    pub fn is_name_object(&self, node: NodeId, asl_name: &str) -> bool {
        let Ok(object) = self.object(node) else {
            return false;
        };
        object.is(op::NAME, 0)
            && object
                .fixed_arg(0)
                .and_then(|name| self.data(name).ok())
                .is_some_and(|name| aml_name_matches(name.bytes(), asl_name))
    }

    /// Renames a `Device ()`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `device` is not a device
    /// with a name, or [`AmlError::InvalidNameString`] for a malformed name.
    pub fn device_update_name(&mut self, device: NodeId, new_name: &str) -> Result<(), AmlError> {
        let object = self.object(device)?;
        if !object.is(op::EXT_OP, op::ext::DEVICE) {
            return Err(AmlError::InvalidArgument);
        }
        let name = object.fixed_arg(0).ok_or(AmlError::InvalidArgument)?;
        if self.data(name)?.data_type() != DataType::NameString {
            return Err(AmlError::InvalidArgument);
        }
        let encoded = aml_name_from_asl(new_name)?;
        self.update_data_buffer(name, &encoded)
    }

    /// Sets the value of `Name (_UID, <integer>)`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `name` is not a `_UID`
    /// declaration holding an integer constant.
    pub fn name_uid_update_value(&mut self, name: NodeId, value: u64) -> Result<(), AmlError> {
        if !self.is_name_object(name, "_UID") {
            return Err(AmlError::InvalidArgument);
        }
        let integer = self.object(name)?.fixed_arg(1).ok_or(AmlError::InvalidArgument)?;
        self.update_integer(integer, value)
    }

    /// First resource descriptor of `Name (_CRS, ResourceTemplate () {...})`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `name` is not a `_CRS`
    /// declaration whose value is a buffer of resource descriptors.
    pub fn name_crs_first_resource(&self, name: NodeId) -> Result<NodeId, AmlError> {
        if !self.is_name_object(name, "_CRS") {
            return Err(AmlError::InvalidArgument);
        }
        let buffer = self.crs_buffer(name)?;
        let first = self
            .object(buffer)?
            .var_args()
            .first()
            .copied()
            .ok_or(AmlError::InvalidArgument)?;
        if self.data(first)?.data_type() != DataType::ResourceData {
            return Err(AmlError::InvalidArgument);
        }
        Ok(first)
    }

    /// Descriptor following `current` in its `_CRS` template.
    ///
    /// Returns `None` when `current` is the last descriptor before the end
    /// tag.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] unless `current` is a
    /// resource-data node of a `Name (_CRS, ...)` buffer.
    pub fn name_crs_next_resource(&self, current: NodeId) -> Result<Option<NodeId>, AmlError> {
        if self.data(current)?.data_type() != DataType::ResourceData {
            return Err(AmlError::InvalidArgument);
        }
        let buffer = self.parent(current).ok_or(AmlError::InvalidArgument)?;
        let name = self.parent(buffer).ok_or(AmlError::InvalidArgument)?;
        if !self.object(buffer)?.is(op::BUFFER, 0) || !self.is_name_object(name, "_CRS") {
            return Err(AmlError::InvalidArgument);
        }
        let Some(next) = self.next_sibling(current) else {
            return Ok(None);
        };
        let bytes = self.data(next)?.bytes();
        if bytes.first().is_some_and(|&header| is_end_tag(header)) {
            return Ok(None);
        }
        Ok(Some(next))
    }

    /// Sets the first interrupt number of an Extended Interrupt descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is not an Extended
    /// Interrupt resource-data node with at least one interrupt.
    pub fn update_resource_interrupt(&mut self, node: NodeId, irq: u32) -> Result<(), AmlError> {
        let mut bytes = self.resource_bytes(node, large::EXTENDED_INTERRUPT)?;
        let slot = bytes
            .get_mut(EXT_IRQ_TABLE_OFFSET..EXT_IRQ_TABLE_OFFSET + 4)
            .ok_or(AmlError::InvalidArgument)?;
        slot.copy_from_slice(&irq.to_le_bytes());
        self.update_data_buffer(node, &bytes)
    }

    /// Rewrites an Extended Interrupt descriptor with new flags and
    /// interrupt list. Its size may change.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is not an Extended
    /// Interrupt resource-data node or `irqs` is empty or too long.
    pub fn update_resource_interrupts(
        &mut self,
        node: NodeId,
        flags: InterruptFlags,
        irqs: &[u32],
    ) -> Result<(), AmlError> {
        self.resource_bytes(node, large::EXTENDED_INTERRUPT)?;
        let bytes = extended_interrupt(flags, irqs)?;
        self.update_data_buffer(node, &bytes)
    }

    /// Sets the range of a QWord address space descriptor to
    /// `[base, base + length - 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is not a QWord
    /// address space resource-data node, or the range is empty or wraps.
    pub fn update_resource_qword(&mut self, node: NodeId, base: u64, length: u64) -> Result<(), AmlError> {
        let mut bytes = self.resource_bytes(node, large::QWORD_ADDRESS)?;
        if bytes.len() < QWORD_DESCRIPTOR_SIZE {
            return Err(AmlError::InvalidArgument);
        }
        let max = length
            .checked_sub(1)
            .and_then(|span| base.checked_add(span))
            .ok_or(AmlError::InvalidArgument)?;
        for (offset, value) in [
            (QWORD_MIN_OFFSET, base),
            (QWORD_MAX_OFFSET, max),
            (QWORD_LENGTH_OFFSET, length),
        ] {
            bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        }
        self.update_data_buffer(node, &bytes)
    }

    /// Inserts the detached resource-data node `resource` just before the
    /// end tag of `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `buffer` is not a `Buffer`
    /// ending in an end tag or `resource` is not a detached resource-data
    /// node.
    pub fn append_resource(&mut self, buffer: NodeId, resource: NodeId) -> Result<(), AmlError> {
        let object = self.object(buffer)?;
        if !object.is(op::BUFFER, 0) || self.data(resource)?.data_type() != DataType::ResourceData {
            return Err(AmlError::InvalidArgument);
        }
        let end = object
            .var_args()
            .iter()
            .copied()
            .find(|&n| {
                self.data(n).is_ok_and(|d| {
                    d.data_type() == DataType::ResourceData && d.bytes().first().is_some_and(|&header| is_end_tag(header))
                })
            })
            .ok_or(AmlError::InvalidArgument)?;
        self.insert_before(end, resource)
    }

    /// Adds an Extended Interrupt descriptor at the end of
    /// `Name (_CRS, ResourceTemplate () {...})`.
    ///
    /// Returns the new resource-data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `name` is not a `_CRS`
    /// declaration with a resource template, or `irqs` is empty or too
    /// long. Nothing is added on error.
    pub fn name_crs_add_interrupt(
        &mut self,
        name: NodeId,
        flags: InterruptFlags,
        irqs: &[u32],
    ) -> Result<NodeId, AmlError> {
        if !self.is_name_object(name, "_CRS") {
            return Err(AmlError::InvalidArgument);
        }
        let buffer = self.crs_buffer(name)?;
        let bytes = extended_interrupt(flags, irqs)?;
        let node = self.new_resource_data(&bytes)?;
        if let Err(err) = self.append_resource(buffer, node) {
            self.free_subtree(node);
            return Err(err);
        }
        Ok(node)
    }

    fn crs_buffer(&self, name: NodeId) -> Result<NodeId, AmlError> {
        let buffer = self.object(name)?.fixed_arg(1).ok_or(AmlError::InvalidArgument)?;
        if !self.object(buffer)?.is(op::BUFFER, 0) {
            return Err(AmlError::InvalidArgument);
        }
        Ok(buffer)
    }

    /// Copy of the bytes of a resource-data node with large id `id`.
    fn resource_bytes(&self, node: NodeId, id: u8) -> Result<Vec<u8>, AmlError> {
        let data = self.data(node)?;
        if data.data_type() != DataType::ResourceData || descriptor_id(data.bytes()) != Some(DescriptorId::Large(id)) {
            return Err(AmlError::InvalidArgument);
        }
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(data.bytes().len()).map_err(|_| AmlError::OutOfMemory)?;
        bytes.extend_from_slice(data.bytes());
        Ok(bytes)
    }
}
