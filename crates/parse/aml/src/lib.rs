//! `hadron-aml` --- a round-trippable AML decoder, tree editor and encoder.
//!
//! This crate turns an ACPI definition block (DSDT or SSDT) into an editable
//! tree and back into bytes. Decoding keeps every byte of the original
//! stream, so an unmodified tree serializes to the identical table. Edits
//! (inserting, removing or replacing nodes, rewriting data) keep every
//! enclosing PkgLength, `Buffer` size, `Package` element count and the
//! header length consistent, widening or narrowing their encodings as
//! needed.
//!
//! The crate is `no_std` and uses `alloc` for the node arena. It does not
//! evaluate AML: names are resolved statically from the declarations in
//! the tree.
//!
//! # Usage
//!
//! ```ignore
//! let mut tree = AmlTree::parse(ssdt_template)?;
//! let uid = tree.find(tree.root(), "\\_SB.CMN0._UID")?;
//! tree.name_uid_update_value(uid, 3)?;
//!
//! let crs = tree.find(tree.root(), "\\_SB.CMN0._CRS")?;
//! tree.name_crs_add_interrupt(crs, InterruptFlags::CONSUMER | InterruptFlags::EDGE_TRIGGERED, &[0x29])?;
//!
//! let table = tree.serialize_to_vec()?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod field;
pub mod grammar;
mod helpers;
pub mod log;
pub mod name;
mod namespace;
pub mod parser;
pub mod pkglen;
pub mod print;
pub mod resource;
pub mod sdt;
mod serialize;
pub mod tree;

// Re-export key types at crate root for convenience.
pub use error::{AmlError, ErrorKind};
pub use field::FieldElement;
pub use grammar::{ArgFormat, OpAttributes, OpEncoding};
pub use name::{NameSeg, NameString};
pub use parser::ParseConfig;
pub use print::TreeDisplay;
pub use resource::descriptor::{Descriptor, InterruptFlags};
pub use sdt::SdtHeader;
pub use tree::{AmlTree, Cursor, DataType, IterMode, NodeId, NodeType};
