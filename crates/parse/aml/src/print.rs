//! Indented dump of a subtree, for debugging.
//!
//! ```text
//! DefinitionBlock SSDT length=0x38
//!   Scope pkg_len=0x13
//!     NameString \_SB
//!     Device pkg_len=0xB
//!       NameString DEV0
//!       Name
//!         NameString _UID
//!         Zero
//! ```

use core::fmt;

use crate::name::NameString;
use crate::tree::{AmlTree, DataNode, DataType, NodeId, NodeKind};

/// [`Display`](fmt::Display) adapter returned by [`AmlTree::display`].
#[derive(Debug, Clone, Copy)]
pub struct TreeDisplay<'t> {
    tree: &'t AmlTree,
    node: NodeId,
}

impl AmlTree {
    /// Renders the subtree at `node`, one node per line.
    #[must_use]
    pub const fn display(&self, node: NodeId) -> TreeDisplay<'_> {
        TreeDisplay { tree: self, node }
    }
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self.tree, self.node, 0)
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, tree: &AmlTree, id: NodeId, depth: usize) -> fmt::Result {
    let Some(node) = tree.get(id) else {
        return writeln!(f, "{:indent$}<stale>", "", indent = depth * 2);
    };
    write!(f, "{:indent$}", "", indent = depth * 2)?;
    match node.kind() {
        NodeKind::Root(_) => {
            let header = tree.header();
            writeln!(
                f,
                "DefinitionBlock {} length={:#X}",
                header.signature().escape_ascii(),
                header.length()
            )?;
        }
        NodeKind::Object(object) => {
            f.write_str(object.encoding().name)?;
            if let Some(pkg_len) = object.pkg_len() {
                write!(f, " pkg_len={pkg_len:#X}")?;
            }
            writeln!(f)?;
        }
        NodeKind::Data(data) => write_data(f, data)?,
    }
    for child in node.children() {
        write_node(f, tree, child, depth + 1)?;
    }
    Ok(())
}

fn write_data(f: &mut fmt::Formatter<'_>, data: &DataNode) -> fmt::Result {
    let bytes = data.bytes();
    match data.data_type() {
        DataType::NameString => {
            if let Ok(name) = NameString::parse_exact(bytes) {
                return writeln!(f, "NameString {name}");
            }
        }
        DataType::String => {
            let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
            return writeln!(f, "String \"{}\"", text.escape_ascii());
        }
        DataType::Uint => {
            if let Some(value) = data.uint() {
                return writeln!(f, "Uint{} {value:#X}", bytes.len() * 8);
            }
        }
        DataType::Raw | DataType::ResourceData | DataType::FieldElement => {}
    }
    write!(f, "{:?}", data.data_type())?;
    for byte in bytes {
        write!(f, " {byte:02X}")?;
    }
    writeln!(f)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::string::ToString;

    use super::*;
    use crate::grammar::op;
    use crate::sdt::{SSDT_SIGNATURE, SdtHeader};

    #[test]
    fn dump_layout() {
        let mut tree = AmlTree::new(SdtHeader::new(SSDT_SIGNATURE, 2, *b"HADRON", *b"PRINT   ", 1));
        let root = tree.root();
        let name = tree.decode_statement(b"\x08_HID\x0DPNP0A08\x00").unwrap();
        tree.insert_tail(root, name).unwrap();
        let buffer = tree.decode_statement(&[op::BUFFER, 0x05, 0x0A, 0x02, 0x79, 0x00]).unwrap();
        tree.insert_tail(root, buffer).unwrap();

        let text = tree.display(root).to_string();
        let lines: std::vec::Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "DefinitionBlock SSDT length=0x38",
                "  Name",
                "    NameString _HID",
                "    StringPrefix",
                "      String \"PNP0A08\"",
                "  Buffer pkg_len=0x5",
                "    BytePrefix",
                "      Uint8 0x2",
                "    Raw 79 00",
            ]
        );
    }
}
