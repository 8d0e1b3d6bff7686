//! AML opcode grammar table.
//!
//! Every AML statement starts with a one-byte opcode, or with the extended
//! opcode prefix `0x5B` followed by a sub-opcode. The table below records,
//! for each of them, the shape of the encoding that follows: the fixed
//! arguments and their formats, and whether a package length, a list of child
//! objects or a trailing byte list come after them.

use bitflags::bitflags;

/// Raw opcode values used throughout the crate.
pub mod op {
    /// `ZeroOp`.
    pub const ZERO: u8 = 0x00;
    /// `OneOp`.
    pub const ONE: u8 = 0x01;
    /// `AliasOp`.
    pub const ALIAS: u8 = 0x06;
    /// `NameOp`.
    pub const NAME: u8 = 0x08;
    /// `BytePrefix`.
    pub const BYTE_PREFIX: u8 = 0x0A;
    /// `WordPrefix`.
    pub const WORD_PREFIX: u8 = 0x0B;
    /// `DWordPrefix`.
    pub const DWORD_PREFIX: u8 = 0x0C;
    /// `StringPrefix`.
    pub const STRING_PREFIX: u8 = 0x0D;
    /// `QWordPrefix`.
    pub const QWORD_PREFIX: u8 = 0x0E;
    /// `ScopeOp`.
    pub const SCOPE: u8 = 0x10;
    /// `BufferOp`.
    pub const BUFFER: u8 = 0x11;
    /// `PackageOp`.
    pub const PACKAGE: u8 = 0x12;
    /// `VarPackageOp`.
    pub const VAR_PACKAGE: u8 = 0x13;
    /// `MethodOp`.
    pub const METHOD: u8 = 0x14;
    /// `ExternalOp`.
    pub const EXTERNAL: u8 = 0x15;
    /// `DualNamePrefix`.
    pub const DUAL_NAME_PREFIX: u8 = 0x2E;
    /// `MultiNamePrefix`.
    pub const MULTI_NAME_PREFIX: u8 = 0x2F;
    /// `ExtOpPrefix`.
    pub const EXT_OP: u8 = 0x5B;
    /// `RootChar` (`\`).
    pub const ROOT_CHAR: u8 = 0x5C;
    /// `ParentPrefixChar` (`^`).
    pub const PARENT_PREFIX: u8 = 0x5E;
    /// `IfOp`.
    pub const IF: u8 = 0xA0;
    /// `ElseOp`.
    pub const ELSE: u8 = 0xA1;
    /// `WhileOp`.
    pub const WHILE: u8 = 0xA2;
    /// `OnesOp`.
    pub const ONES: u8 = 0xFF;

    /// Sub-opcodes following [`EXT_OP`].
    pub mod ext {
        /// `MutexOp`.
        pub const MUTEX: u8 = 0x01;
        /// `EventOp`.
        pub const EVENT: u8 = 0x02;
        /// `OpRegionOp`.
        pub const REGION: u8 = 0x80;
        /// `FieldOp`.
        pub const FIELD: u8 = 0x81;
        /// `DeviceOp`.
        pub const DEVICE: u8 = 0x82;
        /// `ProcessorOp`.
        pub const PROCESSOR: u8 = 0x83;
        /// `PowerResOp`.
        pub const POWER_RES: u8 = 0x84;
        /// `ThermalZoneOp`.
        pub const THERMAL_ZONE: u8 = 0x85;
        /// `IndexFieldOp`.
        pub const INDEX_FIELD: u8 = 0x86;
        /// `BankFieldOp`.
        pub const BANK_FIELD: u8 = 0x87;
        /// `DataRegionOp`.
        pub const DATA_REGION: u8 = 0x88;
    }
}

/// Maximum number of fixed arguments any AML statement takes.
pub const MAX_FIXED_ARGS: usize = 6;

/// Format of one fixed argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgFormat {
    /// The slot is unused.
    None,
    /// A 1-byte unsigned integer.
    Uint8,
    /// A 2-byte little-endian unsigned integer.
    Uint16,
    /// A 4-byte little-endian unsigned integer.
    Uint32,
    /// An 8-byte little-endian unsigned integer.
    Uint64,
    /// A NameString.
    Name,
    /// A null-terminated ASCII string.
    String,
    /// A nested statement (TermArg, DataRefObject, SuperName...).
    Object,
}

impl ArgFormat {
    /// Returns the byte width of the integer formats.
    #[must_use]
    pub const fn int_width(self) -> Option<usize> {
        match self {
            Self::Uint8 => Some(1),
            Self::Uint16 => Some(2),
            Self::Uint32 => Some(4),
            Self::Uint64 => Some(8),
            _ => None,
        }
    }
}

bitflags! {
    /// Encoding attributes of an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpAttributes: u32 {
        /// A PkgLength follows the opcode.
        const HAS_PKG_LENGTH = 0x0000_0001;
        /// The byte is part of a NameString rather than a statement.
        const IS_NAME_CHAR = 0x0000_0002;
        /// A list of child statements follows the fixed arguments.
        const HAS_CHILD_OBJ = 0x0000_0004;
        /// A byte list follows the fixed arguments.
        const HAS_BYTE_LIST = 0x0000_0008;
        /// The first fixed argument declares a name in the namespace.
        const IN_NAMESPACE = 0x0001_0000;
    }
}

/// Encoding descriptor of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpEncoding {
    /// ASL mnemonic, for diagnostics.
    pub name: &'static str,
    /// Opcode byte.
    pub op: u8,
    /// Sub-opcode byte; only meaningful when `op` is [`op::EXT_OP`].
    pub sub_op: u8,
    /// Number of fixed arguments.
    pub max_index: u8,
    /// Format of each fixed argument.
    pub formats: [ArgFormat; MAX_FIXED_ARGS],
    /// Encoding attributes.
    pub attrs: OpAttributes,
}

impl OpEncoding {
    /// Returns `true` if all of `attrs` are set.
    #[must_use]
    pub const fn has(&self, attrs: OpAttributes) -> bool {
        self.attrs.contains(attrs)
    }

    /// Returns `true` for two-byte (`ExtOpPrefix`) opcodes.
    #[must_use]
    pub const fn is_ext(&self) -> bool {
        self.op == op::EXT_OP
    }

    /// Number of bytes taken by the opcode itself.
    #[must_use]
    pub const fn opcode_len(&self) -> usize {
        if self.is_ext() { 2 } else { 1 }
    }

    /// Returns `true` if this entry is `(op, sub_op)`.
    ///
    /// `sub_op` is ignored for single-byte opcodes.
    #[must_use]
    pub const fn matches(&self, op: u8, sub_op: u8) -> bool {
        self.op == op && (!self.is_ext() || self.sub_op == sub_op)
    }

    /// Format of fixed argument `index`, or [`ArgFormat::None`] past the end.
    #[must_use]
    pub const fn format(&self, index: usize) -> ArgFormat {
        if index < self.max_index as usize {
            self.formats[index]
        } else {
            ArgFormat::None
        }
    }

    /// Returns the used prefix of the fixed-argument formats.
    #[must_use]
    pub fn fixed_formats(&self) -> &[ArgFormat] {
        &self.formats[..self.max_index as usize]
    }
}

const NS: OpAttributes = OpAttributes::IN_NAMESPACE;
const PKG: OpAttributes = OpAttributes::HAS_PKG_LENGTH;
const CHILD: OpAttributes = OpAttributes::HAS_CHILD_OBJ;
const BYTES: OpAttributes = OpAttributes::HAS_BYTE_LIST;
const NAME_CHAR: OpAttributes = OpAttributes::IS_NAME_CHAR;
const NONE: OpAttributes = OpAttributes::empty();

const PKG_CHILD: OpAttributes = PKG.union(CHILD);
const PKG_CHILD_NS: OpAttributes = PKG_CHILD.union(NS);
const PKG_BYTES: OpAttributes = PKG.union(BYTES);

use ArgFormat::{Name as N, Object as O, String as S, Uint8 as U8, Uint16 as U16, Uint32 as U32, Uint64 as U64};

#[allow(clippy::cast_possible_truncation)]
const fn entry(
    name: &'static str,
    op: u8,
    sub_op: u8,
    args: &[ArgFormat],
    attrs: OpAttributes,
) -> OpEncoding {
    let mut formats = [ArgFormat::None; MAX_FIXED_ARGS];
    let mut i = 0;
    while i < args.len() {
        formats[i] = args[i];
        i += 1;
    }
    OpEncoding {
        name,
        op,
        sub_op,
        max_index: args.len() as u8,
        formats,
        attrs,
    }
}

const fn ext(name: &'static str, sub_op: u8, args: &[ArgFormat], attrs: OpAttributes) -> OpEncoding {
    entry(name, op::EXT_OP, sub_op, args, attrs)
}

/// The grammar table, sorted by `(op, sub_op)`.
pub static GRAMMAR: &[OpEncoding] = &[
    entry("Zero", op::ZERO, 0, &[], NONE),
    entry("One", op::ONE, 0, &[], NONE),
    entry("Alias", op::ALIAS, 0, &[N, N], NS),
    entry("Name", op::NAME, 0, &[N, O], NS),
    entry("BytePrefix", op::BYTE_PREFIX, 0, &[U8], NONE),
    entry("WordPrefix", op::WORD_PREFIX, 0, &[U16], NONE),
    entry("DWordPrefix", op::DWORD_PREFIX, 0, &[U32], NONE),
    entry("StringPrefix", op::STRING_PREFIX, 0, &[S], NONE),
    entry("QWordPrefix", op::QWORD_PREFIX, 0, &[U64], NONE),
    entry("Scope", op::SCOPE, 0, &[N], PKG_CHILD_NS),
    entry("Buffer", op::BUFFER, 0, &[O], PKG_BYTES),
    entry("Package", op::PACKAGE, 0, &[U8], PKG_CHILD),
    entry("VarPackage", op::VAR_PACKAGE, 0, &[O], PKG_CHILD),
    entry("Method", op::METHOD, 0, &[N, U8], PKG_CHILD_NS),
    entry("External", op::EXTERNAL, 0, &[N, U8, U8], NS),
    entry("DualNamePrefix", op::DUAL_NAME_PREFIX, 0, &[], NAME_CHAR),
    entry("MultiNamePrefix", op::MULTI_NAME_PREFIX, 0, &[], NAME_CHAR),
    ext("Mutex", op::ext::MUTEX, &[N, U8], NS),
    ext("Event", op::ext::EVENT, &[N], NS),
    ext("CondRefOf", 0x12, &[O, O], NONE),
    ext("CreateField", 0x13, &[O, O, O, N], NONE),
    ext("LoadTable", 0x1F, &[O, O, O, O, O, O], NONE),
    ext("Load", 0x20, &[N, O], NONE),
    ext("Stall", 0x21, &[O], NONE),
    ext("Sleep", 0x22, &[O], NONE),
    ext("Acquire", 0x23, &[O, U16], NONE),
    ext("Signal", 0x24, &[O], NONE),
    ext("Wait", 0x25, &[O, O], NONE),
    ext("Reset", 0x26, &[O], NONE),
    ext("Release", 0x27, &[O], NONE),
    ext("FromBCD", 0x28, &[O, O], NONE),
    ext("ToBCD", 0x29, &[O, O], NONE),
    ext("Unload", 0x2A, &[O], NONE),
    ext("Revision", 0x30, &[], NONE),
    ext("Debug", 0x31, &[], NONE),
    ext("Fatal", 0x32, &[U8, U32, O], NONE),
    ext("Timer", 0x33, &[], NONE),
    ext("OperationRegion", op::ext::REGION, &[N, U8, O, O], NS),
    ext("Field", op::ext::FIELD, &[N, U8], PKG_BYTES),
    ext("Device", op::ext::DEVICE, &[N], PKG_CHILD_NS),
    ext("Processor", op::ext::PROCESSOR, &[N, U8, U32, U8], PKG_CHILD_NS),
    ext("PowerResource", op::ext::POWER_RES, &[N, U8, U16], PKG_CHILD_NS),
    ext("ThermalZone", op::ext::THERMAL_ZONE, &[N], PKG_CHILD_NS),
    ext("IndexField", op::ext::INDEX_FIELD, &[N, N, U8], PKG_BYTES),
    ext("BankField", op::ext::BANK_FIELD, &[N, N, O, U8], PKG_BYTES),
    ext("DataTableRegion", op::ext::DATA_REGION, &[N, O, O, O], NS),
    entry("RootChar", op::ROOT_CHAR, 0, &[], NAME_CHAR),
    entry("ParentPrefixChar", op::PARENT_PREFIX, 0, &[], NAME_CHAR),
    entry("NameChar", b'_', 0, &[], NAME_CHAR),
    entry("Local0", 0x60, 0, &[], NONE),
    entry("Local1", 0x61, 0, &[], NONE),
    entry("Local2", 0x62, 0, &[], NONE),
    entry("Local3", 0x63, 0, &[], NONE),
    entry("Local4", 0x64, 0, &[], NONE),
    entry("Local5", 0x65, 0, &[], NONE),
    entry("Local6", 0x66, 0, &[], NONE),
    entry("Local7", 0x67, 0, &[], NONE),
    entry("Arg0", 0x68, 0, &[], NONE),
    entry("Arg1", 0x69, 0, &[], NONE),
    entry("Arg2", 0x6A, 0, &[], NONE),
    entry("Arg3", 0x6B, 0, &[], NONE),
    entry("Arg4", 0x6C, 0, &[], NONE),
    entry("Arg5", 0x6D, 0, &[], NONE),
    entry("Arg6", 0x6E, 0, &[], NONE),
    entry("Store", 0x70, 0, &[O, O], NONE),
    entry("RefOf", 0x71, 0, &[O], NONE),
    entry("Add", 0x72, 0, &[O, O, O], NONE),
    entry("Concatenate", 0x73, 0, &[O, O, O], NONE),
    entry("Subtract", 0x74, 0, &[O, O, O], NONE),
    entry("Increment", 0x75, 0, &[O], NONE),
    entry("Decrement", 0x76, 0, &[O], NONE),
    entry("Multiply", 0x77, 0, &[O, O, O], NONE),
    entry("Divide", 0x78, 0, &[O, O, O, O], NONE),
    entry("ShiftLeft", 0x79, 0, &[O, O, O], NONE),
    entry("ShiftRight", 0x7A, 0, &[O, O, O], NONE),
    entry("And", 0x7B, 0, &[O, O, O], NONE),
    entry("NAnd", 0x7C, 0, &[O, O, O], NONE),
    entry("Or", 0x7D, 0, &[O, O, O], NONE),
    entry("NOr", 0x7E, 0, &[O, O, O], NONE),
    entry("XOr", 0x7F, 0, &[O, O, O], NONE),
    entry("Not", 0x80, 0, &[O, O], NONE),
    entry("FindSetLeftBit", 0x81, 0, &[O, O], NONE),
    entry("FindSetRightBit", 0x82, 0, &[O, O], NONE),
    entry("DerefOf", 0x83, 0, &[O], NONE),
    entry("ConcatenateResTemplate", 0x84, 0, &[O, O, O], NONE),
    entry("Mod", 0x85, 0, &[O, O, O], NONE),
    entry("Notify", 0x86, 0, &[O, O], NONE),
    entry("SizeOf", 0x87, 0, &[O], NONE),
    entry("Index", 0x88, 0, &[O, O, O], NONE),
    entry("Match", 0x89, 0, &[O, U8, O, U8, O, O], NONE),
    entry("CreateDWordField", 0x8A, 0, &[O, O, N], NONE),
    entry("CreateWordField", 0x8B, 0, &[O, O, N], NONE),
    entry("CreateByteField", 0x8C, 0, &[O, O, N], NONE),
    entry("CreateBitField", 0x8D, 0, &[O, O, N], NONE),
    entry("ObjectType", 0x8E, 0, &[O], NONE),
    entry("CreateQWordField", 0x8F, 0, &[O, O, N], NONE),
    entry("LAnd", 0x90, 0, &[O, O], NONE),
    entry("LOr", 0x91, 0, &[O, O], NONE),
    entry("LNot", 0x92, 0, &[O], NONE),
    entry("LEqual", 0x93, 0, &[O, O], NONE),
    entry("LGreater", 0x94, 0, &[O, O], NONE),
    entry("LLess", 0x95, 0, &[O, O], NONE),
    entry("ToBuffer", 0x96, 0, &[O, O], NONE),
    entry("ToDecimalString", 0x97, 0, &[O, O], NONE),
    entry("ToHexString", 0x98, 0, &[O, O], NONE),
    entry("ToInteger", 0x99, 0, &[O, O], NONE),
    entry("ToString", 0x9C, 0, &[O, O, O], NONE),
    entry("CopyObject", 0x9D, 0, &[O, O], NONE),
    entry("Mid", 0x9E, 0, &[O, O, O, O], NONE),
    entry("Continue", 0x9F, 0, &[], NONE),
    entry("If", op::IF, 0, &[O], PKG_CHILD),
    entry("Else", op::ELSE, 0, &[], PKG_CHILD),
    entry("While", op::WHILE, 0, &[O], PKG_CHILD),
    entry("Noop", 0xA3, 0, &[], NONE),
    entry("Return", 0xA4, 0, &[O], NONE),
    entry("Break", 0xA5, 0, &[], NONE),
    entry("BreakPoint", 0xCC, 0, &[], NONE),
    entry("Ones", op::ONES, 0, &[], NONE),
];

/// Name characters `A`-`Z`, kept apart from [`GRAMMAR`] to avoid 26
/// near-identical rows.
#[allow(clippy::cast_possible_truncation)]
static UPPER_NAME_CHARS: [OpEncoding; 26] = {
    let mut table = [entry("NameChar", b'A', 0, &[], NAME_CHAR); 26];
    let mut i = 0;
    while i < table.len() {
        table[i].op = b'A' + i as u8;
        i += 1;
    }
    table
};

/// Looks up the encoding of `(op, sub_op)`.
///
/// `sub_op` is only consulted when `op` is [`op::EXT_OP`]. Returns `None` for
/// bytes that do not start any AML construct.
#[must_use]
pub fn lookup(op: u8, sub_op: u8) -> Option<&'static OpEncoding> {
    if op.is_ascii_uppercase() {
        return Some(&UPPER_NAME_CHARS[usize::from(op - b'A')]);
    }
    GRAMMAR.iter().find(|enc| enc.matches(op, sub_op))
}

/// Looks up the encoding at the start of `stream`.
///
/// Returns `None` if the stream is empty, the opcode is unknown, or an
/// extended opcode is missing its sub-opcode byte.
#[must_use]
pub fn lookup_stream(stream: &[u8]) -> Option<&'static OpEncoding> {
    let (&op, rest) = stream.split_first()?;
    if op == op::EXT_OP {
        lookup(op, *rest.first()?)
    } else {
        lookup(op, 0)
    }
}

/// Returns `true` if `byte` can start a NameString.
#[must_use]
pub fn is_name_char(byte: u8) -> bool {
    lookup(byte, 0).is_some_and(|enc| enc.has(OpAttributes::IS_NAME_CHAR))
}

/// Returns `true` if `byte` is a valid NameSeg lead character (`A`-`Z`, `_`).
#[must_use]
pub const fn is_lead_name_char(byte: u8) -> bool {
    byte.is_ascii_uppercase() || byte == b'_'
}

/// Returns `true` if `byte` is a valid NameSeg character (`A`-`Z`, `_`, `0`-`9`).
#[must_use]
pub const fn is_seg_char(byte: u8) -> bool {
    is_lead_name_char(byte) || byte.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        for pair in GRAMMAR.windows(2) {
            let a = (pair[0].op, pair[0].sub_op);
            let b = (pair[1].op, pair[1].sub_op);
            assert!(a < b, "{} must sort before {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn lookup_single_and_extended() {
        let scope = lookup(op::SCOPE, 0).unwrap();
        assert_eq!(scope.name, "Scope");
        assert!(scope.has(OpAttributes::HAS_PKG_LENGTH | OpAttributes::IN_NAMESPACE));
        assert_eq!(scope.fixed_formats(), &[ArgFormat::Name]);

        let device = lookup_stream(&[0x5B, 0x82, 0x00]).unwrap();
        assert_eq!(device.name, "Device");
        assert_eq!(device.opcode_len(), 2);

        // A missing sub-opcode is not a match.
        assert!(lookup_stream(&[0x5B]).is_none());
        assert!(lookup(op::EXT_OP, 0x7F).is_none());
    }

    #[test]
    fn unknown_bytes_are_not_found() {
        for byte in [0x02, 0x03, 0x04, 0x05, 0x07, 0x09, 0x16, 0x30, 0x9A, 0x9B, 0xA6, 0xFE] {
            assert!(lookup(byte, 0).is_none(), "0x{byte:02X}");
        }
    }

    #[test]
    fn name_chars() {
        for byte in [b'A', b'Z', b'_', b'\\', b'^', 0x2E, 0x2F] {
            assert!(is_name_char(byte), "0x{byte:02X}");
        }
        assert!(!is_name_char(b'0'));
        assert!(!is_name_char(op::ZERO));
        assert_eq!(lookup(b'Q', 0).unwrap().op, b'Q');
    }

    #[test]
    fn integer_formats_have_widths() {
        assert_eq!(ArgFormat::Uint16.int_width(), Some(2));
        assert_eq!(ArgFormat::Name.int_width(), None);
        let fatal = lookup(op::EXT_OP, 0x32).unwrap();
        assert_eq!(fatal.format(1), ArgFormat::Uint32);
        assert_eq!(fatal.format(5), ArgFormat::None);
    }

    #[test]
    fn used_formats_are_never_none() {
        for encoding in GRAMMAR.iter().chain(UPPER_NAME_CHARS.iter()) {
            assert!(
                !encoding.fixed_formats().contains(&ArgFormat::None),
                "{} has an empty fixed slot",
                encoding.name
            );
        }
    }
}
