//! Type tree decoding - the per-type field layout description.
//!
//! A type tree describes the on-disk layout of one object type: one node
//! per field, carrying the field's wire type name, field name, byte size,
//! and transfer flags. Two encodings exist:
//!
//! * **Recursive** (before [`FormatVersion::Unknown12`], except
//!   [`FormatVersion::Unknown10`]) - each node is written inline with its
//!   string fields, followed by a child count and the children themselves.
//! * **Flattened** ([`FormatVersion::Unknown10`] and
//!   [`FormatVersion::Unknown12`]+) - a node count, a fixed-width record
//!   per node, and one shared string buffer. String fields are offsets:
//!   the top bit clear means an offset into the file-local buffer, the top
//!   bit set means the low 31 bits index the compiled-in
//!   [common string table](crate::strings).
//!
//! Both encodings produce the same in-memory form: a flat `Vec` of nodes in
//! depth-first pre-order, each tagged with its nesting level. That sequence
//! *is* the wire format's shape - it is never reified into a linked tree.
//! Consumers recover parent/child structure by scanning level transitions
//! (see [`TypeTree::children`]).

use std::io::{Read, Seek};

use crate::reader::{EndianReader, null_string_at};
use crate::strings::common_string;
use crate::version::FormatVersion;
use crate::Result;

/// Transfer flags attached to every type tree node.
///
/// A bitset in the engine's serialization layer; only a handful of bits
/// matter to readers, most importantly [`TransferMetaFlags::ALIGN_BYTES`],
/// which forces 4-byte alignment after the field's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferMetaFlags(pub i32);

impl TransferMetaFlags {
    pub const NONE: Self = Self(0);
    pub const HIDE_IN_EDITOR: Self = Self(0x1);
    pub const NOT_EDITABLE: Self = Self(0x10);
    pub const STRONG_PPTR: Self = Self(0x40);
    pub const TREAT_INTEGER_AS_BOOLEAN: Self = Self(0x100);
    pub const DEBUG_PROPERTY: Self = Self(0x1000);
    pub const ALIGN_BYTES: Self = Self(0x4000);
    pub const ANY_CHILD_USES_ALIGN_BYTES: Self = Self(0x8000);

    /// Whether all of `other`'s bits are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the field's data is followed by alignment padding.
    pub const fn is_aligned(self) -> bool {
        self.contains(Self::ALIGN_BYTES)
    }
}

/// One field in a type's layout description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTreeNode {
    /// Nesting depth; the root is level 0.
    pub level: u8,
    /// Wire type name, e.g. `"int"` or `"PPtr<GameObject>"`.
    pub type_name: String,
    /// Field name, e.g. `"m_Name"`.
    pub name: String,
    /// Serialized size of the field in bytes, `-1` when variable.
    pub byte_size: i32,
    /// Ordinal of the node within its tree. Not transmitted at
    /// [`FormatVersion::Unknown3`], where it stays 0.
    pub index: i32,
    /// Type flags (bit 0 marks an array).
    pub type_flags: i32,
    /// Version of the field's own layout.
    pub version: i32,
    /// Transfer flags. Not transmitted at [`FormatVersion::Unknown3`].
    pub meta_flags: TransferMetaFlags,
    /// Hash identifying a referenced type; present at
    /// [`FormatVersion::TypeTreeNodeWithTypeFlags`] and later in the
    /// flattened encoding.
    pub ref_type_hash: Option<u64>,
}

/// A type's complete field layout: nodes in depth-first pre-order with
/// level tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTree {
    pub nodes: Vec<TypeTreeNode>,
}

impl TypeTree {
    /// Decode a type tree in the encoding implied by `version`.
    pub fn parse<R: Read + Seek>(
        r: &mut EndianReader<R>,
        version: FormatVersion,
    ) -> Result<Self> {
        if version >= FormatVersion::Unknown12 || version == FormatVersion::Unknown10 {
            Self::parse_blob(r, version)
        } else {
            let mut tree = TypeTree::default();
            tree.parse_node(r, version, 0)?;
            Ok(tree)
        }
    }

    /// Recursive encoding: one node inline, then its children, appended
    /// depth-first so the flat sequence matches the flattened encoding's
    /// order.
    fn parse_node<R: Read + Seek>(
        &mut self,
        r: &mut EndianReader<R>,
        version: FormatVersion,
        level: u8,
    ) -> Result<()> {
        let type_name = r.null_string()?;
        let name = r.null_string()?;
        let byte_size = r.i32()?;
        if version == FormatVersion::Unknown2 {
            let _variable_count = r.i32()?;
        }
        let index = if version == FormatVersion::Unknown3 {
            0
        } else {
            r.i32()?
        };
        let type_flags = r.i32()?;
        let node_version = r.i32()?;
        let meta_flags = if version == FormatVersion::Unknown3 {
            TransferMetaFlags::NONE
        } else {
            TransferMetaFlags(r.i32()?)
        };

        self.nodes.push(TypeTreeNode {
            level,
            type_name,
            name,
            byte_size,
            index,
            type_flags,
            version: node_version,
            meta_flags,
            ref_type_hash: None,
        });

        let children = r.count()?;
        for _ in 0..children {
            self.parse_node(r, version, level + 1)?;
        }
        Ok(())
    }

    /// Flattened encoding: fixed-width node records followed by one shared
    /// string buffer.
    fn parse_blob<R: Read + Seek>(
        r: &mut EndianReader<R>,
        version: FormatVersion,
    ) -> Result<Self> {
        let node_count = r.count()?;
        let string_buffer_size = r.count()?;

        // String fields are raw offsets until the buffer is available.
        let mut records = Vec::with_capacity(node_count);
        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let node_version = r.u16()?;
            let level = r.u8()?;
            let type_flags = r.u8()?;
            let type_str_offset = r.u32()?;
            let name_str_offset = r.u32()?;
            let byte_size = r.i32()?;
            let index = r.i32()?;
            let meta_flags = TransferMetaFlags(r.i32()?);
            let ref_type_hash = if version >= FormatVersion::TypeTreeNodeWithTypeFlags {
                Some(r.u64()?)
            } else {
                None
            };
            records.push((type_str_offset, name_str_offset));
            nodes.push(TypeTreeNode {
                level,
                type_name: String::new(),
                name: String::new(),
                byte_size,
                index,
                type_flags: type_flags as i32,
                version: node_version as i32,
                meta_flags,
                ref_type_hash,
            });
        }

        let string_buffer = r.bytes(string_buffer_size)?;
        for (node, (type_off, name_off)) in nodes.iter_mut().zip(records) {
            node.type_name = resolve_string(&string_buffer, type_off)?;
            node.name = resolve_string(&string_buffer, name_off)?;
        }

        Ok(TypeTree { nodes })
    }

    /// Indices of the direct children of `parent`.
    ///
    /// Scans forward from `parent` until the level returns to the parent's
    /// level, yielding nodes exactly one level deeper.
    pub fn children(&self, parent: usize) -> impl Iterator<Item = usize> + '_ {
        let parent_level = self.nodes[parent].level;
        self.nodes[parent + 1..]
            .iter()
            .enumerate()
            .take_while(move |(_, n)| n.level > parent_level)
            .filter(move |(_, n)| n.level == parent_level + 1)
            .map(move |(i, _)| parent + 1 + i)
    }
}

/// Resolve one flattened-encoding string field.
///
/// Top bit clear: literal byte offset into the file-local buffer. Top bit
/// set: the low 31 bits index the shared table; unrecognized indices fall
/// back to the decimal form of the index itself rather than failing, so
/// files written by newer engines stay readable.
fn resolve_string(buffer: &[u8], value: u32) -> Result<String> {
    if value & 0x8000_0000 == 0 {
        return null_string_at(buffer, value);
    }
    let index = value & 0x7FFF_FFFF;
    match common_string(index) {
        Some(s) => Ok(s.to_owned()),
        None => {
            tracing::debug!(index, "string index not in shared table, keeping raw index");
            Ok(index.to_string())
        }
    }
}
