//! Serialized type records - the per-class entries of the type table.
//!
//! Every object in a file is described by one of these records. What a
//! record contains has grown steadily: a bare class id in the earliest
//! revisions, then stripped-type and script-index markers, then layout
//! hashes, an embedded [`TypeTree`], and finally dependency information.
//! Reference types (entries of the reference type table, not the main type
//! table) share the same decoder but carry name/namespace/assembly strings
//! where ordinary types carry a dependency index list.

use std::io::{Read, Seek};

use crate::Result;
use crate::reader::EndianReader;
use crate::typetree::TypeTree;
use crate::version::FormatVersion;

/// Class id of `MonoBehaviour`, the host class for user script data.
const MONO_BEHAVIOUR: i32 = 114;

/// Managed type identity carried by reference type entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTypeInfo {
    pub class_name: String,
    pub namespace: String,
    pub assembly_name: String,
}

/// One entry of the type (or reference type) table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedType {
    /// Numeric class id. Before [`FormatVersion::RefactoredClassId`],
    /// script types are encoded as negative ids; afterwards scripts are
    /// always `MonoBehaviour` (class 114) with a separate script index.
    pub class_id: i32,
    /// Whether the type was stripped from the build. Absent before
    /// [`FormatVersion::RefactoredClassId`].
    pub is_stripped_type: Option<bool>,
    /// Index into the script type table. Absent before
    /// [`FormatVersion::RefactorTypeData`]; `-1` means "not a script".
    pub script_type_index: Option<i16>,
    /// Hash identifying the script backing this type, when it has one.
    pub script_id: Option<[u8; 16]>,
    /// Hash of the type's layout in the build that wrote the file.
    pub old_type_hash: Option<[u8; 16]>,
    /// Field layout. `None` when the file was written without type trees.
    pub tree: Option<TypeTree>,
    /// Indices of types this type depends on. Ordinary types only, at
    /// [`FormatVersion::StoresTypeDependencies`] and later.
    pub type_dependencies: Option<Vec<i32>>,
    /// Managed identity. Reference types only, at
    /// [`FormatVersion::StoresTypeDependencies`] and later. Mutually
    /// exclusive with `type_dependencies`.
    pub ref_type_info: Option<RefTypeInfo>,
}

impl SerializedType {
    /// Decode one type record.
    ///
    /// `is_ref_type` selects the reference-type variant of the trailing
    /// dependency data; `type_tree_enabled` is the per-file flag read from
    /// the metadata (true when the file predates the flag).
    pub fn parse<R: Read + Seek>(
        r: &mut EndianReader<R>,
        version: FormatVersion,
        type_tree_enabled: bool,
        is_ref_type: bool,
    ) -> Result<Self> {
        let class_id = r.i32()?;

        let is_stripped_type = if version >= FormatVersion::RefactoredClassId {
            Some(r.boolean()?)
        } else {
            None
        };

        let script_type_index = if version >= FormatVersion::RefactorTypeData {
            Some(r.i16()?)
        } else {
            None
        };

        let mut script_id = None;
        let mut old_type_hash = None;
        if version >= FormatVersion::HasTypeTreeHashes {
            if has_script_id(version, class_id, script_type_index, is_ref_type) {
                script_id = Some(r.bytes_array::<16>()?);
            }
            old_type_hash = Some(r.bytes_array::<16>()?);
        }

        let mut tree = None;
        let mut type_dependencies = None;
        let mut ref_type_info = None;
        if type_tree_enabled {
            tree = Some(TypeTree::parse(r, version)?);
            if version >= FormatVersion::StoresTypeDependencies {
                if is_ref_type {
                    ref_type_info = Some(RefTypeInfo {
                        class_name: r.null_string()?,
                        namespace: r.null_string()?,
                        assembly_name: r.null_string()?,
                    });
                } else {
                    type_dependencies = Some(r.i32_array()?);
                }
            }
        }

        Ok(Self {
            class_id,
            is_stripped_type,
            script_type_index,
            script_id,
            old_type_hash,
            tree,
            type_dependencies,
            ref_type_info,
        })
    }
}

/// Whether a type record carries a 16-byte script hash.
///
/// Reference types carry one when they point at a live script slot. For
/// ordinary types the class id itself signals "scripted", but the encoding
/// changed at [`FormatVersion::RefactoredClassId`]: before it, script
/// classes are negative; from it on, scripts are always `MonoBehaviour`.
fn has_script_id(
    version: FormatVersion,
    class_id: i32,
    script_type_index: Option<i16>,
    is_ref_type: bool,
) -> bool {
    if is_ref_type && matches!(script_type_index, Some(i) if i >= 0) {
        return true;
    }
    if version < FormatVersion::RefactoredClassId {
        class_id < 0
    } else {
        class_id == MONO_BEHAVIOUR
    }
}
