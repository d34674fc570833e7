//! Serialized file container - header, object index, and reference tables.
//!
//! A serialized file is one archive of scene/asset object data. The
//! container holds no object payloads itself; it describes where each
//! object lives in the data region, what type it has, and which other files
//! it depends on.
//!
//! ## Layout (modern revisions)
//! ```text
//! [0x00] MetadataSize          (u32 BE)
//! [0x04] FileSize              (u32 BE)
//! [0x08] Version               (u32 BE) - see FormatVersion
//! [0x0C] DataOffset            (u32 BE)
//! [0x10] Endianness + reserved (4 bytes; 0 = metadata is little-endian)
//! [....] 64-bit upgrades of MetadataSize/FileSize/DataOffset (v22+)
//! [....] EngineVersion (cstr), Platform (i32), TypeTreeEnabled (bool)
//! [....] Types[]        - class ids, hashes, embedded type trees
//! [....] Objects[]      - path id, offset, size, type reference
//! [....] ScriptTypes[]  - file-local script slots
//! [....] Externals[]    - GUID + path of referenced files
//! [....] RefTypes[]     - reference type table (v20+)
//! [....] UserInformation (cstr)
//! [DataOffset] object data region
//! ```
//!
//! Before [`FormatVersion::Unknown9`] the endianness byte and the whole
//! metadata block live at the *tail* of the file (at
//! `FileSize - MetadataSize`) instead of following the header.
//!
//! Every stage's shape depends only on the version marker and flags already
//! decoded, never on look-ahead; decoding is one strict left-to-right pass
//! over the stream and the result is immutable.

use std::io::{self, Read, Seek, Write};

use byteorder::{BigEndian, WriteBytesExt};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Stage, TypeBindingError};
use crate::platform::BuildTarget;
use crate::reader::{Endian, EndianReader};
use crate::types::SerializedType;
use crate::version::{FormatVersion, UnityVersion};
use crate::{Error, Result};

/// The fixed envelope at the start of every serialized file.
///
/// The four 32-bit preamble fields exist in every revision ever shipped.
/// At [`FormatVersion::LargeFilesSupport`] the size and offset fields are
/// re-transmitted as 64-bit values and the 32-bit slots are written as
/// zero; the values stored here are always the effective ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Size of the metadata block in bytes.
    pub metadata_size: u32,
    /// Total file size in bytes.
    pub file_size: u64,
    /// Container layout revision.
    pub version: FormatVersion,
    /// Absolute offset of the object data region. Object entries store
    /// offsets relative to this and are rebased during decoding.
    pub data_offset: u64,
    /// 0 forces little-endian metadata; any other value keeps the
    /// big-endian default.
    pub endianness: u8,
    /// Reserved bytes following the endianness flag (absent before
    /// [`FormatVersion::Unknown9`]).
    pub reserved: [u8; 3],
}

impl Header {
    /// Parse the envelope and configure the cursor's byte order for all
    /// subsequent metadata reads.
    ///
    /// The cursor must be positioned at the start of the file and in
    /// big-endian mode. On return the cursor sits exactly where the
    /// metadata continues: after the header for
    /// [`FormatVersion::Unknown9`]+, or just past the tail endianness byte
    /// for older revisions (whose metadata block lives at the file tail).
    pub fn parse<R: Read + Seek>(r: &mut EndianReader<R>) -> Result<Self> {
        r.enter(Stage::Header);

        let mut metadata_size = r.u32()?;
        let mut file_size = r.u32()? as u64;
        let version = FormatVersion::from_raw(r.u32()?)?;
        let mut data_offset = r.u32()? as u64;

        let endianness;
        let mut reserved = [0u8; 3];
        if version >= FormatVersion::Unknown9 {
            endianness = r.u8()?;
            reserved = r.bytes_array::<3>()?;
        } else {
            let tail = file_size
                .checked_sub(metadata_size as u64)
                .ok_or(Error::Parse {
                    stage: Stage::Header,
                    message: "metadata size exceeds file size",
                })?;
            r.seek_to(tail)?;
            endianness = r.u8()?;
        }

        if version >= FormatVersion::LargeFilesSupport {
            metadata_size = r.u32()?;
            file_size = r.u64()?;
            data_offset = r.u64()?;
            let _reserved = r.u64()?;
        }

        if endianness == 0 {
            r.set_endian(Endian::Little);
        }

        Ok(Self {
            metadata_size,
            file_size,
            version,
            data_offset,
            endianness,
            reserved,
        })
    }

    /// Re-encode the header with the field widths of its own revision.
    ///
    /// The inverse of [`Header::parse`] for the header bytes themselves.
    /// For revisions before [`FormatVersion::Unknown9`] only the 16-byte
    /// preamble is written; the endianness byte belongs to the tail
    /// metadata block, not the header.
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let large = self.version >= FormatVersion::LargeFilesSupport;

        if large {
            // The 32-bit slots are dead weight in large files.
            w.write_u32::<BigEndian>(0)?;
            w.write_u32::<BigEndian>(0)?;
            w.write_u32::<BigEndian>(self.version.raw())?;
            w.write_u32::<BigEndian>(0)?;
        } else {
            w.write_u32::<BigEndian>(self.metadata_size)?;
            w.write_u32::<BigEndian>(narrow(self.file_size)?)?;
            w.write_u32::<BigEndian>(self.version.raw())?;
            w.write_u32::<BigEndian>(narrow(self.data_offset)?)?;
        }

        if self.version >= FormatVersion::Unknown9 {
            w.write_u8(self.endianness)?;
            w.write_all(&self.reserved)?;
        }

        if large {
            w.write_u32::<BigEndian>(self.metadata_size)?;
            w.write_u64::<BigEndian>(self.file_size)?;
            w.write_u64::<BigEndian>(self.data_offset)?;
            w.write_u64::<BigEndian>(0)?;
        }

        Ok(())
    }
}

fn narrow(v: u64) -> io::Result<u32> {
    u32::try_from(v)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "field exceeds 32-bit range"))
}

/// Resolution of an object's type reference.
///
/// Binding failures are recorded here instead of aborting the decode:
/// sibling objects remain independently valid, so one dangling type
/// reference does not invalidate a 10,000-object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBinding {
    /// Index into [`SerializedFile::types`].
    Bound(usize),
    /// The reference could not be resolved.
    Unresolved(TypeBindingError),
}

impl TypeBinding {
    /// The bound type index, if resolution succeeded.
    pub fn index(&self) -> Option<usize> {
        match self {
            TypeBinding::Bound(i) => Some(*i),
            TypeBinding::Unresolved(_) => None,
        }
    }

    /// The binding failure, if resolution failed.
    pub fn error(&self) -> Option<&TypeBindingError> {
        match self {
            TypeBinding::Bound(_) => None,
            TypeBinding::Unresolved(e) => Some(e),
        }
    }
}

/// One entry of the object index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Persistent identifier of the object within this file.
    pub path_id: i64,
    /// Absolute file offset of the object's data (raw offset already
    /// rebased by the header's data offset).
    pub byte_start: u64,
    /// Size of the object's data in bytes.
    pub byte_size: u32,
    /// Raw type reference: a class id before
    /// [`FormatVersion::RefactoredClassId`], a type table index after.
    pub type_id: i32,
    /// Class id of the object. Read from the stream in legacy revisions,
    /// derived from the bound type in modern ones; 0 when the type could
    /// not be bound.
    pub class_id: i32,
    /// Script slot index. Transmitted per object only between
    /// [`FormatVersion::HasScriptTypeIndex`] and
    /// [`FormatVersion::RefactorTypeData`]; carried here on the entry
    /// rather than written back into the (shared) type record.
    pub script_type_index: Option<i16>,
    /// Destruction marker, present before
    /// [`FormatVersion::HasScriptTypeIndex`].
    pub is_destroyed: Option<u16>,
    /// Stripped-object flag, present at exactly
    /// [`FormatVersion::SupportsStrippedObject`] and
    /// [`FormatVersion::RefactoredClassId`].
    pub stripped: Option<u8>,
    /// Resolution of `type_id` against the type table.
    pub binding: TypeBinding,
}

impl ObjectEntry {
    fn parse<R: Read + Seek>(
        r: &mut EndianReader<R>,
        header: &Header,
        big_id_enabled: bool,
        types: &[SerializedType],
    ) -> Result<Self> {
        let version = header.version;

        // The three branches are mutually exclusive and order-sensitive:
        // the big-ID flag overrides the version rule.
        let path_id = if big_id_enabled {
            r.i64()?
        } else if version < FormatVersion::Unknown14 {
            r.i32()? as i64
        } else {
            r.align4()?;
            r.i64()?
        };

        let raw_start = if version >= FormatVersion::LargeFilesSupport {
            r.i64()? as u64
        } else {
            r.u32()? as u64
        };
        let byte_start = raw_start + header.data_offset;
        let byte_size = r.u32()?;
        let type_id = r.i32()?;

        let (class_id, binding) = if version < FormatVersion::RefactoredClassId {
            let class_id = r.u16()? as i32;
            // First matching class id wins, as the format has always had it.
            let binding = match types.iter().position(|t| t.class_id == type_id) {
                Some(i) => TypeBinding::Bound(i),
                None => TypeBinding::Unresolved(TypeBindingError::MissingClassId(type_id)),
            };
            (class_id, binding)
        } else {
            match usize::try_from(type_id).ok().filter(|&i| i < types.len()) {
                Some(i) => (types[i].class_id, TypeBinding::Bound(i)),
                None => (
                    0,
                    TypeBinding::Unresolved(TypeBindingError::IndexOutOfRange {
                        index: type_id,
                        count: types.len(),
                    }),
                ),
            }
        };

        let is_destroyed = if version < FormatVersion::HasScriptTypeIndex {
            Some(r.u16()?)
        } else {
            None
        };

        let script_type_index = if version >= FormatVersion::HasScriptTypeIndex
            && version < FormatVersion::RefactorTypeData
        {
            Some(r.i16()?)
        } else {
            None
        };

        let stripped = if version == FormatVersion::SupportsStrippedObject
            || version == FormatVersion::RefactoredClassId
        {
            Some(r.u8()?)
        } else {
            None
        };

        Ok(Self {
            path_id,
            byte_start,
            byte_size,
            type_id,
            class_id,
            script_type_index,
            is_destroyed,
            stripped,
            binding,
        })
    }
}

/// One entry of the script type table: a pointer to a script object in
/// this or another serialized file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptIdentifier {
    /// Index into the external file table (-1 or 0 for this file).
    pub serialized_file_index: i32,
    /// Path id of the script object inside that file.
    pub identifier_in_file: i64,
}

/// One entry of the external reference table: another file this file
/// depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    /// Asset GUID, absent before [`FormatVersion::Unknown5`].
    pub guid: Option<Uuid>,
    /// Asset type tag, absent before [`FormatVersion::Unknown5`].
    pub asset_type: Option<i32>,
    /// Path of the referenced file as stored.
    pub path: String,
    /// Final segment of `path`.
    pub file_name: String,
}

impl ExternalReference {
    fn parse<R: Read + Seek>(r: &mut EndianReader<R>, version: FormatVersion) -> Result<Self> {
        if version >= FormatVersion::Unknown6 {
            // Vestigial slot: always an empty string in shipped files.
            let _legacy = r.null_string()?;
        }
        let (guid, asset_type) = if version >= FormatVersion::Unknown5 {
            (Some(Uuid::from_bytes(r.bytes_array::<16>()?)), Some(r.i32()?))
        } else {
            (None, None)
        };
        let path = r.null_string()?;
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or("").to_owned();
        Ok(Self {
            guid,
            asset_type,
            path,
            file_name,
        })
    }
}

/// A fully decoded serialized file container.
///
/// Constructed in one top-to-bottom pass and immutable afterwards. Objects
/// reference their types by index into [`SerializedFile::types`] (see
/// [`TypeBinding`]); both live exactly as long as the file value.
#[derive(Debug)]
pub struct SerializedFile {
    pub header: Header,
    /// Engine version parsed from the embedded string (a fixed default for
    /// revisions predating it).
    pub unity_version: UnityVersion,
    /// Platform the file was built for.
    pub target_platform: BuildTarget,
    /// Whether type records embed their field layout trees.
    pub type_tree_enabled: bool,
    /// The type table.
    pub types: Vec<SerializedType>,
    /// Whether all path IDs use the wide encoding regardless of revision.
    pub big_id_enabled: bool,
    /// The object index.
    pub objects: Vec<ObjectEntry>,
    /// Script type table, absent before
    /// [`FormatVersion::HasScriptTypeIndex`].
    pub script_types: Option<Vec<ScriptIdentifier>>,
    /// External file reference table.
    pub externals: Vec<ExternalReference>,
    /// Reference type table, absent before
    /// [`FormatVersion::SupportsRefObject`].
    pub ref_types: Option<Vec<SerializedType>>,
    /// Free-form trailing string, absent before
    /// [`FormatVersion::Unknown5`].
    pub user_information: Option<String>,
}

impl SerializedFile {
    /// Decode one serialized file from a positioned byte source.
    ///
    /// `r` must be positioned at the start of the container. Decoding is a
    /// single sequential pass; on error the source is left mid-file and a
    /// partially decoded value is never returned.
    pub fn parse<R: Read + Seek>(source: &mut R) -> Result<Self> {
        let mut r = EndianReader::new(source, Endian::Big);
        let header = Header::parse(&mut r)?;
        let version = header.version;

        r.enter(Stage::Metadata);
        let unity_version = if version >= FormatVersion::Unknown7 {
            UnityVersion::parse(&r.null_string()?)
        } else {
            UnityVersion::default()
        };
        let target_platform = if version >= FormatVersion::Unknown8 {
            BuildTarget::from_raw(r.i32()?)
        } else {
            BuildTarget::Unknown
        };
        let type_tree_enabled = if version >= FormatVersion::HasTypeTreeHashes {
            r.boolean()?
        } else {
            true
        };

        r.enter(Stage::Types);
        let type_count = r.count()?;
        let mut types = Vec::with_capacity(type_count);
        for _ in 0..type_count {
            types.push(SerializedType::parse(
                &mut r,
                version,
                type_tree_enabled,
                false,
            )?);
        }

        let mut big_id_enabled = false;
        if version >= FormatVersion::Unknown7 && version < FormatVersion::Unknown14 {
            big_id_enabled = r.i32()? != 0;
        }

        r.enter(Stage::Objects);
        let object_count = r.count()?;
        let mut objects = Vec::with_capacity(object_count);
        for _ in 0..object_count {
            objects.push(ObjectEntry::parse(&mut r, &header, big_id_enabled, &types)?);
        }

        let script_types = if version >= FormatVersion::HasScriptTypeIndex {
            r.enter(Stage::ScriptTypes);
            let count = r.count()?;
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                let serialized_file_index = r.i32()?;
                let identifier_in_file = if version < FormatVersion::Unknown14 {
                    r.i32()? as i64
                } else {
                    r.align4()?;
                    r.i64()?
                };
                v.push(ScriptIdentifier {
                    serialized_file_index,
                    identifier_in_file,
                });
            }
            Some(v)
        } else {
            None
        };

        r.enter(Stage::Externals);
        let externals_count = r.count()?;
        let mut externals = Vec::with_capacity(externals_count);
        for _ in 0..externals_count {
            externals.push(ExternalReference::parse(&mut r, version)?);
        }

        let ref_types = if version >= FormatVersion::SupportsRefObject {
            r.enter(Stage::RefTypes);
            let count = r.count()?;
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(SerializedType::parse(&mut r, version, type_tree_enabled, true)?);
            }
            Some(v)
        } else {
            None
        };

        let user_information = if version >= FormatVersion::Unknown5 {
            Some(r.null_string()?)
        } else {
            None
        };

        debug!(
            version = version.raw(),
            types = types.len(),
            objects = objects.len(),
            externals = externals.len(),
            "decoded serialized file"
        );

        Ok(Self {
            header,
            unity_version,
            target_platform,
            type_tree_enabled,
            types,
            big_id_enabled,
            objects,
            script_types,
            externals,
            ref_types,
            user_information,
        })
    }

    /// Container layout revision.
    pub fn format_version(&self) -> FormatVersion {
        self.header.version
    }

    /// The type an object entry resolved to, if its binding succeeded.
    pub fn type_of(&self, object: &ObjectEntry) -> Option<&SerializedType> {
        object.binding.index().map(|i| &self.types[i])
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use byteorder::{BigEndian as BE, LittleEndian as LE, WriteBytesExt};

    use super::*;

    fn push_cstr(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(s.as_bytes());
        buf.push(0);
    }

    fn align(buf: &mut Vec<u8>) {
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
    }

    /// Flattened tree with a single "Base" root node.
    fn push_blob_tree(buf: &mut Vec<u8>, with_hash: bool) {
        buf.write_i32::<LE>(1).unwrap();
        buf.write_i32::<LE>(5).unwrap();
        buf.write_u16::<LE>(1).unwrap();
        buf.push(0);
        buf.push(0);
        buf.write_u32::<LE>(0).unwrap();
        buf.write_u32::<LE>(0).unwrap();
        buf.write_i32::<LE>(-1).unwrap();
        buf.write_i32::<LE>(0).unwrap();
        buf.write_i32::<LE>(0).unwrap();
        if with_hash {
            buf.write_u64::<LE>(0).unwrap();
        }
        buf.extend_from_slice(b"Base\0");
    }

    #[test]
    fn header_round_trips_at_endianness_in_header_revision() {
        let mut bytes = Vec::new();
        bytes.write_u32::<BE>(100).unwrap();
        bytes.write_u32::<BE>(0x2000).unwrap();
        bytes.write_u32::<BE>(9).unwrap();
        bytes.write_u32::<BE>(0x30).unwrap();
        bytes.push(0);
        bytes.extend_from_slice(&[0, 0, 0]);

        let mut r = EndianReader::new(Cursor::new(bytes.clone()), Endian::Big);
        let header = Header::parse(&mut r).unwrap();
        assert_eq!(header.version, FormatVersion::Unknown9);
        assert_eq!(header.metadata_size, 100);
        assert_eq!(header.file_size, 0x2000);
        assert_eq!(header.data_offset, 0x30);
        assert_eq!(r.endian(), Endian::Little);

        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn header_upgrades_to_64_bit_fields_at_large_files_revision() {
        // The pre-upgrade 32-bit slots are written as zero; the effective
        // values come from the 64-bit re-read.
        let mut bytes = Vec::new();
        bytes.write_u32::<BE>(0).unwrap();
        bytes.write_u32::<BE>(0).unwrap();
        bytes.write_u32::<BE>(22).unwrap();
        bytes.write_u32::<BE>(0).unwrap();
        bytes.push(0);
        bytes.extend_from_slice(&[0, 0, 0]);
        bytes.write_u32::<BE>(64).unwrap();
        bytes.write_u64::<BE>(10000).unwrap();
        bytes.write_u64::<BE>(4096).unwrap();
        bytes.write_u64::<BE>(0).unwrap();

        let mut r = EndianReader::new(Cursor::new(bytes.clone()), Endian::Big);
        let header = Header::parse(&mut r).unwrap();
        assert_eq!(header.metadata_size, 64);
        assert_eq!(header.file_size, 10000);
        assert_eq!(header.data_offset, 4096);

        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn pre_header_endianness_revisions_read_the_flag_from_the_tail() {
        // 16-byte header, 8 bytes of data, then the tail metadata block
        // whose first byte is the endianness flag.
        let mut bytes = Vec::new();
        bytes.write_u32::<BE>(4).unwrap(); // metadata: flag + 3 more bytes
        bytes.write_u32::<BE>(28).unwrap(); // file size
        bytes.write_u32::<BE>(8).unwrap();
        bytes.write_u32::<BE>(16).unwrap(); // data offset
        bytes.extend_from_slice(&[0xEE; 8]); // data region
        bytes.push(0); // endianness: little
        bytes.extend_from_slice(&[1, 2, 3]); // rest of tail metadata

        let mut r = EndianReader::new(Cursor::new(bytes), Endian::Big);
        let header = Header::parse(&mut r).unwrap();
        assert_eq!(header.version, FormatVersion::Unknown8);
        assert_eq!(header.endianness, 0);
        assert_eq!(r.endian(), Endian::Little);
        // The cursor continues where the tail metadata starts.
        assert_eq!(r.position().unwrap(), 25);
    }

    /// A complete little file at RefactorTypeData (v17).
    fn build_v17_file(type_id_of_second_object: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<BE>(0).unwrap(); // metadata size (unused at v17)
        buf.write_u32::<BE>(0x5000).unwrap(); // file size
        buf.write_u32::<BE>(17).unwrap();
        buf.write_u32::<BE>(4096).unwrap(); // data offset
        buf.push(0); // little-endian metadata
        buf.extend_from_slice(&[0, 0, 0]);

        push_cstr(&mut buf, "2017.4.30f1");
        buf.write_i32::<LE>(5).unwrap(); // StandaloneWindows
        buf.push(1); // type trees enabled

        // One type: GameObject.
        buf.write_i32::<LE>(1).unwrap(); // type count
        buf.write_i32::<LE>(1).unwrap(); // class id
        buf.push(0); // not stripped
        buf.write_i16::<LE>(-1).unwrap();
        buf.extend_from_slice(&[0xAA; 16]); // old type hash
        push_blob_tree(&mut buf, false);

        // Objects (no big-ID flag at v17).
        buf.write_i32::<LE>(2).unwrap();
        align(&mut buf);
        buf.write_i64::<LE>(1).unwrap();
        buf.write_u32::<LE>(0).unwrap(); // raw byte start
        buf.write_u32::<LE>(64).unwrap();
        buf.write_i32::<LE>(0).unwrap(); // type index
        align(&mut buf);
        buf.write_i64::<LE>(2).unwrap();
        buf.write_u32::<LE>(0x100).unwrap();
        buf.write_u32::<LE>(32).unwrap();
        buf.write_i32::<LE>(type_id_of_second_object).unwrap();

        // Script types.
        buf.write_i32::<LE>(1).unwrap();
        buf.write_i32::<LE>(0).unwrap();
        align(&mut buf);
        buf.write_i64::<LE>(42).unwrap();

        // Externals.
        buf.write_i32::<LE>(1).unwrap();
        push_cstr(&mut buf, ""); // vestigial slot
        buf.extend_from_slice(&[0x42; 16]); // guid
        buf.write_i32::<LE>(2).unwrap(); // asset type
        push_cstr(&mut buf, "Library/unity default resources");

        // No ref types at v17.
        push_cstr(&mut buf, ""); // user information
        buf
    }

    #[test]
    fn modern_file_decodes_end_to_end() {
        let mut cursor = Cursor::new(build_v17_file(0));
        let file = SerializedFile::parse(&mut cursor).unwrap();

        assert_eq!(file.format_version(), FormatVersion::RefactorTypeData);
        assert_eq!(file.unity_version.numbers, vec![2017, 4, 30, 1]);
        assert_eq!(file.target_platform, BuildTarget::StandaloneWindows);
        assert!(file.type_tree_enabled);
        assert!(!file.big_id_enabled);

        assert_eq!(file.types.len(), 1);
        assert_eq!(file.objects.len(), 2);
        let first = &file.objects[0];
        let second = &file.objects[1];
        assert_eq!(first.path_id, 1);
        assert_eq!(second.path_id, 2);
        // Raw starts rebased against the data offset.
        assert_eq!(first.byte_start, 4096);
        assert_eq!(second.byte_start, 4096 + 0x100);
        // Modern binding: direct index, class id derived from the type.
        assert_eq!(first.binding, TypeBinding::Bound(0));
        assert_eq!(first.class_id, 1);
        assert!(std::ptr::eq(
            file.type_of(first).unwrap(),
            &file.types[0]
        ));
        assert_eq!(first.is_destroyed, None);
        assert_eq!(first.stripped, None);
        assert_eq!(first.script_type_index, None);

        let scripts = file.script_types.as_ref().unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].serialized_file_index, 0);
        assert_eq!(scripts[0].identifier_in_file, 42);

        assert_eq!(file.externals.len(), 1);
        let ext = &file.externals[0];
        assert_eq!(ext.guid, Some(Uuid::from_bytes([0x42; 16])));
        assert_eq!(ext.asset_type, Some(2));
        assert_eq!(ext.path, "Library/unity default resources");
        assert_eq!(ext.file_name, "unity default resources");

        assert_eq!(file.ref_types, None);
        assert_eq!(file.user_information.as_deref(), Some(""));
    }

    #[test]
    fn dangling_type_index_is_isolated_to_its_entry() {
        let mut cursor = Cursor::new(build_v17_file(5));
        let file = SerializedFile::parse(&mut cursor).unwrap();

        // First object still binds; only the second is marked unresolved.
        assert_eq!(file.objects[0].binding, TypeBinding::Bound(0));
        assert_eq!(
            file.objects[1].binding.error(),
            Some(&TypeBindingError::IndexOutOfRange { index: 5, count: 1 })
        );
        assert_eq!(file.objects[1].class_id, 0);
        assert!(file.type_of(&file.objects[1]).is_none());
    }

    /// A complete legacy file at Unknown9: tail metadata, recursive trees,
    /// class-id binding, 32-bit path ids.
    fn build_v9_file(big_id: bool) -> Vec<u8> {
        let mut meta = Vec::new();
        push_cstr(&mut meta, "3.5.7f6");
        meta.write_i32::<LE>(5).unwrap(); // platform
        // No type-tree-enabled flag before v13: trees always present.
        meta.write_i32::<LE>(2).unwrap(); // type count
        for (class_id, name) in [(1, "GameObject"), (4, "Transform")] {
            meta.write_i32::<LE>(class_id).unwrap();
            // Recursive tree, single node.
            push_cstr(&mut meta, name);
            push_cstr(&mut meta, "Base");
            meta.write_i32::<LE>(-1).unwrap();
            meta.write_i32::<LE>(0).unwrap(); // index
            meta.write_i32::<LE>(0).unwrap(); // type flags
            meta.write_i32::<LE>(1).unwrap(); // node version
            meta.write_i32::<LE>(0x8000).unwrap(); // meta flags
            meta.write_i32::<LE>(0).unwrap(); // children
        }
        meta.write_i32::<LE>(i32::from(big_id)).unwrap();
        meta.write_i32::<LE>(2).unwrap(); // object count
        for (path_id, raw_start, type_id, class_id) in
            [(10i64, 0u32, 4, 4u16), (11, 0x40, 1, 1)]
        {
            if big_id {
                meta.write_i64::<LE>(path_id).unwrap();
            } else {
                meta.write_i32::<LE>(path_id as i32).unwrap();
            }
            meta.write_u32::<LE>(raw_start).unwrap();
            meta.write_u32::<LE>(16).unwrap();
            meta.write_i32::<LE>(type_id).unwrap();
            meta.write_u16::<LE>(class_id).unwrap();
            meta.write_u16::<LE>(0).unwrap(); // is destroyed
        }
        // No script type table before v11.
        meta.write_i32::<LE>(1).unwrap(); // externals count
        push_cstr(&mut meta, ""); // vestigial slot
        meta.extend_from_slice(&[0x07; 16]);
        meta.write_i32::<LE>(0).unwrap();
        push_cstr(&mut meta, "sharedassets0.assets");
        push_cstr(&mut meta, "built from 3.5.7f6"); // user information

        // v9 keeps metadata in front; file layout is header + metadata +
        // data region.
        let mut buf = Vec::new();
        let data_offset = 20 + meta.len() as u32 + 44; // somewhere past the metadata
        buf.write_u32::<BE>(meta.len() as u32).unwrap();
        buf.write_u32::<BE>(0x1234).unwrap();
        buf.write_u32::<BE>(9).unwrap();
        buf.write_u32::<BE>(data_offset).unwrap();
        buf.push(0); // little-endian metadata
        buf.extend_from_slice(&[0, 0, 0]);
        buf.extend_from_slice(&meta);
        buf
    }

    #[test]
    fn legacy_file_decodes_end_to_end() {
        let mut cursor = Cursor::new(build_v9_file(false));
        let file = SerializedFile::parse(&mut cursor).unwrap();

        assert_eq!(file.format_version(), FormatVersion::Unknown9);
        assert_eq!(file.unity_version.numbers, vec![3, 5, 7, 6]);
        assert!(file.type_tree_enabled);
        assert!(!file.big_id_enabled);
        assert_eq!(file.types.len(), 2);

        // Legacy binding: linear search on class id, so the first object
        // (type id 4) lands on the second table entry.
        let first = &file.objects[0];
        assert_eq!(first.path_id, 10);
        assert_eq!(first.type_id, 4);
        assert_eq!(first.class_id, 4);
        assert_eq!(first.binding, TypeBinding::Bound(1));
        assert_eq!(file.type_of(first).unwrap().class_id, 4);
        assert_eq!(first.is_destroyed, Some(0));
        let data_offset = file.header.data_offset;
        assert_eq!(first.byte_start, data_offset);
        assert_eq!(file.objects[1].byte_start, data_offset + 0x40);

        assert_eq!(file.script_types, None);
        assert_eq!(file.externals[0].file_name, "sharedassets0.assets");
        assert_eq!(
            file.user_information.as_deref(),
            Some("built from 3.5.7f6")
        );
    }

    #[test]
    fn big_id_flag_overrides_narrow_path_ids() {
        let mut cursor = Cursor::new(build_v9_file(true));
        let file = SerializedFile::parse(&mut cursor).unwrap();
        assert!(file.big_id_enabled);
        assert_eq!(file.objects[0].path_id, 10);
        assert_eq!(file.objects[1].path_id, 11);
    }

    #[test]
    fn legacy_missing_class_id_is_isolated_to_its_entry() {
        // Rewrite the second object's type id to a class no type declares.
        let mut bytes = build_v9_file(false);
        // type id 1 of the second object lives 8 bytes before its class id;
        // patch it by scanning for the unique [0x40, 0, 0, 0] raw start.
        let pos = bytes
            .windows(4)
            .position(|w| w == [0x40, 0, 0, 0])
            .unwrap();
        bytes[pos + 8..pos + 12].copy_from_slice(&999i32.to_le_bytes());

        let mut cursor = Cursor::new(bytes);
        let file = SerializedFile::parse(&mut cursor).unwrap();
        assert_eq!(file.objects[0].binding, TypeBinding::Bound(1));
        assert_eq!(
            file.objects[1].binding.error(),
            Some(&TypeBindingError::MissingClassId(999))
        );
    }

    #[test]
    fn narrow_path_ids_just_below_the_wide_id_revision() {
        // v13: path ids are still 32-bit when the big-ID flag is off, with
        // no alignment padding between entries, and each object carries its
        // own script type index.
        let mut buf = Vec::new();
        buf.write_u32::<BE>(0).unwrap();
        buf.write_u32::<BE>(0x3000).unwrap();
        buf.write_u32::<BE>(13).unwrap();
        buf.write_u32::<BE>(512).unwrap(); // data offset
        buf.push(0);
        buf.extend_from_slice(&[0, 0, 0]);

        push_cstr(&mut buf, "5.0.0f4");
        buf.write_i32::<LE>(5).unwrap();
        buf.push(0); // type trees disabled

        // Three tree-less types; the negative class id marks a script type
        // and carries a script id under the pre-refactor encoding.
        buf.write_i32::<LE>(3).unwrap();
        for class_id in [1, 4, -3] {
            buf.write_i32::<LE>(class_id).unwrap();
            if class_id < 0 {
                buf.extend_from_slice(&[0x66; 16]); // script id
            }
            buf.extend_from_slice(&[0x77; 16]); // old type hash
        }

        buf.write_i32::<LE>(0).unwrap(); // big-ID flag off

        buf.write_i32::<LE>(5).unwrap();
        for (path_id, type_id) in [(21, 1), (22, 4), (23, -3), (24, 1), (25, 4)] {
            buf.write_i32::<LE>(path_id).unwrap();
            buf.write_u32::<LE>(path_id as u32 * 8).unwrap(); // raw start
            buf.write_u32::<LE>(24).unwrap();
            buf.write_i32::<LE>(type_id).unwrap();
            buf.write_u16::<LE>(type_id.unsigned_abs() as u16).unwrap();
            buf.write_i16::<LE>(if type_id < 0 { 2 } else { -1 }).unwrap();
        }

        buf.write_i32::<LE>(0).unwrap(); // script types
        buf.write_i32::<LE>(0).unwrap(); // externals
        push_cstr(&mut buf, ""); // user information

        let mut cursor = Cursor::new(buf);
        let file = SerializedFile::parse(&mut cursor).unwrap();

        assert!(!file.type_tree_enabled);
        assert_eq!(file.types.len(), 3);
        assert_eq!(file.types[2].script_id, Some([0x66; 16]));
        assert_eq!(file.types[2].tree, None);

        assert_eq!(file.objects.len(), 5);
        let path_ids: Vec<i64> = file.objects.iter().map(|o| o.path_id).collect();
        assert_eq!(path_ids, vec![21, 22, 23, 24, 25]);
        for object in &file.objects {
            assert_eq!(object.byte_start, 512 + object.path_id as u64 * 8);
            assert_eq!(object.is_destroyed, None);
        }
        // The per-object script index stays on the entry; the shared type
        // record is untouched.
        assert_eq!(file.objects[2].binding, TypeBinding::Bound(2));
        assert_eq!(file.objects[2].script_type_index, Some(2));
        assert_eq!(file.objects[0].script_type_index, Some(-1));
        assert_eq!(file.types[2].script_type_index, None);
    }

    /// A complete file at LargeFilesSupport (v22) with a reference type.
    fn build_v22_file() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<BE>(0).unwrap();
        buf.write_u32::<BE>(0).unwrap();
        buf.write_u32::<BE>(22).unwrap();
        buf.write_u32::<BE>(0).unwrap();
        buf.push(0);
        buf.extend_from_slice(&[0, 0, 0]);
        buf.write_u32::<BE>(512).unwrap(); // metadata size
        buf.write_u64::<BE>(0x10000).unwrap(); // file size
        buf.write_u64::<BE>(4096).unwrap(); // data offset
        buf.write_u64::<BE>(0).unwrap();

        push_cstr(&mut buf, "2020.3.48f1");
        buf.write_i32::<LE>(19).unwrap(); // StandaloneWindows64
        buf.push(1);

        // One ordinary type with a dependency list.
        buf.write_i32::<LE>(1).unwrap();
        buf.write_i32::<LE>(1).unwrap();
        buf.push(0);
        buf.write_i16::<LE>(-1).unwrap();
        buf.extend_from_slice(&[0xBB; 16]);
        push_blob_tree(&mut buf, true); // nodes carry ref type hashes
        buf.write_i32::<LE>(1).unwrap(); // dependency count
        buf.write_i32::<LE>(3).unwrap();

        // One object with a 64-bit raw start.
        buf.write_i32::<LE>(1).unwrap();
        align(&mut buf);
        buf.write_i64::<LE>(7).unwrap();
        buf.write_i64::<LE>(0x200).unwrap(); // raw byte start
        buf.write_u32::<LE>(128).unwrap();
        buf.write_i32::<LE>(0).unwrap();

        buf.write_i32::<LE>(0).unwrap(); // script types

        buf.write_i32::<LE>(1).unwrap(); // externals
        push_cstr(&mut buf, "");
        buf.extend_from_slice(&[0x09; 16]);
        buf.write_i32::<LE>(3).unwrap();
        push_cstr(&mut buf, "globalgamemanagers.assets");

        // One reference type.
        buf.write_i32::<LE>(1).unwrap();
        buf.write_i32::<LE>(114).unwrap();
        buf.push(0);
        buf.write_i16::<LE>(-1).unwrap();
        buf.extend_from_slice(&[0xCC; 16]); // script id (MonoBehaviour)
        buf.extend_from_slice(&[0xDD; 16]); // old type hash
        push_blob_tree(&mut buf, true);
        push_cstr(&mut buf, "SaveState");
        push_cstr(&mut buf, "Game.Persistence");
        push_cstr(&mut buf, "Assembly-CSharp");

        push_cstr(&mut buf, ""); // user information
        buf
    }

    #[test]
    fn large_files_revision_decodes_end_to_end() {
        let mut cursor = Cursor::new(build_v22_file());
        let file = SerializedFile::parse(&mut cursor).unwrap();

        assert_eq!(file.format_version(), FormatVersion::LargeFilesSupport);
        assert_eq!(file.header.data_offset, 4096);
        assert_eq!(file.header.file_size, 0x10000);

        assert_eq!(file.types[0].type_dependencies, Some(vec![3]));
        let tree = file.types[0].tree.as_ref().unwrap();
        assert_eq!(tree.nodes[0].ref_type_hash, Some(0));

        let object = &file.objects[0];
        assert_eq!(object.path_id, 7);
        assert_eq!(object.byte_start, 4096 + 0x200);
        assert_eq!(object.byte_size, 128);

        let ref_types = file.ref_types.as_ref().unwrap();
        assert_eq!(ref_types.len(), 1);
        assert_eq!(ref_types[0].script_id, Some([0xCC; 16]));
        let info = ref_types[0].ref_type_info.as_ref().unwrap();
        assert_eq!(info.class_name, "SaveState");
        assert_eq!(info.namespace, "Game.Persistence");
        assert_eq!(info.assembly_name, "Assembly-CSharp");
    }

    #[test]
    fn truncated_object_index_names_the_stage() {
        let mut bytes = build_v17_file(0);
        bytes.truncate(115); // cut mid-way through the first object entry
        let mut cursor = Cursor::new(bytes);
        match SerializedFile::parse(&mut cursor) {
            Err(Error::Truncated { stage, .. }) => assert_eq!(stage, Stage::Objects),
            other => panic!("expected truncation in the object index, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_revision_fails_before_metadata() {
        let mut bytes = Vec::new();
        bytes.write_u32::<BE>(0).unwrap();
        bytes.write_u32::<BE>(64).unwrap();
        bytes.write_u32::<BE>(23).unwrap(); // one past the newest revision
        bytes.write_u32::<BE>(0).unwrap();
        bytes.extend_from_slice(&[0; 16]);

        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            SerializedFile::parse(&mut cursor),
            Err(Error::UnsupportedVersion(23))
        ));
    }
}
