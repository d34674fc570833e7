//! Format revision table and engine version string handling.
//!
//! The serialized file format has been revised dozens of times without a
//! clean mapping to engine releases. Every conditional field in the
//! container - widths, presence, encoding - keys off one monotonically
//! ordered revision marker stored in the header. [`FormatVersion`] is that
//! marker: an ordered enumeration whose comparisons (`<`, `>=`) are the only
//! decision points the decoders use. Adding a future revision is a one-line
//! insertion here.
//!
//! Separately, files at [`FormatVersion::Unknown7`] and later embed a
//! human-readable engine version string such as `"2019.4.1f1"`;
//! [`UnityVersion`] splits it into a build-type tag and a numeric tuple.

use crate::{Error, Result};

/// One revision of the serialized file container layout.
///
/// Discriminants are the raw header values. The variants form a total
/// order; all decoding decisions are `>=` / `<` / `==` comparisons against
/// these markers. Numbered variants are revisions whose exact engine-side
/// trigger was never identified; the approximate engine era is noted where
/// known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum FormatVersion {
    /// Unity 1.x.
    Unknown1 = 1,
    /// Unity 1.x-2.x. Type tree nodes carry an extra variable count.
    Unknown2 = 2,
    /// Unity 2.x. Type tree nodes drop their index and meta flag fields.
    Unknown3 = 3,
    /// Unity 1.2-2.6. Externals gain a GUID and asset type tag; the file
    /// gains a trailing user information string.
    Unknown5 = 5,
    /// Unity 2.6-3.4. Externals gain a vestigial leading string slot.
    Unknown6 = 6,
    /// Unity 3.0-3.4. The engine version string and the big-ID flag appear.
    Unknown7 = 7,
    /// Unity 3.3-3.4. The target platform field appears.
    Unknown8 = 8,
    /// Unity 3.5-4.x. The endianness flag moves from the file tail into the
    /// header, and the metadata block moves to the front of the file.
    Unknown9 = 9,
    /// Unity 5.0 development builds. First revision with the flattened
    /// type tree encoding.
    Unknown10 = 10,
    /// Unity 5.0. Objects gain a script type index; the script type table
    /// appears.
    HasScriptTypeIndex = 11,
    /// Unity 5.0. The flattened type tree encoding becomes permanent.
    Unknown12 = 12,
    /// Unity 5.0. Types gain layout hashes and the per-file type tree
    /// enable flag.
    HasTypeTreeHashes = 13,
    /// Unity 5.0. Path IDs widen to 64 bits unconditionally.
    Unknown14 = 14,
    /// Unity 5.0-5.1. Objects carry a stripped flag (this revision and
    /// [`FormatVersion::RefactoredClassId`] only).
    SupportsStrippedObject = 15,
    /// Unity 5.2-5.4. Script class ids stop being negative; object type
    /// ids become direct indices into the type table.
    RefactoredClassId = 16,
    /// Unity 5.5+. The script type index moves from the object entry into
    /// the type record.
    RefactorTypeData = 17,
    /// Unity 5.6-2017.x. Shareable type tree data (no layout change
    /// observed in shipped files).
    RefactorShareableTypeTreeData = 18,
    /// Unity 2019.1. Flattened type tree nodes gain a reference type hash.
    TypeTreeNodeWithTypeFlags = 19,
    /// Unity 2019.2. The reference type table appears.
    SupportsRefObject = 20,
    /// Unity 2019.3+. Types store their dependency lists; reference types
    /// store class/namespace/assembly names instead.
    StoresTypeDependencies = 21,
    /// Unity 2020.1+. Size and offset header fields widen to 64 bits.
    LargeFilesSupport = 22,
}

impl FormatVersion {
    /// Decode a raw header value.
    ///
    /// Values outside the known table (including gaps such as `4`) fail
    /// with [`Error::UnsupportedVersion`] rather than guessing at field
    /// widths.
    pub fn from_raw(raw: u32) -> Result<Self> {
        use FormatVersion::*;
        Ok(match raw {
            1 => Unknown1,
            2 => Unknown2,
            3 => Unknown3,
            5 => Unknown5,
            6 => Unknown6,
            7 => Unknown7,
            8 => Unknown8,
            9 => Unknown9,
            10 => Unknown10,
            11 => HasScriptTypeIndex,
            12 => Unknown12,
            13 => HasTypeTreeHashes,
            14 => Unknown14,
            15 => SupportsStrippedObject,
            16 => RefactoredClassId,
            17 => RefactorTypeData,
            18 => RefactorShareableTypeTreeData,
            19 => TypeTreeNodeWithTypeFlags,
            20 => SupportsRefObject,
            21 => StoresTypeDependencies,
            22 => LargeFilesSupport,
            other => return Err(Error::UnsupportedVersion(other)),
        })
    }

    /// The raw header value for this revision.
    pub const fn raw(self) -> u32 {
        self as u32
    }
}

/// The release channel tag embedded in an engine version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildType {
    /// `a` - alpha.
    Alpha,
    /// `b` - beta.
    Beta,
    /// `f` - final (regular release).
    Final,
    /// `p` - patch.
    Patch,
    /// `x` - experimental.
    Experimental,
    /// Tag not recognized, or the file is version-stripped.
    Unknown,
}

impl BuildType {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "a" => BuildType::Alpha,
            "b" => BuildType::Beta,
            "f" => BuildType::Final,
            "p" => BuildType::Patch,
            "x" => BuildType::Experimental,
            _ => BuildType::Unknown,
        }
    }
}

/// Version string written into builds whose engine version was stripped.
const STRIPPED_VERSION: &str = "0.0.0";

/// A parsed engine version string, e.g. `"2019.4.1f1"`.
///
/// The numeric tuple has variable arity (commonly 3-4 components), so it is
/// kept as a `Vec` rather than a fixed array. Splitting works by
/// character-class substitution: digits are removed to find the build-type
/// tag, non-digits are turned into separators to find the numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnityVersion {
    /// The string exactly as stored in the file.
    pub raw: String,
    /// Release channel parsed from the first non-digit run.
    pub build_type: BuildType,
    /// Numeric components in order of appearance.
    pub numbers: Vec<u32>,
    /// Whether the file carries the `"0.0.0"` sentinel instead of a real
    /// version. No numeric parse is attempted for stripped files.
    pub is_stripped: bool,
}

impl UnityVersion {
    /// Parse an engine version string.
    pub fn parse(raw: &str) -> Self {
        if raw == STRIPPED_VERSION {
            return Self {
                raw: raw.to_owned(),
                build_type: BuildType::Unknown,
                numbers: Vec::new(),
                is_stripped: true,
            };
        }

        let tags: String = raw
            .chars()
            .map(|c| if c.is_ascii_digit() { '.' } else { c })
            .collect();
        let build_type = tags
            .split('.')
            .find(|s| !s.is_empty())
            .map_or(BuildType::Unknown, BuildType::from_tag);

        let digits: String = raw
            .chars()
            .map(|c| if c.is_ascii_digit() { c } else { '.' })
            .collect();
        let numbers = digits
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().unwrap_or(u32::MAX))
            .collect();

        Self {
            raw: raw.to_owned(),
            build_type,
            numbers,
            is_stripped: false,
        }
    }
}

impl Default for UnityVersion {
    /// The version assumed for files predating the embedded version string
    /// ([`FormatVersion::Unknown7`]).
    fn default() -> Self {
        Self::parse("2.5.0f5")
    }
}
