//! Library-wide error and result types.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result alias used throughout assetkit.
pub type Result<T> = std::result::Result<T, Error>;

/// The metadata section being decoded when an error was raised.
///
/// Reported together with the byte offset so an unsupported format revision
/// can be diagnosed from the error alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The fixed envelope at the start of the file.
    Header,
    /// Engine version string, target platform, and per-file flags.
    Metadata,
    /// The serialized type table, including embedded type trees.
    Types,
    /// The object index.
    Objects,
    /// The script type table.
    ScriptTypes,
    /// The external file reference table.
    Externals,
    /// The reference type table.
    RefTypes,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Header => "header",
            Stage::Metadata => "metadata",
            Stage::Types => "type table",
            Stage::Objects => "object index",
            Stage::ScriptTypes => "script type table",
            Stage::Externals => "external reference table",
            Stage::RefTypes => "reference type table",
        };
        f.write_str(name)
    }
}

/// All errors the library can produce.
///
/// Header and type-table failures are fatal to the whole file: once the byte
/// cursor desynchronizes there is nothing left to recover. Failures to bind
/// an object to its type are *not* routed through this enum - they are
/// recorded per entry as [`TypeBindingError`] so one bad object does not
/// invalidate the rest of the index.
#[derive(Error, Debug)]
pub enum Error {
    /// The stream ended before all expected bytes could be read.
    #[error("{stage} truncated at byte {offset:#x}")]
    Truncated { stage: Stage, offset: u64 },
    /// The file declares a format revision this parser does not understand.
    /// Decoding stops before any conditional field is read; guessing field
    /// widths would silently corrupt every later offset.
    #[error("unsupported serialized file version {0}")]
    UnsupportedVersion(u32),
    /// A type tree string offset pointed outside its string buffer, or the
    /// buffer had no null terminator at that position.
    #[error("type tree string at buffer offset {offset:#x} is unterminated or out of range")]
    BadStringOffset { offset: u32 },
    /// A structural constraint was violated (message describes which one).
    #[error("parse error in {stage}: {message}")]
    Parse { stage: Stage, message: &'static str },
    /// An underlying I/O operation failed for a reason other than EOF.
    #[error("i/o error in {stage} at byte {offset:#x}: {source}")]
    Io {
        stage: Stage,
        offset: u64,
        source: io::Error,
    },
}

/// Why an object entry could not be bound to an entry in the type table.
///
/// Attached to the affected [`ObjectEntry`](crate::serialized::ObjectEntry);
/// sibling objects remain independently valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeBindingError {
    /// No type in the table carries this class id (legacy binding rule).
    #[error("no serialized type with class id {0}")]
    MissingClassId(i32),
    /// The type id is not a valid index into the type table (modern binding
    /// rule).
    #[error("type index {index} out of range for {count} types")]
    IndexOutOfRange { index: i32, count: usize },
}
