//! **assetkit** - a reusable Rust library for parsing Unity serialized files.
//!
//! A serialized file is the engine's container format for one archive of
//! scene/asset object data, as found inside builds, asset bundles, and
//! standalone `.asset` files. This crate decodes the container's metadata -
//! header, type table with embedded type trees, object index, and reference
//! tables - so that every stored object can be located and typed. Object
//! payloads themselves (the bytes each index entry points at) are left to
//! per-class readers built on top.
//!
//! # Modules
//! | Module | Contents |
//! |--------|----------|
//! | [`serialized`] | Container header, object index, external/script/ref tables, assembly |
//! | [`typetree`]   | Field layout trees (recursive and flattened encodings) |
//! | [`types`]      | Serialized type records |
//! | [`version`]    | Format revision table and engine version strings |
//! | [`platform`]   | Build target platform table |
//! | [`strings`]    | Compiled-in common string table |
//! | [`reader`]     | Endian-configurable byte cursor |
//!
//! # Conventions
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] - pass a
//!   [`std::fs::File`], a [`std::io::Cursor`], a memory-mapped region, or
//!   anything else that implements both traits.
//! * **Metadata only** - [`serialized::SerializedFile::parse`] reads the
//!   container's tables and builds an in-memory description. Object data is
//!   never eagerly loaded; entries carry absolute offsets for callers to
//!   slice.
//! * **One pass, then immutable** - a file either decodes completely or
//!   fails with an error naming the stage and byte offset; a partially
//!   decoded value is never observable.
//! * **Concurrent decodes are free** - each decode owns its source and
//!   output exclusively; the only shared state is the read-only common
//!   string table.

pub mod error;
pub mod platform;
pub mod reader;
pub mod serialized;
pub mod strings;
pub mod types;
pub mod typetree;
pub mod version;

pub use error::{Error, Result};
