//! Endian-configurable byte cursor shared by all decoders.
//!
//! Unity serialized files mix byte orders within one file: the envelope is
//! always big-endian, while the metadata that follows switches to
//! little-endian when the header's endianness flag is zero. [`EndianReader`]
//! therefore carries its byte order as runtime state instead of a type
//! parameter, and every fixed-width read dispatches on it.
//!
//! Each method reads exactly the bytes it promises or returns an error -
//! there is no partial-read ambiguity. Reads past the end of the source
//! report the decode [`Stage`] in progress and the byte offset at which the
//! source ran dry.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::{Error, Result, error::Stage};

/// Byte order applied to multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Most significant byte first. The default for serialized file
    /// envelopes.
    Big,
    /// Least significant byte first.
    Little,
}

macro_rules! impl_read_prim {
    ($name:ident, $ty:ty, $read:ident) => {
        #[doc = concat!("Read a `", stringify!($ty), "` in the current byte order.")]
        pub fn $name(&mut self) -> Result<$ty> {
            match self.endian {
                Endian::Big => self.inner.$read::<BigEndian>(),
                Endian::Little => self.inner.$read::<LittleEndian>(),
            }
            .map_err(|e| self.fail(e))
        }
    };
}

/// Seekable reader with a switchable byte order and a current decode stage.
///
/// The stage is bookkeeping only: it never affects what is read, but every
/// error produced while it is set names it, so callers learn *which* table
/// was being decoded when a file turned out shorter than its counts claimed.
pub struct EndianReader<R> {
    inner: R,
    endian: Endian,
    stage: Stage,
}

impl<R: Read + Seek> EndianReader<R> {
    /// Wrap `inner`, starting in the given byte order.
    pub fn new(inner: R, endian: Endian) -> Self {
        Self {
            inner,
            endian,
            stage: Stage::Header,
        }
    }

    /// Current byte order.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Switch the byte order for all subsequent multi-byte reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Mark the decode stage reported by subsequent errors.
    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Current absolute position in the underlying stream.
    pub fn position(&mut self) -> Result<u64> {
        self.inner.stream_position().map_err(|e| self.fail(e))
    }

    /// Seek to an absolute position.
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(pos))
            .map(|_| ())
            .map_err(|e| self.fail(e))
    }

    /// Advance to the next 4-byte boundary, measured from the start of the
    /// stream. No-op when already aligned.
    pub fn align4(&mut self) -> Result<()> {
        let pos = self.position()?;
        let rem = pos % 4;
        if rem != 0 {
            self.seek_to(pos + (4 - rem))?;
        }
        Ok(())
    }

    /// Read one byte.
    pub fn u8(&mut self) -> Result<u8> {
        self.inner.read_u8().map_err(|e| self.fail(e))
    }

    /// Read one byte as a boolean (zero = false).
    pub fn boolean(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    impl_read_prim!(u16, u16, read_u16);
    impl_read_prim!(i16, i16, read_i16);
    impl_read_prim!(u32, u32, read_u32);
    impl_read_prim!(i32, i32, read_i32);
    impl_read_prim!(u64, u64, read_u64);
    impl_read_prim!(i64, i64, read_i64);

    /// Read exactly `N` bytes into a fixed-size array.
    pub fn bytes_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        self.inner.read_exact(&mut b).map_err(|e| self.fail(e))?;
        Ok(b)
    }

    /// Read exactly `len` bytes into a `Vec`.
    pub fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut b = vec![0u8; len];
        self.inner.read_exact(&mut b).map_err(|e| self.fail(e))?;
        Ok(b)
    }

    /// Read a null-terminated UTF-8 string from the current position.
    pub fn null_string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a length-prefixed `i32` array (count as `i32`, then that many
    /// values).
    pub fn i32_array(&mut self) -> Result<Vec<i32>> {
        let count = self.count()?;
        let mut v = Vec::with_capacity(count);
        for _ in 0..count {
            v.push(self.i32()?);
        }
        Ok(v)
    }

    /// Read an `i32` element count, rejecting negative values.
    pub fn count(&mut self) -> Result<usize> {
        let raw = self.i32()?;
        usize::try_from(raw).map_err(|_| Error::Parse {
            stage: self.stage,
            message: "negative element count",
        })
    }

    fn fail(&mut self, e: std::io::Error) -> Error {
        let offset = self.inner.stream_position().unwrap_or(0);
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Truncated {
                stage: self.stage,
                offset,
            }
        } else {
            Error::Io {
                stage: self.stage,
                offset,
                source: e,
            }
        }
    }
}

/// Extract a null-terminated UTF-8 string from a byte slice at `offset`.
///
/// Returns [`Error::BadStringOffset`] if `offset` is out of bounds or no
/// null byte follows it.
pub(crate) fn null_string_at(buf: &[u8], offset: u32) -> Result<String> {
    let slice = buf
        .get(offset as usize..)
        .ok_or(Error::BadStringOffset { offset })?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::BadStringOffset { offset })?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}
