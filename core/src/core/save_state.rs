//! Save-state blob codec.
//!
//! A state is a flat little-endian byte sequence written in a fixed field
//! order. The header carries a magic tag, a format version and the CRC-32 of
//! the cartridge the state was taken from; a blob is only accepted when all
//! three match and its length is exactly what the current layout produces.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Errors raised while decoding a save state. The machine's current state is
/// never modified when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("not a save state (bad magic)")]
    BadMagic,

    #[error("state is from an unsupported version ({found}, expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("state is from a different cartridge (CRC32 0x{found:08X}, loaded 0x{expected:08X})")]
    WrongCartridge { found: u32, expected: u32 },

    #[error("state size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("state truncated while reading {field}")]
    Truncated { field: &'static str },

    #[error("invalid value 0x{value:X} for {field}")]
    InvalidField { field: &'static str, value: u32 },
}

/// Fixed header preceding every state body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub cartridge_crc: u32,
}

impl StateHeader {
    pub const SIZE: usize = 4 + 2 + 4;
}

pub struct StateWriter {
    buf: BytesMut,
}

impl Default for StateWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StateWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn put_header(&mut self, header: &StateHeader) {
        self.buf.put_slice(&header.magic);
        self.buf.put_u16_le(header.version);
        self.buf.put_u32_le(header.cartridge_crc);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

pub struct StateReader<'a> {
    buf: &'a [u8],
}

impl<'a> StateReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { buf: data }
    }

    fn need(&self, n: usize, field: &'static str) -> Result<(), StateError> {
        if self.buf.remaining() < n {
            Err(StateError::Truncated { field })
        } else {
            Ok(())
        }
    }

    /// Read and validate the header against the expected magic, version and cartridge.
    pub fn expect_header(&mut self, expected: &StateHeader) -> Result<(), StateError> {
        self.need(StateHeader::SIZE, "header")?;
        let mut magic = [0u8; 4];
        self.buf.copy_to_slice(&mut magic);
        if magic != expected.magic {
            return Err(StateError::BadMagic);
        }
        let version = self.buf.get_u16_le();
        if version != expected.version {
            return Err(StateError::UnsupportedVersion {
                found: version,
                expected: expected.version,
            });
        }
        let crc = self.buf.get_u32_le();
        if crc != expected.cartridge_crc {
            return Err(StateError::WrongCartridge {
                found: crc,
                expected: expected.cartridge_crc,
            });
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8, StateError> {
        self.need(1, "u8")?;
        Ok(self.buf.get_u8())
    }

    pub fn get_bool(&mut self) -> Result<bool, StateError> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(StateError::InvalidField {
                field: "bool",
                value: v as u32,
            }),
        }
    }

    pub fn get_u16(&mut self) -> Result<u16, StateError> {
        self.need(2, "u16")?;
        Ok(self.buf.get_u16_le())
    }

    pub fn get_u32(&mut self) -> Result<u32, StateError> {
        self.need(4, "u32")?;
        Ok(self.buf.get_u32_le())
    }

    pub fn get_u64(&mut self) -> Result<u64, StateError> {
        self.need(8, "u64")?;
        Ok(self.buf.get_u64_le())
    }

    pub fn copy_to(&mut self, dst: &mut [u8]) -> Result<(), StateError> {
        self.need(dst.len(), "byte block")?;
        self.buf.copy_to_slice(dst);
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}
