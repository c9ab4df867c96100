//! Neo Geo Pocket cartridge images.
//!
//! A cartridge is a flat little-endian image whose first 0x40 bytes are the
//! software header. The header is parsed once at load; the image itself is
//! kept in a shared immutable buffer so that machine snapshots can clone it
//! for free.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Size of the software header at the start of every image.
pub const HEADER_SIZE: usize = 0x40;

/// Size of the system BIOS image.
pub const BIOS_SIZE: usize = 0x1_0000;

const LICENSE_COPYRIGHT: &[u8; 28] = b"COPYRIGHT BY SNK CORPORATION";
const LICENSE_LICENSED: &[u8; 28] = b" LICENSED BY SNK CORPORATION";

const ENTRY_POINT: usize = 0x1C;
const CATALOG: usize = 0x20;
const SUB_CATALOG: usize = 0x22;
const COLOR_MODE: usize = 0x23;
const TITLE: usize = 0x24;
const TITLE_LEN: usize = 12;

/// Header value at 0x23 that marks colour software.
const COLOR_FLAG: u8 = 0x10;

// ---------------------------------------------------------------------------
// CRC-32
// ---------------------------------------------------------------------------

/// CRC-32 lookup table (reflected polynomial 0xEDB88320).
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// CRC-32 of `data`, as used by ZIP. Identifies a cartridge in save states.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("cartridge image is {size} bytes, smaller than the {HEADER_SIZE}-byte header")]
    TooSmall { size: usize },

    #[error("BIOS image is {size} bytes, expected {BIOS_SIZE}")]
    BiosSize { size: usize },
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartridgeHeader {
    /// One of the two SNK licence strings is present.
    pub licensed: bool,
    /// Address execution starts at when booting without a BIOS.
    pub entry_point: u32,
    pub catalog: u16,
    pub sub_catalog: u8,
    /// Software written for the Pocket Color.
    pub color: bool,
    pub title: String,
}

impl CartridgeHeader {
    fn parse(image: &[u8]) -> Self {
        let license = &image[..LICENSE_COPYRIGHT.len()];
        let licensed = license == LICENSE_COPYRIGHT || license == LICENSE_LICENSED;
        let entry_point = u32::from_le_bytes([
            image[ENTRY_POINT],
            image[ENTRY_POINT + 1],
            image[ENTRY_POINT + 2],
            image[ENTRY_POINT + 3],
        ]) & 0x00FF_FFFF;
        let catalog = u16::from_le_bytes([image[CATALOG], image[CATALOG + 1]]);
        let title = image[TITLE..TITLE + TITLE_LEN]
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
            .collect::<String>()
            .trim_end()
            .to_string();

        Self {
            licensed,
            entry_point,
            catalog,
            sub_catalog: image[SUB_CATALOG],
            color: image[COLOR_MODE] == COLOR_FLAG,
            title,
        }
    }
}

// ---------------------------------------------------------------------------
// Cartridge
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cartridge {
    data: Bytes,
    header: CartridgeHeader,
    crc32: u32,
}

impl Cartridge {
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self, CartridgeError> {
        let data: Bytes = data.into();
        if data.len() < HEADER_SIZE {
            return Err(CartridgeError::TooSmall { size: data.len() });
        }
        let header = CartridgeHeader::parse(&data);
        if !header.licensed {
            tracing::warn!(title = %header.title, "cartridge header has no SNK licence string");
        }
        let crc32 = crc32(&data);
        tracing::debug!(
            title = %header.title,
            size = data.len(),
            crc32 = format_args!("{crc32:08X}"),
            "cartridge loaded"
        );
        Ok(Self { data, header, crc32 })
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte at `offset` into the image, or `None` past its end.
    pub fn byte(&self, offset: u32) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    /// Number of `page_size` pages the image spans (at least one).
    pub fn page_count(&self, page_size: u32) -> u32 {
        (self.data.len() as u32).div_ceil(page_size).max(1)
    }
}

/// Check a BIOS image and copy it into a fixed-size buffer.
pub fn load_bios(image: &[u8]) -> Result<Box<[u8; BIOS_SIZE]>, CartridgeError> {
    let mut bios = Box::new([0u8; BIOS_SIZE]);
    if image.len() != BIOS_SIZE {
        return Err(CartridgeError::BiosSize { size: image.len() });
    }
    bios.copy_from_slice(image);
    Ok(bios)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(license: &[u8], color: u8, title: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; 0x100];
        data[..license.len()].copy_from_slice(license);
        data[ENTRY_POINT..ENTRY_POINT + 4].copy_from_slice(&0x0020_0040u32.to_le_bytes());
        data[CATALOG..CATALOG + 2].copy_from_slice(&0x0123u16.to_le_bytes());
        data[SUB_CATALOG] = 0x05;
        data[COLOR_MODE] = color;
        data[TITLE..TITLE + title.len()].copy_from_slice(title);
        data
    }

    #[test]
    fn crc32_canonical_123456789() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_empty() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn parses_header_fields() {
        let cart = Cartridge::from_bytes(image(LICENSE_COPYRIGHT, 0x10, b"POCKET DEMO ")).unwrap();
        let header = cart.header();
        assert!(header.licensed);
        assert_eq!(header.entry_point, 0x20_0040);
        assert_eq!(header.catalog, 0x0123);
        assert_eq!(header.sub_catalog, 0x05);
        assert!(header.color);
        assert_eq!(header.title, "POCKET DEMO");
    }

    #[test]
    fn alternate_license_and_mono() {
        let cart = Cartridge::from_bytes(image(LICENSE_LICENSED, 0x00, b"MONO")).unwrap();
        assert!(cart.header().licensed);
        assert!(!cart.header().color);
        assert_eq!(cart.header().title, "MONO");
    }

    #[test]
    fn unlicensed_image_still_loads() {
        let cart = Cartridge::from_bytes(image(b"HOMEBREW", 0x00, b"X")).unwrap();
        assert!(!cart.header().licensed);
    }

    #[test]
    fn rejects_short_image() {
        assert_eq!(
            Cartridge::from_bytes(vec![0u8; 0x3F]),
            Err(CartridgeError::TooSmall { size: 0x3F })
        );
    }

    #[test]
    fn crc_identifies_image() {
        let a = Cartridge::from_bytes(image(LICENSE_COPYRIGHT, 0, b"A")).unwrap();
        let b = Cartridge::from_bytes(image(LICENSE_COPYRIGHT, 0, b"B")).unwrap();
        assert_ne!(a.crc32(), b.crc32());
        assert_eq!(a.crc32(), crc32(&image(LICENSE_COPYRIGHT, 0, b"A")));
    }

    #[test]
    fn page_count_rounds_up() {
        let cart = Cartridge::from_bytes(vec![0u8; 0x30_0000]).unwrap();
        assert_eq!(cart.page_count(0x20_0000), 2);
        assert_eq!(cart.byte(0x2F_FFFF), Some(0));
        assert_eq!(cart.byte(0x30_0000), None);
    }

    #[test]
    fn bios_size_is_checked() {
        assert!(load_bios(&[0u8; BIOS_SIZE]).is_ok());
        assert_eq!(
            load_bios(&[0u8; 16]).map(|_| ()),
            Err(CartridgeError::BiosSize { size: 16 })
        );
    }
}
