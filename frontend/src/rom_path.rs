//! Cartridge path resolution: loads an image from a bare `.ngp`/`.ngc`/`.npc`
//! file or from the first such entry inside a ZIP archive.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File extensions accepted as cartridge images, inside or outside an archive.
pub const CARTRIDGE_EXTENSIONS: &[&str] = &["ngp", "ngc", "npc"];

#[derive(Debug, Error)]
pub enum CartLoadError {
    #[error("cannot read cartridge: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid ZIP: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("no .ngp/.ngc/.npc image inside {}", .0.display())]
    NoImage(PathBuf),

    #[error("not a cartridge file: {}", .0.display())]
    UnknownExtension(PathBuf),
}

fn has_extension(name: &Path, accepted: &[&str]) -> bool {
    name.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| accepted.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

/// Resolve a cartridge path and return the raw image.
///
/// Resolution order:
/// 1. `.zip` → the first archive entry with a cartridge extension.
/// 2. `.ngp`, `.ngc` or `.npc` → the file itself.
pub fn load_cartridge(path: &Path) -> Result<Vec<u8>, CartLoadError> {
    if has_extension(path, &["zip"]) {
        return load_from_zip(path);
    }
    if has_extension(path, CARTRIDGE_EXTENSIONS) {
        return Ok(std::fs::read(path)?);
    }
    Err(CartLoadError::UnknownExtension(path.to_path_buf()))
}

fn load_from_zip(path: &Path) -> Result<Vec<u8>, CartLoadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut archive = zip::ZipArchive::new(reader)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !has_extension(Path::new(entry.name()), CARTRIDGE_EXTENSIONS) {
            continue;
        }
        tracing::debug!(archive = %path.display(), entry = entry.name(), "cartridge found in archive");
        let mut data = Vec::with_capacity(entry.size() as usize);
        std::io::Read::read_to_end(&mut entry, &mut data)?;
        return Ok(data);
    }

    Err(CartLoadError::NoImage(path.to_path_buf()))
}
