//! Frontend settings, read from TOML.
//!
//! ```toml
//! log_level = "debug"
//!
//! [machine]
//! bios = "/roms/ngp/bios.ngp"
//! boot = "bios"
//! color = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pocket_machines::MachineConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    pub machine: MachineConfig,
}

/// `<config dir>/pocket/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pocket").join("config.toml"))
}

/// Load settings from `explicit`, which must exist, or from the default
/// location if there is one. No file means default settings.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Settings::default()),
        },
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn parse(text: &str) -> Result<Settings> {
    Ok(toml::from_str(text)?)
}
