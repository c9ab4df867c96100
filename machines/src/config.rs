//! Machine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where execution starts after reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootMode {
    /// Start at the cartridge entry point with the system state a BIOS would
    /// leave behind.
    #[default]
    Cartridge,
    /// Fetch the reset vector from the BIOS image. Falls back to
    /// `Cartridge` when no BIOS is loaded.
    Bios,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// System BIOS image. Read by the host; the machine receives the bytes.
    pub bios: Option<PathBuf>,
    /// Byte work RAM is filled with at reset.
    pub ram_fill: u8,
    pub boot: BootMode,
    /// Force colour or monochrome mode. `None` follows the cartridge header.
    pub color: Option<bool>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            bios: None,
            ram_fill: 0x00,
            boot: BootMode::Cartridge,
            color: None,
        }
    }
}
