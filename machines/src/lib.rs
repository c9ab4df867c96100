pub mod cartridge;
pub mod config;
pub mod ngp;

pub use cartridge::{Cartridge, CartridgeError, CartridgeHeader};
pub use config::{BootMode, MachineConfig};
pub use ngp::NgpSystem;
