use crate::core::component::BusMasterComponent;

/// Generic CPU interface
pub trait Cpu: BusMasterComponent + CpuStateTrait {
    /// Register-level reset (vector fetch is the machine's job; it owns the memory map)
    fn reset(&mut self);

    /// Query if CPU is halted internally (HALT instruction)
    fn is_sleeping(&self) -> bool;
}

// Re-export state types
pub mod state;
pub use state::{CpuStateTrait, Tlcs900hState};

// Toshiba TLCS-900/H main CPU
pub mod tlcs900h;
pub use tlcs900h::{CpuFault, Step, Tlcs900h};
