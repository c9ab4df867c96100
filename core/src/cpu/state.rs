//! CPU state snapshot types and traits

use serde::Serialize;

/// Trait for CPU types that can provide state snapshots
pub trait CpuStateTrait {
    type Snapshot;
    fn snapshot(&self) -> Self::Snapshot;
}

/// TLCS-900/H CPU state snapshot (debugging/introspection only)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tlcs900hState {
    pub banks: [[u32; 4]; 4], // XWA, XBC, XDE, XHL for banks 0-3
    pub xix: u32,
    pub xiy: u32,
    pub xiz: u32,
    pub xsp: u32,   // Stack pointer
    pub pc: u32,    // Program counter (24 bits significant)
    pub sr: u16,    // Status register: SYSM, IFF, MAX, RFP, flags
    pub f_alt: u8,  // F' (alternate flags)
    pub rfp: u8,    // Active register bank
    pub iff: u8,    // Interrupt mask level
    pub halted: bool,
}
