pub mod shared_ram;
pub mod timer;

pub use shared_ram::SharedRam;
pub use timer::Timers;

use thiserror::Error;

use crate::core::TickKind;

/// Non-fatal conditions a peripheral reports to the host. Emulation continues.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralFault {
    #[error("micro-DMA channel {channel}: unsupported mode 0x{mode:02X}")]
    UnsupportedDmaMode { channel: u8, mode: u8 },

    #[error("timer {timer}: unsupported clock source {source_select}")]
    UnsupportedClock { timer: u8, source_select: u8 },

    #[error("write of 0x{value:02X} to read-only register 0x{offset:02X}")]
    ReadOnly { offset: u32, value: u8 },
}

/// A byte-wide register block mapped into the bus.
///
/// Offsets are relative to the start of the block. Wider CPU accesses are
/// split into bytes by the bus before they get here.
pub trait Peripheral {
    fn read(&mut self, offset: u32) -> u8;

    fn write(&mut self, offset: u32, value: u8) -> Result<(), PeripheralFault>;

    /// Periodic boundary notification from the machine's scheduler.
    fn tick(&mut self, _kind: TickKind) {}
}
