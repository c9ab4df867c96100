//! Status-register instructions and the LDC control-register file.

use super::Tlcs900h;
use super::registers::{Flag, RegRef};
use crate::core::save_state::{StateError, StateReader, StateWriter};
use crate::core::{Bus, BusMaster, Width};

const CONTROL_SIZE: usize = 0x40;
const INTNEST: u8 = 0x3C;

/// Registers reached only through `LDC cr,r` / `LDC r,cr`.
///
/// | code        | register           | width |
/// |-------------|--------------------|-------|
/// | 00/04/08/0C | DMAS0-3 (source)   | long  |
/// | 10/14/18/1C | DMAD0-3 (dest)     | long  |
/// | 20/24/28/2C | DMAC0-3 (count)    | word  |
/// | 22/26/2A/2E | DMAM0-3 (mode)     | byte  |
/// | 3C          | INTNEST            | word  |
///
/// Stored as one little-endian byte image so that narrower LDC accesses see
/// the same sub-ranges as the register file does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlRegisters {
    bytes: [u8; CONTROL_SIZE],
}

impl Default for ControlRegisters {
    fn default() -> Self {
        Self {
            bytes: [0; CONTROL_SIZE],
        }
    }
}

impl ControlRegisters {
    /// Whether `code` names a control register that can be accessed at `width`.
    pub fn is_valid(code: u8, width: Width) -> bool {
        let aligned = code as u32 % width.bytes() == 0;
        let in_range = match code {
            0x00..=0x1F => true,
            0x20..=0x2F => width != Width::Long,
            0x3C..=0x3D => width != Width::Long,
            _ => false,
        };
        aligned && in_range
    }

    fn read(&self, code: u8, width: Width) -> u32 {
        let start = code as usize;
        self.bytes[start..start + width.bytes() as usize]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
    }

    fn write(&mut self, code: u8, width: Width, value: u32) {
        let start = code as usize;
        for (i, byte) in self.bytes[start..start + width.bytes() as usize]
            .iter_mut()
            .enumerate()
        {
            *byte = (value >> (8 * i)) as u8;
        }
    }

    pub fn dma_source(&self, channel: usize) -> u32 {
        self.read(4 * (channel as u8 & 3), Width::Long)
    }

    pub fn set_dma_source(&mut self, channel: usize, value: u32) {
        self.write(4 * (channel as u8 & 3), Width::Long, value);
    }

    pub fn dma_dest(&self, channel: usize) -> u32 {
        self.read(0x10 + 4 * (channel as u8 & 3), Width::Long)
    }

    pub fn set_dma_dest(&mut self, channel: usize, value: u32) {
        self.write(0x10 + 4 * (channel as u8 & 3), Width::Long, value);
    }

    pub fn dma_count(&self, channel: usize) -> u16 {
        self.read(0x20 + 4 * (channel as u8 & 3), Width::Word) as u16
    }

    pub fn set_dma_count(&mut self, channel: usize, value: u16) {
        self.write(0x20 + 4 * (channel as u8 & 3), Width::Word, value as u32);
    }

    pub fn dma_mode(&self, channel: usize) -> u8 {
        self.read(0x22 + 4 * (channel as u8 & 3), Width::Byte) as u8
    }

    pub fn set_dma_mode(&mut self, channel: usize, value: u8) {
        self.write(0x22 + 4 * (channel as u8 & 3), Width::Byte, value as u32);
    }

    /// Interrupt nesting counter: incremented on acceptance, decremented by RETI.
    pub fn intnest(&self) -> u16 {
        self.read(INTNEST, Width::Word) as u16
    }

    pub fn set_intnest(&mut self, value: u16) {
        self.write(INTNEST, Width::Word, value as u32);
    }

    pub fn save(&self, w: &mut StateWriter) {
        w.put_slice(&self.bytes);
    }

    pub fn load(&mut self, r: &mut StateReader<'_>) -> Result<(), StateError> {
        r.copy_to(&mut self.bytes)
    }
}

impl Tlcs900h {
    pub(crate) fn op_halt(&mut self) -> u32 {
        self.halted = true;
        0
    }

    /// EI n. `EI 7` masks everything but level 7 (DI).
    pub(crate) fn op_ei<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let level = self.fetch8(bus, master);
        self.regs.sr.set_iff(level & 7);
        0
    }

    /// INCF / DECF: step the register bank pointer by `delta` (mod 4).
    pub(crate) fn op_bank_step(&mut self, delta: u8) -> u32 {
        let bank = self.regs.current_bank().wrapping_add(delta) & 3;
        self.regs.select_bank(bank);
        0
    }

    /// LDF n
    pub(crate) fn op_ldf<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let bank = self.fetch8(bus, master) & 3;
        self.regs.select_bank(bank);
        0
    }

    /// EX F,F'
    pub(crate) fn op_ex_flags(&mut self) -> u32 {
        let f = self.regs.sr.flags();
        self.regs.sr.set_flags(self.regs.f_alt);
        self.regs.f_alt = f;
        0
    }

    pub(crate) fn op_rcf(&mut self) -> u32 {
        self.regs.set_flag(Flag::C, false);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::N, false);
        0
    }

    pub(crate) fn op_scf(&mut self) -> u32 {
        self.regs.set_flag(Flag::C, true);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::N, false);
        0
    }

    pub(crate) fn op_ccf(&mut self) -> u32 {
        let c = self.regs.flag(Flag::C);
        self.regs.set_flag(Flag::C, !c);
        self.regs.set_flag(Flag::N, false);
        0
    }

    /// ZCF: C = !Z
    pub(crate) fn op_zcf(&mut self) -> u32 {
        let z = self.regs.flag(Flag::Z);
        self.regs.set_flag(Flag::C, !z);
        self.regs.set_flag(Flag::N, false);
        0
    }

    /// LDC cr,r. `cr` has been validated by the dispatcher.
    pub(crate) fn op_ldc_to_control(&mut self, width: Width, reg: RegRef, cr: u8) -> u32 {
        let value = self.regs.read(reg, width);
        self.control.write(cr, width, value);
        0
    }

    /// LDC r,cr
    pub(crate) fn op_ldc_from_control(&mut self, width: Width, reg: RegRef, cr: u8) -> u32 {
        let value = self.control.read(cr, width);
        self.regs.write(reg, width, value);
        0
    }
}
