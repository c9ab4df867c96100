//! Memory operand addressing.
//!
//! Source and destination prefixes select one of eight memory modes. Resolving
//! a mode only reads the instruction stream; register side effects of the
//! auto-increment/decrement forms are returned as a pending [`Writeback`] and
//! applied by the dispatcher once the whole instruction has decoded.

use super::registers::RegRef;
use super::{ADDRESS_MASK, Tlcs900h};
use crate::core::{Bus, BusMaster, Width};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// (XRR)
    Indirect(u8),
    /// (XRR+d8)
    IndirectDisp8(u8),
    /// (#8)
    Abs8,
    /// (#16)
    Abs16,
    /// (#24)
    Abs24,
    /// (r32), (r32+d16), (r32+r8), (r32+r16), chosen by a mode byte.
    Register,
    /// (-r32)
    PreDec,
    /// (r32+)
    PostInc,
}

impl Mode {
    /// Memory mode selected by a source (`0x80-0xAF`, `0xC0-0xE5`) or
    /// destination (`0xB0-0xBF`, `0xF0-0xF5`) prefix.
    pub(crate) const fn from_prefix(op: u8) -> Option<Mode> {
        match op {
            0x80..=0xBF => {
                let r = op & 7;
                Some(if op & 8 == 0 {
                    Mode::Indirect(r)
                } else {
                    Mode::IndirectDisp8(r)
                })
            }
            0xC0..=0xFF => match op & 0x0F {
                0 => Some(Mode::Abs8),
                1 => Some(Mode::Abs16),
                2 => Some(Mode::Abs24),
                3 => Some(Mode::Register),
                4 => Some(Mode::PreDec),
                5 => Some(Mode::PostInc),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A register update deferred until the instruction is known to be legal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Writeback {
    pub reg: RegRef,
    pub value: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EffectiveAddress {
    pub addr: u32,
    /// Extra cycles charged for this mode.
    pub penalty: u32,
    pub writeback: Option<Writeback>,
}

impl EffectiveAddress {
    const fn plain(addr: u32, penalty: u32) -> Self {
        Self {
            addr: addr & ADDRESS_MASK,
            penalty,
            writeback: None,
        }
    }
}

impl Tlcs900h {
    /// Compute the effective address for `mode`, consuming any extension
    /// bytes from the instruction stream.
    ///
    /// Returns the offending mode byte if the encoding names no valid
    /// register or combination.
    pub(crate) fn resolve<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        mode: Mode,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<EffectiveAddress, u8> {
        match mode {
            Mode::Indirect(r) => Ok(EffectiveAddress::plain(self.regs.long(r), 0)),
            Mode::IndirectDisp8(r) => {
                let d = self.fetch8(bus, master) as i8 as i32 as u32;
                Ok(EffectiveAddress::plain(self.regs.long(r).wrapping_add(d), 2))
            }
            Mode::Abs8 => Ok(EffectiveAddress::plain(self.fetch8(bus, master) as u32, 2)),
            Mode::Abs16 => Ok(EffectiveAddress::plain(self.fetch16(bus, master) as u32, 2)),
            Mode::Abs24 => Ok(EffectiveAddress::plain(self.fetch24(bus, master), 3)),
            Mode::Register => self.resolve_register_mode(bus, master),
            Mode::PreDec | Mode::PostInc => {
                let m = self.fetch8(bus, master);
                if m & 3 == 3 {
                    return Err(m);
                }
                let step = 1u32 << (m & 3);
                let reg = RegRef::from_code(m & 0xFC, Width::Long).ok_or(m)?;
                let old = self.regs.read(reg, Width::Long);
                let (addr, value) = if mode == Mode::PreDec {
                    let new = old.wrapping_sub(step);
                    (new, new)
                } else {
                    (old, old.wrapping_add(step))
                };
                Ok(EffectiveAddress {
                    addr: addr & ADDRESS_MASK,
                    penalty: 3,
                    writeback: Some(Writeback { reg, value }),
                })
            }
        }
    }

    fn resolve_register_mode<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<EffectiveAddress, u8> {
        let m = self.fetch8(bus, master);
        match m & 3 {
            0 => {
                let base = RegRef::from_code(m, Width::Long).ok_or(m)?;
                Ok(EffectiveAddress::plain(self.regs.read(base, Width::Long), 5))
            }
            1 => {
                let base = RegRef::from_code(m & 0xFC, Width::Long).ok_or(m)?;
                let d = self.fetch16(bus, master) as i16 as i32 as u32;
                let addr = self.regs.read(base, Width::Long).wrapping_add(d);
                Ok(EffectiveAddress::plain(addr, 5))
            }
            _ if m == 0x03 || m == 0x07 => {
                let base_code = self.fetch8(bus, master);
                let index_code = self.fetch8(bus, master);
                let base = RegRef::from_code(base_code, Width::Long).ok_or(m)?;
                let index_width = if m == 0x03 { Width::Byte } else { Width::Word };
                let index = RegRef::from_code(index_code, index_width).ok_or(m)?;
                let offset = index_width.sign_extend(self.regs.read(index, index_width));
                let addr = self.regs.read(base, Width::Long).wrapping_add(offset);
                Ok(EffectiveAddress::plain(addr, 8))
            }
            _ => Err(m),
        }
    }

    /// Apply a deferred auto-increment/decrement.
    pub(crate) fn commit(&mut self, ea: &EffectiveAddress) {
        if let Some(wb) = ea.writeback {
            self.regs.write(wb.reg, Width::Long, wb.value);
        }
    }
}
