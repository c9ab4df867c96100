use super::Tlcs900h;
use super::decode::{BitOp, CarryOp};
use super::registers::{Flag, RegRef};
use crate::core::{Bus, BusMaster, Width};

impl Tlcs900h {
    /// Combine bit `bit` of `value` into the carry flag. Returns the new
    /// operand value for STCF, `None` when the operand is unchanged.
    fn carry_op(&mut self, op: CarryOp, value: u32, bit: u8) -> Option<u32> {
        let b = (value >> bit) & 1 != 0;
        let c = self.regs.flag(Flag::C);
        match op {
            CarryOp::And => self.regs.set_flag(Flag::C, c & b),
            CarryOp::Or => self.regs.set_flag(Flag::C, c | b),
            CarryOp::Xor => self.regs.set_flag(Flag::C, c ^ b),
            CarryOp::Load => self.regs.set_flag(Flag::C, b),
            CarryOp::Store => {
                let mask = 1u32 << bit;
                return Some(if c { value | mask } else { value & !mask });
            }
        }
        None
    }

    /// ANDCF/ORCF/XORCF/LDCF/STCF on a register. Bit numbers past the operand
    /// width do nothing.
    pub(crate) fn op_carry_reg(&mut self, op: CarryOp, width: Width, reg: RegRef, bit: u8) -> u32 {
        if bit as u32 >= width.bits() {
            return 0;
        }
        let value = self.regs.read(reg, width);
        if let Some(stored) = self.carry_op(op, value, bit) {
            self.regs.write(reg, width, stored);
        }
        0
    }

    /// Carry-flag bit operations on a memory byte.
    pub(crate) fn op_carry_mem<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        op: CarryOp,
        addr: u32,
        bit: u8,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        if bit >= 8 {
            return 0;
        }
        let value = bus.read(master, addr) as u32;
        if let Some(stored) = self.carry_op(op, value, bit) {
            bus.write(master, addr, stored as u8);
        }
        0
    }

    /// BIT-style flag update: Z = !bit, H = 1, N = 0; S, V and C are kept.
    fn test_bit(&mut self, value: u32, bit: u8) {
        self.regs.set_flag(Flag::Z, (value >> bit) & 1 == 0);
        self.regs.set_flag(Flag::H, true);
        self.regs.set_flag(Flag::N, false);
    }

    fn bit_op(&mut self, op: BitOp, value: u32, bit: u8) -> Option<u32> {
        let mask = 1u32 << bit;
        match op {
            BitOp::Res => Some(value & !mask),
            BitOp::Set => Some(value | mask),
            BitOp::Chg => Some(value ^ mask),
            BitOp::Bit => {
                self.test_bit(value, bit);
                None
            }
            BitOp::Tset => {
                self.test_bit(value, bit);
                Some(value | mask)
            }
        }
    }

    /// RES/SET/CHG/BIT/TSET #4,r
    pub(crate) fn op_bit_reg(&mut self, op: BitOp, width: Width, reg: RegRef, bit: u8) -> u32 {
        let bit = bit & (width.bits() as u8 - 1);
        let value = self.regs.read(reg, width);
        if let Some(result) = self.bit_op(op, value, bit) {
            self.regs.write(reg, width, result);
        }
        0
    }

    /// RES/SET/CHG/BIT/TSET #3,(mem)
    pub(crate) fn op_bit_mem<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        op: BitOp,
        addr: u32,
        bit: u8,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let value = bus.read(master, addr) as u32;
        if let Some(result) = self.bit_op(op, value, bit & 7) {
            bus.write(master, addr, result as u8);
        }
        0
    }
}
