use super::Tlcs900h;
use super::alu::{self, AluOp, AluOutput, ShiftOp};
use super::registers::{Flag, RegRef};
use crate::core::{Bus, BusExt, BusMaster, Width};

impl Tlcs900h {
    #[inline]
    fn flags(&self) -> u8 {
        self.regs.sr.flags()
    }

    #[inline]
    fn set_flags(&mut self, flags: u8) {
        self.regs.sr.set_flags(flags);
    }

    /// Store an ALU result into a register and update F.
    fn finish_reg(&mut self, width: Width, reg: RegRef, out: AluOutput) {
        self.regs.write(reg, width, out.result);
        self.set_flags(out.flags);
    }

    /// ALU R,r / ALU r,# / ALU R,(mem). CP leaves `reg` untouched.
    pub(crate) fn op_alu_reg(&mut self, op: AluOp, width: Width, reg: RegRef, rhs: u32) -> u32 {
        let lhs = self.regs.read(reg, width);
        let out = alu::apply(op, width, lhs, rhs, self.flags());
        if op.writes_result() {
            self.regs.write(reg, width, out.result);
        }
        self.set_flags(out.flags);
        0
    }

    /// ALU (mem),R / ALU (mem),#
    pub(crate) fn op_alu_mem<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        op: AluOp,
        width: Width,
        addr: u32,
        rhs: u32,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let lhs = bus.load(master, addr, width);
        let out = alu::apply(op, width, lhs, rhs, self.flags());
        if op.writes_result() {
            bus.store(master, addr, width, out.result);
        }
        self.set_flags(out.flags);
        0
    }

    pub(crate) fn op_cpl(&mut self, width: Width, reg: RegRef) -> u32 {
        let out = alu::cpl(width, self.regs.read(reg, width), self.flags());
        self.finish_reg(width, reg, out);
        0
    }

    pub(crate) fn op_neg(&mut self, width: Width, reg: RegRef) -> u32 {
        let out = alu::neg(width, self.regs.read(reg, width), self.flags());
        self.finish_reg(width, reg, out);
        0
    }

    /// INC #3,r. Only byte registers update flags; the carry is always kept.
    pub(crate) fn op_inc_reg(&mut self, width: Width, reg: RegRef, n: u8) -> u32 {
        let n = if n == 0 { 8 } else { n as u32 };
        let value = self.regs.read(reg, width);
        if width == Width::Byte {
            let out = alu::inc(width, value, n, self.flags());
            self.finish_reg(width, reg, out);
        } else {
            self.regs.write(reg, width, value.wrapping_add(n));
        }
        0
    }

    /// DEC #3,r
    pub(crate) fn op_dec_reg(&mut self, width: Width, reg: RegRef, n: u8) -> u32 {
        let n = if n == 0 { 8 } else { n as u32 };
        let value = self.regs.read(reg, width);
        if width == Width::Byte {
            let out = alu::dec(width, value, n, self.flags());
            self.finish_reg(width, reg, out);
        } else {
            self.regs.write(reg, width, value.wrapping_sub(n));
        }
        0
    }

    /// INC #3,(mem)
    pub(crate) fn op_inc_mem<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        addr: u32,
        n: u8,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let n = if n == 0 { 8 } else { n as u32 };
        let out = alu::inc(width, bus.load(master, addr, width), n, self.flags());
        bus.store(master, addr, width, out.result);
        self.set_flags(out.flags);
        0
    }

    /// DEC #3,(mem)
    pub(crate) fn op_dec_mem<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        addr: u32,
        n: u8,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let n = if n == 0 { 8 } else { n as u32 };
        let out = alu::dec(width, bus.load(master, addr, width), n, self.flags());
        bus.store(master, addr, width, out.result);
        self.set_flags(out.flags);
        0
    }

    /// Shift or rotate a register by `count` (0 means 16).
    pub(crate) fn op_shift_reg(&mut self, op: ShiftOp, width: Width, reg: RegRef, count: u8) -> u32 {
        let count = if count == 0 { 16 } else { count as u32 };
        let out = alu::shift(op, width, self.regs.read(reg, width), count, self.flags());
        self.finish_reg(width, reg, out);
        // Two states per bit position.
        count * 2
    }

    /// Shift or rotate memory by one position.
    pub(crate) fn op_shift_mem<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        op: ShiftOp,
        width: Width,
        addr: u32,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let out = alu::shift(op, width, bus.load(master, addr, width), 1, self.flags());
        bus.store(master, addr, width, out.result);
        self.set_flags(out.flags);
        0
    }

    /// MUL/MULS: `product` (double width) = `lhs` (width) * `rhs`.
    pub(crate) fn op_mul(
        &mut self,
        width: Width,
        product: RegRef,
        lhs: RegRef,
        rhs: u32,
        signed: bool,
    ) -> u32 {
        let a = self.regs.read(lhs, width);
        let result = alu::multiply(width, a, rhs, signed);
        if let Some(wide) = width.wider() {
            self.regs.write(product, wide, result);
        }
        0
    }

    /// DIV/DIVS: `quotient` (double width) holds the dividend on entry and
    /// remainder:quotient on exit.
    pub(crate) fn op_div(&mut self, width: Width, quotient: RegRef, divisor: u32, signed: bool) -> u32 {
        let Some(wide) = width.wider() else {
            return 0;
        };
        let dividend = self.regs.read(quotient, wide);
        let out = alu::divide(width, dividend, divisor, signed, self.flags());
        self.finish_reg(wide, quotient, out);
        0
    }

    pub(crate) fn op_daa(&mut self, reg: RegRef) -> u32 {
        let out = alu::daa(self.regs.read(reg, Width::Byte) as u8, self.flags());
        self.finish_reg(Width::Byte, reg, out);
        0
    }

    pub(crate) fn op_extz(&mut self, width: Width, reg: RegRef) -> u32 {
        let value = alu::extz(width, self.regs.read(reg, width));
        self.regs.write(reg, width, value);
        0
    }

    pub(crate) fn op_exts(&mut self, width: Width, reg: RegRef) -> u32 {
        let value = alu::exts(width, self.regs.read(reg, width));
        self.regs.write(reg, width, value);
        0
    }

    /// PAA: round an odd pointer up to even.
    pub(crate) fn op_paa(&mut self, width: Width, reg: RegRef) -> u32 {
        let value = self.regs.read(reg, width);
        if value & 1 != 0 {
            self.regs.write(reg, width, value.wrapping_add(1));
        }
        0
    }

    pub(crate) fn op_mirr(&mut self, reg: RegRef) -> u32 {
        let value = alu::mirror(self.regs.read(reg, Width::Word) as u16);
        self.regs.write(reg, Width::Word, value as u32);
        0
    }

    /// BS1F / BS1B: A = index of the lowest (forward) or highest (backward)
    /// set bit. V is set and A left alone when the register is zero.
    pub(crate) fn op_bs1(&mut self, reg: RegRef, forward: bool) -> u32 {
        let value = self.regs.read(reg, Width::Word) as u16;
        if value == 0 {
            self.regs.set_flag(Flag::V, true);
            return 0;
        }
        let index = if forward {
            value.trailing_zeros()
        } else {
            15 - value.leading_zeros()
        };
        self.regs.set_a(index as u8);
        self.regs.set_flag(Flag::V, false);
        0
    }

    /// MULA rr: `acc += (XDE) * (XHL)` as signed words, then XHL -= 2.
    pub(crate) fn op_mula<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        acc: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        use super::registers::{XDE, XHL};

        let xde = self.regs.long(XDE);
        let xhl = self.regs.long(XHL);
        let a = bus.load(master, xde, Width::Word);
        let b = bus.load(master, xhl, Width::Word);
        self.regs.set_long(XHL, xhl.wrapping_sub(2));

        let product = alu::multiply(Width::Word, a, b, true);
        let sum = alu::apply(AluOp::Add, Width::Long, self.regs.read(acc, Width::Long), product, 0);
        self.regs.write(acc, Width::Long, sum.result);

        let mut f = self.flags();
        for flag in [Flag::S, Flag::Z, Flag::V] {
            f = alu::set(f, flag, alu::has(sum.flags, flag));
        }
        self.set_flags(f);
        0
    }

    /// MINC1/2/4 and MDEC1/2/4: step a word register by `step` inside a
    /// power-of-two ring whose size follows the opcode as `size - 1`.
    pub(crate) fn op_modulo_step<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        reg: RegRef,
        step: u16,
        increment: bool,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let size = self.fetch16(bus, master).wrapping_add(1);
        let value = self.regs.read(reg, Width::Word) as u16;
        let position = value & size.wrapping_sub(1);
        let next = if increment {
            if position == size.wrapping_sub(step) {
                value.wrapping_sub(size.wrapping_sub(step))
            } else {
                value.wrapping_add(step)
            }
        } else if position == 0 {
            value.wrapping_add(size.wrapping_sub(step))
        } else {
            value.wrapping_sub(step)
        };
        self.regs.write(reg, Width::Word, next as u32);
        0
    }

    /// RLD A,(mem): rotate the low nibble of A and the byte at `addr` left by a nibble.
    pub(crate) fn op_rld<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        addr: u32,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let a = self.regs.a();
        let m = bus.read(master, addr);
        let new_a = (a & 0xF0) | (m >> 4);
        let new_m = (m << 4) | (a & 0x0F);
        bus.write(master, addr, new_m);
        self.finish_digit_rotate(new_a);
        0
    }

    /// RRD A,(mem)
    pub(crate) fn op_rrd<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        addr: u32,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let a = self.regs.a();
        let m = bus.read(master, addr);
        let new_a = (a & 0xF0) | (m & 0x0F);
        let new_m = ((a & 0x0F) << 4) | (m >> 4);
        bus.write(master, addr, new_m);
        self.finish_digit_rotate(new_a);
        0
    }

    fn finish_digit_rotate(&mut self, a: u8) {
        self.regs.set_a(a);
        let mut f = alu::sign_zero(self.flags(), Width::Byte, a as u32);
        f = alu::set(f, Flag::H, false);
        f = alu::set(f, Flag::N, false);
        f = alu::set(f, Flag::V, alu::even_parity(Width::Byte, a as u32));
        self.set_flags(f);
    }
}
