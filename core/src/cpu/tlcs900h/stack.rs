use super::registers::RegRef;
use super::{StatusRegister, Tlcs900h};
use crate::core::{Bus, BusExt, BusMaster, Width};

impl Tlcs900h {
    /// Pre-decrement XSP by the operand size and store `value` there.
    pub(crate) fn push<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        width: Width,
        value: u32,
    ) {
        let sp = self.regs.xsp().wrapping_sub(width.bytes());
        self.regs.set_xsp(sp);
        bus.store(master, sp, width, value);
    }

    /// Load from XSP and post-increment it by the operand size.
    pub(crate) fn pop<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        width: Width,
    ) -> u32 {
        let sp = self.regs.xsp();
        let value = bus.load(master, sp, width);
        self.regs.set_xsp(sp.wrapping_add(width.bytes()));
        value
    }

    /// PUSH SR
    pub(crate) fn op_push_sr<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let sr = self.regs.sr.bits() as u32;
        self.push(bus, master, Width::Word, sr);
        0
    }

    /// POP SR. Also reloads IFF and the bank selector.
    pub(crate) fn op_pop_sr<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let sr = self.pop(bus, master, Width::Word);
        self.regs.sr = StatusRegister::from_bits(sr as u16);
        0
    }

    /// PUSH n / PUSHW nn
    pub(crate) fn op_push_imm<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let value = self.fetch_imm(bus, master, width);
        self.push(bus, master, width, value);
        0
    }

    pub(crate) fn op_push_a<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let a = self.regs.a() as u32;
        self.push(bus, master, Width::Byte, a);
        0
    }

    pub(crate) fn op_pop_a<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let a = self.pop(bus, master, Width::Byte);
        self.regs.set_a(a as u8);
        0
    }

    pub(crate) fn op_push_f<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let f = self.regs.sr.flags() as u32;
        self.push(bus, master, Width::Byte, f);
        0
    }

    pub(crate) fn op_pop_f<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let f = self.pop(bus, master, Width::Byte);
        self.regs.sr.set_flags(f as u8);
        0
    }

    /// PUSH r (register group and the single-byte `PUSH RR` / `PUSH XRR` forms)
    pub(crate) fn op_push_reg<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        reg: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let value = self.regs.read(reg, width);
        self.push(bus, master, width, value);
        0
    }

    pub(crate) fn op_pop_reg<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        reg: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let value = self.pop(bus, master, width);
        self.regs.write(reg, width, value);
        0
    }

    /// LINK r,d16: push r, r = XSP, XSP += d16.
    pub(crate) fn op_link<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        reg: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let d = self.fetch16(bus, master) as i16 as i32 as u32;
        let frame = self.regs.read(reg, Width::Long);
        self.push(bus, master, Width::Long, frame);
        let sp = self.regs.xsp();
        self.regs.write(reg, Width::Long, sp);
        self.regs.set_xsp(sp.wrapping_add(d));
        0
    }

    /// UNLK r: XSP = r, pop r.
    pub(crate) fn op_unlk<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        reg: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let frame = self.regs.read(reg, Width::Long);
        self.regs.set_xsp(frame);
        let saved = self.pop(bus, master, Width::Long);
        self.regs.write(reg, Width::Long, saved);
        0
    }
}
