use super::Tlcs900h;
use super::registers::RegRef;
use crate::core::{Bus, BusExt, BusMaster, Width};

impl Tlcs900h {
    /// LD R,n / LD RR,nn / LD XRR,nnnn and the register-group `LD r,#`.
    pub(crate) fn op_ld_reg_imm<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        reg: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let value = self.fetch_imm(bus, master, width);
        self.regs.write(reg, width, value);
        0
    }

    /// LD (n),n / LDW (n),nn: store an immediate into the first 256 bytes.
    pub(crate) fn op_store_abs8_imm<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let addr = self.fetch8(bus, master) as u32;
        let value = self.fetch_imm(bus, master, width);
        bus.store(master, addr, width, value);
        0
    }

    /// LDX (n),n, encoded `F7 00 n 00 imm 00`.
    pub(crate) fn op_ldx<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        self.fetch8(bus, master);
        let addr = self.fetch8(bus, master) as u32;
        self.fetch8(bus, master);
        let value = self.fetch8(bus, master);
        self.fetch8(bus, master);
        bus.write(master, addr, value);
        0
    }

    /// EX R,r
    pub(crate) fn op_ex_reg(&mut self, width: Width, a: RegRef, b: RegRef) -> u32 {
        let va = self.regs.read(a, width);
        let vb = self.regs.read(b, width);
        self.regs.write(a, width, vb);
        self.regs.write(b, width, va);
        0
    }

    /// EX (mem),R
    pub(crate) fn op_ex_mem<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        addr: u32,
        reg: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let mem = bus.load(master, addr, width);
        let value = self.regs.read(reg, width);
        bus.store(master, addr, width, value);
        self.regs.write(reg, width, mem);
        0
    }
}
