use super::registers::{Flag, RegRef};
use super::{ADDRESS_MASK, StatusRegister, Tlcs900h};
use crate::core::{Bus, BusExt, BusMaster, Width};

/// Extra cycles when a conditional relative branch is taken.
const TAKEN_RELATIVE: u32 = 4;
/// Extra cycles when a conditional JP/CALL/RET through the destination group is taken.
const TAKEN_JP: u32 = 5;
const TAKEN_CALL: u32 = 6;
const TAKEN_RET: u32 = 6;

/// SWI n vectors through `0xFFFF00 + 4n`.
const SWI_VECTOR_BASE: u32 = 0xFF_FF00;

impl Tlcs900h {
    /// Evaluate one of the sixteen condition codes.
    ///
    /// | cc | name | cc | name |
    /// |----|------|----|------|
    /// | 0  | F    | 8  | T    |
    /// | 1  | LT   | 9  | GE   |
    /// | 2  | LE   | A  | GT   |
    /// | 3  | ULE  | B  | UGT  |
    /// | 4  | OV   | C  | NOV  |
    /// | 5  | MI   | D  | PL   |
    /// | 6  | Z    | E  | NZ   |
    /// | 7  | C    | F  | NC   |
    pub(crate) fn condition(&self, cc: u8) -> bool {
        let s = self.regs.flag(Flag::S);
        let z = self.regs.flag(Flag::Z);
        let v = self.regs.flag(Flag::V);
        let c = self.regs.flag(Flag::C);
        let base = match cc & 7 {
            0 => false,
            1 => s ^ v,
            2 => (s ^ v) || z,
            3 => c || z,
            4 => v,
            5 => s,
            6 => z,
            _ => c,
        };
        if cc & 8 != 0 { !base } else { base }
    }

    /// JP nn / JP nnn
    pub(crate) fn op_jp_abs<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        self.cursor = match width {
            Width::Word => self.fetch16(bus, master) as u32,
            _ => self.fetch24(bus, master),
        };
        0
    }

    /// CALL nn / CALL nnn
    pub(crate) fn op_call_abs<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let target = match width {
            Width::Word => self.fetch16(bus, master) as u32,
            _ => self.fetch24(bus, master),
        };
        let ret = self.cursor;
        self.push(bus, master, Width::Long, ret);
        self.cursor = target;
        0
    }

    /// CALR d16
    pub(crate) fn op_calr<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let d = self.fetch16(bus, master) as i16 as i32 as u32;
        let ret = self.cursor;
        self.push(bus, master, Width::Long, ret);
        self.cursor = ret.wrapping_add(d) & ADDRESS_MASK;
        0
    }

    /// JR cc,d8 (`width` = byte) and JRL cc,d16 (`width` = word).
    pub(crate) fn op_jr<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let d = width.sign_extend(self.fetch_imm(bus, master, width));
        if self.condition(self.opcode & 0x0F) {
            self.cursor = self.cursor.wrapping_add(d) & ADDRESS_MASK;
            TAKEN_RELATIVE
        } else {
            0
        }
    }

    /// DJNZ r,d8: decrement without touching flags, branch while non-zero.
    pub(crate) fn op_djnz<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        reg: RegRef,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let d = self.fetch8(bus, master) as i8 as i32 as u32;
        let value = self.regs.read(reg, width).wrapping_sub(1) & width.mask();
        self.regs.write(reg, width, value);
        if value != 0 {
            self.cursor = self.cursor.wrapping_add(d) & ADDRESS_MASK;
            TAKEN_RELATIVE
        } else {
            0
        }
    }

    pub(crate) fn op_ret<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        self.cursor = self.pop(bus, master, Width::Long) & ADDRESS_MASK;
        0
    }

    /// RETD d16: return, then release `d16` bytes of arguments.
    pub(crate) fn op_retd<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let d = self.fetch16(bus, master) as i16 as i32 as u32;
        self.cursor = self.pop(bus, master, Width::Long) & ADDRESS_MASK;
        let sp = self.regs.xsp().wrapping_add(d);
        self.regs.set_xsp(sp);
        0
    }

    /// RETI: SR then PC come off the stack in the reverse of interrupt entry.
    pub(crate) fn op_reti<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let sr = self.pop(bus, master, Width::Word);
        self.regs.sr = StatusRegister::from_bits(sr as u16);
        self.cursor = self.pop(bus, master, Width::Long) & ADDRESS_MASK;
        self.control.set_intnest(self.control.intnest().wrapping_sub(1));
        0
    }

    /// SWI n: software interrupt through the BIOS vector table.
    pub(crate) fn op_swi<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let n = (self.opcode & 7) as u32;
        let vector = bus.load(master, SWI_VECTOR_BASE + 4 * n, Width::Long);
        let ret = self.cursor;
        let sr = self.regs.sr.bits() as u32;
        self.push(bus, master, Width::Long, ret);
        self.push(bus, master, Width::Word, sr);
        self.cursor = vector & ADDRESS_MASK;
        0
    }

    /// JP cc,mem
    pub(crate) fn op_jp_cc(&mut self, cc: u8, addr: u32) -> u32 {
        if self.condition(cc) {
            self.cursor = addr & ADDRESS_MASK;
            TAKEN_JP
        } else {
            0
        }
    }

    /// CALL cc,mem
    pub(crate) fn op_call_cc<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        cc: u8,
        addr: u32,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        if !self.condition(cc) {
            return 0;
        }
        let ret = self.cursor;
        self.push(bus, master, Width::Long, ret);
        self.cursor = addr & ADDRESS_MASK;
        TAKEN_CALL
    }

    /// RET cc
    pub(crate) fn op_ret_cc<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        cc: u8,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        if !self.condition(cc) {
            return 0;
        }
        self.cursor = self.pop(bus, master, Width::Long) & ADDRESS_MASK;
        TAKEN_RET
    }

    /// SCC cc,r: r = 1 if the condition holds, else 0.
    pub(crate) fn op_scc(&mut self, width: Width, reg: RegRef, cc: u8) -> u32 {
        let value = self.condition(cc) as u32;
        self.regs.write(reg, width, value);
        0
    }
}
