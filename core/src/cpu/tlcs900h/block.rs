use super::Tlcs900h;
use super::addressing::Mode;
use super::alu;
use super::decode::BlockOp;
use super::registers::{Flag, XBC, XDE, XHL, XIX, XIY};
use crate::core::{Bus, BusExt, BusMaster, Width};

/// Cost of every iteration after the first for the repeating forms.
const REPEAT_CYCLES: u32 = 4;

/// LDI-family transfers need `(XHL)` (to XDE) or `(XIX)` (to XIY); the compare
/// family scans through any plain register-indirect pointer.
pub(crate) fn prefix_allowed(op: BlockOp, mode: Mode) -> bool {
    match op {
        BlockOp::Ldi | BlockOp::Ldir | BlockOp::Ldd | BlockOp::Lddr => {
            matches!(mode, Mode::Indirect(XHL) | Mode::Indirect(XIX))
        }
        _ => matches!(mode, Mode::Indirect(_)),
    }
}

impl Tlcs900h {
    /// Block transfer and search. The repeating forms run to completion
    /// within one step.
    pub(crate) fn op_block<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        op: BlockOp,
        width: Width,
        mode: Mode,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let Mode::Indirect(src) = mode else {
            return 0;
        };
        let (repeat, forward) = match op {
            BlockOp::Ldi | BlockOp::Cpi => (false, true),
            BlockOp::Ldir | BlockOp::Cpir => (true, true),
            BlockOp::Ldd | BlockOp::Cpd => (false, false),
            BlockOp::Lddr | BlockOp::Cpdr => (true, false),
        };
        let transfer = matches!(op, BlockOp::Ldi | BlockOp::Ldir | BlockOp::Ldd | BlockOp::Lddr);

        let mut iterations = 0u32;
        loop {
            iterations += 1;
            let more = if transfer {
                self.block_transfer(width, src, forward, bus, master)
            } else {
                self.block_compare(width, src, forward, bus, master)
            };
            if !repeat || !more {
                break;
            }
        }
        (iterations - 1) * REPEAT_CYCLES
    }

    fn step_pointer(&mut self, reg: u8, width: Width, forward: bool) -> u32 {
        let addr = self.regs.long(reg);
        let next = if forward {
            addr.wrapping_add(width.bytes())
        } else {
            addr.wrapping_sub(width.bytes())
        };
        self.regs.set_long(reg, next);
        addr
    }

    /// Decrement BC. Returns true while it is still non-zero.
    fn count_down(&mut self) -> bool {
        let bc = self.regs.word(XBC).wrapping_sub(1);
        self.regs.set_word(XBC, bc);
        self.regs.set_flag(Flag::V, bc != 0);
        bc != 0
    }

    /// One LDI/LDD step. Returns true if another iteration should follow.
    fn block_transfer<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        src: u8,
        forward: bool,
        bus: &mut B,
        master: BusMaster,
    ) -> bool {
        let dst = if src == XIX { XIY } else { XDE };
        let from = self.step_pointer(src, width, forward);
        let to = self.step_pointer(dst, width, forward);
        let value = bus.load(master, from, width);
        bus.store(master, to, width, value);
        self.regs.set_flag(Flag::H, false);
        self.regs.set_flag(Flag::N, false);
        self.count_down()
    }

    /// One CPI/CPD step against A (byte) or WA (word). Stops on a match.
    fn block_compare<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        src: u8,
        forward: bool,
        bus: &mut B,
        master: BusMaster,
    ) -> bool {
        let from = self.step_pointer(src, width, forward);
        let value = bus.load(master, from, width);
        let acc = self.regs.word(0) as u32 & width.mask();
        let out = alu::apply(alu::AluOp::Cp, width, acc, value, self.regs.sr.flags());
        let carry = self.regs.flag(Flag::C);
        self.regs.sr.set_flags(out.flags);
        self.regs.set_flag(Flag::C, carry);
        let more = self.count_down();
        more && !self.regs.flag(Flag::Z)
    }
}
