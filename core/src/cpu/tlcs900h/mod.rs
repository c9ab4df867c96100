//! Toshiba TLCS-900/H.
//!
//! Instruction-level core: one [`Tlcs900h::step`] fetches, decodes and
//! executes a whole instruction (or vectors into an interrupt) and reports the
//! cycles it took. Instruction bytes are read through a private fetch cursor;
//! `PC` is only committed once the instruction has decoded, so an illegal
//! opcode leaves every register exactly as it was.

mod addressing;
pub mod alu;
mod arithmetic;
mod bit;
mod block;
mod branch;
mod control;
mod decode;
mod dma;
mod load_store;
pub mod registers;
mod stack;

pub use control::ControlRegisters;
pub use dma::DmaTransfer;
pub use registers::{Flag, RegRef, RegSlot, RegisterFile, StatusRegister};

use addressing::Mode;
use decode::{DESTINATION, DestinationOp, PRIMARY, PrimaryOp, REGISTER, RegisterOp, SOURCE, SourceOp};
use thiserror::Error;

use crate::core::save_state::{StateError, StateReader, StateWriter};
use crate::core::{Bus, BusExt, BusMaster, PendingInterrupt, Width, component::BusMasterComponent};
use crate::cpu::{Cpu, CpuStateTrait, Tlcs900hState};

pub(crate) const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Cycles spent pushing PC/SR and loading the vector.
const INTERRUPT_CYCLES: u32 = 18;

/// Fatal conditions that stop the CPU until reset.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpuFault {
    #[error("illegal instruction 0x{opcode:02X} at 0x{pc:06X}")]
    IllegalInstruction {
        pc: u32,
        opcode: u8,
        /// The second-level byte that failed to decode, if the first one was a prefix.
        sub_opcode: Option<u8>,
    },
}

impl CpuFault {
    pub fn pc(&self) -> u32 {
        match self {
            CpuFault::IllegalInstruction { pc, .. } => *pc,
        }
    }
}

/// Outcome of a single [`Tlcs900h::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// An instruction ran and took this many cycles.
    Executed(u32),
    /// An interrupt was accepted instead of fetching an instruction.
    Vectored(u32),
    /// The CPU is halted with nothing eligible to wake it.
    Halted,
}

impl Step {
    pub fn cycles(&self) -> u32 {
        match *self {
            Step::Executed(c) | Step::Vectored(c) => c,
            Step::Halted => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlcs900h {
    pub regs: RegisterFile,
    /// DMA channel registers and INTNEST, reached through LDC.
    pub control: ControlRegisters,
    pub halted: bool,
    fault: Option<CpuFault>,

    // Per-instruction decode state
    pub(crate) cursor: u32,
    pub(crate) inst_pc: u32,
    pub(crate) opcode: u8,
}

impl Default for Tlcs900h {
    fn default() -> Self {
        Self::new()
    }
}

impl Tlcs900h {
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            control: ControlRegisters::default(),
            halted: false,
            fault: None,
            cursor: 0,
            inst_pc: 0,
            opcode: 0,
        }
    }

    /// Start executing at `pc` with stack pointer `xsp`, as after a reset vector fetch.
    pub fn boot(&mut self, pc: u32, xsp: u32) {
        self.reset();
        self.regs.pc = pc & ADDRESS_MASK;
        self.regs.set_xsp(xsp);
    }

    pub fn fault(&self) -> Option<CpuFault> {
        self.fault
    }

    /// Run one instruction, or accept one interrupt, at the current boundary.
    pub fn step<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<Step, CpuFault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        let iff = self.regs.sr.iff();
        if let Some(irq) = bus.check_interrupts(master).highest.filter(|i| i.is_eligible(iff)) {
            let cycles = self.service_interrupt(bus, master, irq);
            return Ok(Step::Vectored(cycles));
        }

        if self.halted {
            return Ok(Step::Halted);
        }

        self.execute(bus, master).map(Step::Executed)
    }

    /// Vector into `irq`: push PC then SR, raise the mask above the accepted
    /// level, jump, and clear the request on the bus.
    pub fn service_interrupt<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        irq: PendingInterrupt,
    ) -> u32 {
        self.halted = false;
        let pc = self.regs.pc;
        let sr = self.regs.sr.bits() as u32;
        self.push(bus, master, Width::Long, pc);
        self.push(bus, master, Width::Word, sr);
        self.regs.sr.set_iff((irq.priority + 1).min(7));
        self.regs.pc = irq.vector & ADDRESS_MASK;
        self.control.set_intnest(self.control.intnest().wrapping_add(1));
        bus.acknowledge_interrupt(master, irq.source);
        tracing::trace!(source = irq.source, priority = irq.priority, vector = irq.vector, "interrupt");
        INTERRUPT_CYCLES
    }

    // --- Instruction stream ---

    pub(crate) fn fetch8<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u8 {
        let byte = bus.read(master, self.cursor);
        self.cursor = self.cursor.wrapping_add(1) & ADDRESS_MASK;
        byte
    }

    pub(crate) fn fetch16<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u16 {
        let lo = self.fetch8(bus, master) as u16;
        let hi = self.fetch8(bus, master) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn fetch24<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let lo = self.fetch16(bus, master) as u32;
        let hi = self.fetch8(bus, master) as u32;
        (hi << 16) | lo
    }

    /// Immediate operand of `width`.
    pub(crate) fn fetch_imm<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        width: Width,
    ) -> u32 {
        match width {
            Width::Byte => self.fetch8(bus, master) as u32,
            Width::Word => self.fetch16(bus, master) as u32,
            Width::Long => {
                let lo = self.fetch16(bus, master) as u32;
                let hi = self.fetch16(bus, master) as u32;
                (hi << 16) | lo
            }
        }
    }

    /// Record an illegal instruction at the current instruction start and stop.
    pub(crate) fn illegal(&mut self, sub_opcode: Option<u8>) -> CpuFault {
        let fault = CpuFault::IllegalInstruction {
            pc: self.inst_pc,
            opcode: self.opcode,
            sub_opcode,
        };
        tracing::warn!(pc = self.inst_pc, opcode = self.opcode, ?sub_opcode, "illegal instruction");
        self.fault = Some(fault);
        fault
    }

    // --- Dispatch ---

    fn execute<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<u32, CpuFault> {
        self.inst_pc = self.regs.pc;
        self.cursor = self.regs.pc;
        let opcode = self.fetch8(bus, master);
        self.opcode = opcode;

        let entry = PRIMARY[opcode as usize];
        let cycles = match entry.op {
            PrimaryOp::Illegal => return Err(self.illegal(None)),
            PrimaryOp::Source(width) => self.execute_source(width, bus, master)?,
            PrimaryOp::Destination => self.execute_destination(bus, master)?,
            PrimaryOp::RegisterCode(width) | PrimaryOp::RegisterShort(width) => {
                self.execute_register(width, bus, master)?
            }
            op => entry.cycles as u32 + self.execute_primary(op, bus, master),
        };

        self.regs.pc = self.cursor & ADDRESS_MASK;
        Ok(cycles)
    }

    /// Single-byte-opcode instructions. Returns extra cycles beyond the table cost.
    fn execute_primary<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        op: PrimaryOp,
        bus: &mut B,
        master: BusMaster,
    ) -> u32 {
        let r = self.opcode & 7;
        match op {
            PrimaryOp::Nop => 0,
            PrimaryOp::PushSr => self.op_push_sr(bus, master),
            PrimaryOp::PopSr => self.op_pop_sr(bus, master),
            PrimaryOp::Halt => self.op_halt(),
            PrimaryOp::Ei => self.op_ei(bus, master),
            PrimaryOp::Reti => self.op_reti(bus, master),
            PrimaryOp::LdAbs8Imm8 => self.op_store_abs8_imm(Width::Byte, bus, master),
            PrimaryOp::PushImm8 => self.op_push_imm(Width::Byte, bus, master),
            PrimaryOp::LdwAbs8Imm16 => self.op_store_abs8_imm(Width::Word, bus, master),
            PrimaryOp::PushImm16 => self.op_push_imm(Width::Word, bus, master),
            PrimaryOp::Incf => self.op_bank_step(1),
            PrimaryOp::Decf => self.op_bank_step(3),
            PrimaryOp::Ret => self.op_ret(bus, master),
            PrimaryOp::Retd => self.op_retd(bus, master),
            PrimaryOp::Rcf => self.op_rcf(),
            PrimaryOp::Scf => self.op_scf(),
            PrimaryOp::Ccf => self.op_ccf(),
            PrimaryOp::Zcf => self.op_zcf(),
            PrimaryOp::PushA => self.op_push_a(bus, master),
            PrimaryOp::PopA => self.op_pop_a(bus, master),
            PrimaryOp::ExFlags => self.op_ex_flags(),
            PrimaryOp::Ldf => self.op_ldf(bus, master),
            PrimaryOp::PushF => self.op_push_f(bus, master),
            PrimaryOp::PopF => self.op_pop_f(bus, master),
            PrimaryOp::Jp16 => self.op_jp_abs(Width::Word, bus, master),
            PrimaryOp::Jp24 => self.op_jp_abs(Width::Long, bus, master),
            PrimaryOp::Call16 => self.op_call_abs(Width::Word, bus, master),
            PrimaryOp::Call24 => self.op_call_abs(Width::Long, bus, master),
            PrimaryOp::Calr => self.op_calr(bus, master),
            PrimaryOp::LdImm(width) => self.op_ld_reg_imm(width, RegRef::short_for(width, r), bus, master),
            PrimaryOp::Push(width) => self.op_push_reg(width, RegRef::short(r), bus, master),
            PrimaryOp::Pop(width) => self.op_pop_reg(width, RegRef::short(r), bus, master),
            PrimaryOp::Jr => self.op_jr(Width::Byte, bus, master),
            PrimaryOp::Jrl => self.op_jr(Width::Word, bus, master),
            PrimaryOp::Ldx => self.op_ldx(bus, master),
            PrimaryOp::Swi => self.op_swi(bus, master),
            PrimaryOp::Illegal
            | PrimaryOp::Source(_)
            | PrimaryOp::Destination
            | PrimaryOp::RegisterCode(_)
            | PrimaryOp::RegisterShort(_) => 0,
        }
    }

    /// Register group: `C7/D7/E7 code sub` or `C8+r/D8+r/E8+r sub`.
    fn execute_register<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<u32, CpuFault> {
        let reg = if self.opcode & 0x0F == 7 {
            let code = self.fetch8(bus, master);
            match RegRef::from_code(code, width) {
                Some(reg) => reg,
                None => return Err(self.illegal(Some(code))),
            }
        } else {
            RegRef::short_for(width, self.opcode & 7)
        };

        let sub = self.fetch8(bus, master);
        let entry = REGISTER[sub as usize];
        if entry.op == RegisterOp::Illegal || !entry.accepts(width) {
            return Err(self.illegal(Some(sub)));
        }

        let rr = sub & 7;
        let extra = match entry.op {
            RegisterOp::LdImm => self.op_ld_reg_imm(width, reg, bus, master),
            RegisterOp::Push => self.op_push_reg(width, reg, bus, master),
            RegisterOp::Pop => self.op_pop_reg(width, reg, bus, master),
            RegisterOp::Cpl => self.op_cpl(width, reg),
            RegisterOp::Neg => self.op_neg(width, reg),
            RegisterOp::MulImm { signed } => {
                let product = reg.widen(width).ok_or(sub);
                let imm = self.fetch_imm(bus, master, width);
                let product = product.map_err(|s| self.illegal(Some(s)))?;
                self.op_mul(width, product, reg, imm, signed)
            }
            RegisterOp::DivImm { signed } => {
                let quotient = reg.widen(width).ok_or(sub);
                let imm = self.fetch_imm(bus, master, width);
                let quotient = quotient.map_err(|s| self.illegal(Some(s)))?;
                self.op_div(width, quotient, imm, signed)
            }
            RegisterOp::Link => self.op_link(reg, bus, master),
            RegisterOp::Unlk => self.op_unlk(reg, bus, master),
            RegisterOp::Bs1f => self.op_bs1(reg, true),
            RegisterOp::Bs1b => self.op_bs1(reg, false),
            RegisterOp::Daa => self.op_daa(reg),
            RegisterOp::Extz => self.op_extz(width, reg),
            RegisterOp::Exts => self.op_exts(width, reg),
            RegisterOp::Paa => self.op_paa(width, reg),
            RegisterOp::Mirr => self.op_mirr(reg),
            RegisterOp::Mula => match reg.widen(width) {
                Some(acc) => self.op_mula(acc, bus, master),
                None => return Err(self.illegal(Some(sub))),
            },
            RegisterOp::Djnz => self.op_djnz(width, reg, bus, master),
            RegisterOp::CarryImm(op) => {
                let bit = self.fetch8(bus, master) & 0x0F;
                self.op_carry_reg(op, width, reg, bit)
            }
            RegisterOp::CarryA(op) => {
                let bit = self.regs.a() & 0x0F;
                self.op_carry_reg(op, width, reg, bit)
            }
            RegisterOp::LdcToControl => {
                let cr = self.fetch8(bus, master);
                if !ControlRegisters::is_valid(cr, width) {
                    return Err(self.illegal(Some(cr)));
                }
                self.op_ldc_to_control(width, reg, cr)
            }
            RegisterOp::LdcFromControl => {
                let cr = self.fetch8(bus, master);
                if !ControlRegisters::is_valid(cr, width) {
                    return Err(self.illegal(Some(cr)));
                }
                self.op_ldc_from_control(width, reg, cr)
            }
            RegisterOp::BitImm(op) => {
                let bit = self.fetch8(bus, master);
                self.op_bit_reg(op, width, reg, bit)
            }
            RegisterOp::Minc => self.op_modulo_step(reg, 1 << (sub & 3), true, bus, master),
            RegisterOp::Mdec => self.op_modulo_step(reg, 1 << (sub & 3), false, bus, master),
            RegisterOp::MulReg { signed } => match RegRef::short_for(width, rr).widen(width) {
                Some(product) => {
                    let operand = self.regs.read(reg, width);
                    let lhs = RegRef::short_for(width, rr);
                    self.op_mul(width, product, lhs, operand, signed)
                }
                None => return Err(self.illegal(Some(sub))),
            },
            RegisterOp::DivReg { signed } => match RegRef::short_for(width, rr).widen(width) {
                Some(quotient) => {
                    let divisor = self.regs.read(reg, width);
                    self.op_div(width, quotient, divisor, signed)
                }
                None => return Err(self.illegal(Some(sub))),
            },
            RegisterOp::Inc => self.op_inc_reg(width, reg, rr),
            RegisterOp::Dec => self.op_dec_reg(width, reg, rr),
            RegisterOp::Scc => self.op_scc(width, reg, sub & 0x0F),
            RegisterOp::AluReg(op) => {
                let lhs = RegRef::short_for(width, rr);
                let rhs = self.regs.read(reg, width);
                self.op_alu_reg(op, width, lhs, rhs)
            }
            RegisterOp::LdToR => {
                let value = self.regs.read(reg, width);
                self.regs.write(RegRef::short_for(width, rr), width, value);
                0
            }
            RegisterOp::LdFromR => {
                let value = self.regs.read(RegRef::short_for(width, rr), width);
                self.regs.write(reg, width, value);
                0
            }
            RegisterOp::LdImm3 => {
                self.regs.write(reg, width, rr as u32);
                0
            }
            RegisterOp::Ex => self.op_ex_reg(width, RegRef::short_for(width, rr), reg),
            RegisterOp::AluImm(op) => {
                let imm = self.fetch_imm(bus, master, width);
                self.op_alu_reg(op, width, reg, imm)
            }
            RegisterOp::CpImm3 => self.op_alu_reg(alu::AluOp::Cp, width, reg, rr as u32),
            RegisterOp::ShiftImm(op) => {
                let count = self.fetch8(bus, master) & 0x0F;
                self.op_shift_reg(op, width, reg, count)
            }
            RegisterOp::ShiftA(op) => {
                let count = self.regs.a() & 0x0F;
                self.op_shift_reg(op, width, reg, count)
            }
            RegisterOp::Illegal => 0,
        };
        Ok(entry.cycles as u32 + extra)
    }

    /// Memory-source group: `80-AF` and `C0-E5` prefixes.
    fn execute_source<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        width: Width,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<u32, CpuFault> {
        let Some(mode) = Mode::from_prefix(self.opcode) else {
            return Err(self.illegal(None));
        };
        let ea = match self.resolve(mode, bus, master) {
            Ok(ea) => ea,
            Err(byte) => return Err(self.illegal(Some(byte))),
        };

        let sub = self.fetch8(bus, master);
        let entry = SOURCE[sub as usize];
        if entry.op == SourceOp::Illegal || !entry.accepts(width) {
            return Err(self.illegal(Some(sub)));
        }

        let rr = sub & 7;
        // Validate everything that can still fail before touching state.
        let wide = match entry.op {
            SourceOp::Mul { .. } | SourceOp::Div { .. } => {
                match RegRef::short_for(width, rr).widen(width) {
                    Some(reg) => Some(reg),
                    None => return Err(self.illegal(Some(sub))),
                }
            }
            _ => None,
        };
        if let SourceOp::Block(op) = entry.op {
            if !block::prefix_allowed(op, mode) {
                return Err(self.illegal(Some(sub)));
            }
        }

        self.commit(&ea);
        let addr = ea.addr;
        let extra = match entry.op {
            SourceOp::Push => {
                let value = bus.load(master, addr, width);
                self.push(bus, master, width, value);
                0
            }
            SourceOp::Rld => self.op_rld(addr, bus, master),
            SourceOp::Rrd => self.op_rrd(addr, bus, master),
            SourceOp::Block(op) => self.op_block(op, width, mode, bus, master),
            SourceOp::CopyToAbs16 => {
                let dst = self.fetch16(bus, master) as u32;
                let value = bus.load(master, addr, width);
                bus.store(master, dst, width, value);
                0
            }
            SourceOp::Load => {
                let value = bus.load(master, addr, width);
                self.regs.write(RegRef::short_for(width, rr), width, value);
                0
            }
            SourceOp::Ex => self.op_ex_mem(width, addr, RegRef::short_for(width, rr), bus, master),
            SourceOp::AluImm(op) => {
                let imm = self.fetch_imm(bus, master, width);
                self.op_alu_mem(op, width, addr, imm, bus, master)
            }
            SourceOp::Mul { signed } => match wide {
                Some(product) => {
                    let operand = bus.load(master, addr, width);
                    self.op_mul(width, product, RegRef::short_for(width, rr), operand, signed)
                }
                None => 0,
            },
            SourceOp::Div { signed } => match wide {
                Some(quotient) => {
                    let divisor = bus.load(master, addr, width);
                    self.op_div(width, quotient, divisor, signed)
                }
                None => 0,
            },
            SourceOp::Inc => self.op_inc_mem(width, addr, rr, bus, master),
            SourceOp::Dec => self.op_dec_mem(width, addr, rr, bus, master),
            SourceOp::Shift(op) => self.op_shift_mem(op, width, addr, bus, master),
            SourceOp::AluToReg(op) => {
                let rhs = bus.load(master, addr, width);
                self.op_alu_reg(op, width, RegRef::short_for(width, rr), rhs)
            }
            SourceOp::AluToMem(op) => {
                let rhs = self.regs.read(RegRef::short_for(width, rr), width);
                self.op_alu_mem(op, width, addr, rhs, bus, master)
            }
            SourceOp::Illegal => 0,
        };
        Ok(entry.cycles as u32 + ea.penalty + extra)
    }

    /// Memory-destination group: `B0-BF` and `F0-F5` prefixes.
    fn execute_destination<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) -> Result<u32, CpuFault> {
        let Some(mode) = Mode::from_prefix(self.opcode) else {
            return Err(self.illegal(None));
        };
        let ea = match self.resolve(mode, bus, master) {
            Ok(ea) => ea,
            Err(byte) => return Err(self.illegal(Some(byte))),
        };

        let sub = self.fetch8(bus, master);
        let entry = DESTINATION[sub as usize];
        let ret_without_plain_prefix = entry.op == DestinationOp::Ret && self.opcode != 0xB0;
        if entry.op == DestinationOp::Illegal || ret_without_plain_prefix {
            return Err(self.illegal(Some(sub)));
        }

        self.commit(&ea);
        let addr = ea.addr;
        let rr = sub & 7;
        let extra = match entry.op {
            DestinationOp::StoreImm(width) => {
                let value = self.fetch_imm(bus, master, width);
                bus.store(master, addr, width, value);
                0
            }
            DestinationOp::Pop(width) => {
                let value = self.pop(bus, master, width);
                bus.store(master, addr, width, value);
                0
            }
            DestinationOp::CopyFromAbs16(width) => {
                let src = self.fetch16(bus, master) as u32;
                let value = bus.load(master, src, width);
                bus.store(master, addr, width, value);
                0
            }
            DestinationOp::Lda(width) => {
                self.regs.write(RegRef::short(rr), width, addr);
                0
            }
            DestinationOp::CarryA(op) => {
                let bit = self.regs.a() & 0x0F;
                self.op_carry_mem(op, addr, bit, bus, master)
            }
            DestinationOp::Store(width) => {
                let value = self.regs.read(RegRef::short_for(width, rr), width);
                bus.store(master, addr, width, value);
                0
            }
            DestinationOp::CarryImm(op) => self.op_carry_mem(op, addr, rr, bus, master),
            DestinationOp::Bit(op) => self.op_bit_mem(op, addr, rr, bus, master),
            DestinationOp::Jp => self.op_jp_cc(sub & 0x0F, addr),
            DestinationOp::Call => self.op_call_cc(sub & 0x0F, addr, bus, master),
            DestinationOp::Ret => self.op_ret_cc(sub & 0x0F, bus, master),
            DestinationOp::Illegal => 0,
        };
        Ok(entry.cycles as u32 + ea.penalty + extra)
    }

    // --- Save state ---

    pub fn save(&self, w: &mut StateWriter) {
        for bank in self.regs.raw_banks() {
            for slot in bank {
                w.put_slice(slot);
            }
        }
        for slot in self.regs.raw_dedicated() {
            w.put_slice(slot);
        }
        w.put_u32(self.regs.pc);
        w.put_u16(self.regs.sr.bits());
        w.put_u8(self.regs.f_alt);
        w.put_bool(self.halted);
        match self.fault {
            Some(CpuFault::IllegalInstruction { pc, opcode, sub_opcode }) => {
                w.put_bool(true);
                w.put_u32(pc);
                w.put_u8(opcode);
                w.put_bool(sub_opcode.is_some());
                w.put_u8(sub_opcode.unwrap_or(0));
            }
            None => {
                w.put_bool(false);
                w.put_u32(0);
                w.put_u8(0);
                w.put_bool(false);
                w.put_u8(0);
            }
        }
        self.control.save(w);
    }

    pub fn load(&mut self, r: &mut StateReader<'_>) -> Result<(), StateError> {
        for bank in self.regs.raw_banks_mut() {
            for slot in bank.iter_mut() {
                r.copy_to(slot)?;
            }
        }
        for slot in self.regs.raw_dedicated_mut() {
            r.copy_to(slot)?;
        }
        self.regs.pc = r.get_u32()?;
        if self.regs.pc > ADDRESS_MASK {
            return Err(StateError::InvalidField {
                field: "pc",
                value: self.regs.pc,
            });
        }
        self.regs.sr = StatusRegister::from_bits(r.get_u16()?);
        self.regs.f_alt = r.get_u8()?;
        self.halted = r.get_bool()?;
        let faulted = r.get_bool()?;
        let pc = r.get_u32()?;
        let opcode = r.get_u8()?;
        let has_sub = r.get_bool()?;
        let sub = r.get_u8()?;
        self.fault = faulted.then_some(CpuFault::IllegalInstruction {
            pc,
            opcode,
            sub_opcode: has_sub.then_some(sub),
        });
        self.control.load(r)
    }
}

impl BusMasterComponent for Tlcs900h {
    type Bus = dyn Bus<Address = u32, Data = u8>;
    type Step = Step;
    type Fault = CpuFault;

    fn step_with_bus(&mut self, bus: &mut Self::Bus, master: BusMaster) -> Result<Step, CpuFault> {
        self.step(bus, master)
    }
}

impl Cpu for Tlcs900h {
    fn reset(&mut self) {
        self.regs = RegisterFile::new();
        self.control = ControlRegisters::default();
        self.halted = false;
        self.fault = None;
        tracing::debug!("tlcs900h reset");
    }

    fn is_sleeping(&self) -> bool {
        self.halted
    }
}

impl CpuStateTrait for Tlcs900h {
    type Snapshot = Tlcs900hState;

    fn snapshot(&self) -> Tlcs900hState {
        let mut banks = [[0u32; 4]; 4];
        for (b, bank) in banks.iter_mut().enumerate() {
            for (s, slot) in bank.iter_mut().enumerate() {
                *slot = self.regs.bank_long(b as u8, s as u8);
            }
        }
        Tlcs900hState {
            banks,
            xix: self.regs.long(registers::XIX),
            xiy: self.regs.long(registers::XIY),
            xiz: self.regs.long(registers::XIZ),
            xsp: self.regs.xsp(),
            pc: self.regs.pc,
            sr: self.regs.sr.bits(),
            f_alt: self.regs.f_alt,
            rfp: self.regs.sr.rfp(),
            iff: self.regs.sr.iff(),
            halted: self.halted,
        }
    }
}
