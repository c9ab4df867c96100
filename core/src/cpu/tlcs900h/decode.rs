//! Static dispatch tables.
//!
//! The first opcode byte indexes [`PRIMARY`]. Prefix bytes hand off to one of
//! three second-level tables keyed by the sub-opcode: [`REGISTER`] for
//! register operands, [`SOURCE`] for memory-source operations and
//! [`DESTINATION`] for memory-destination operations. An entry carries the
//! operation, its base cycle cost and the operand widths it accepts. Anything
//! left as `Illegal` raises an illegal-instruction fault.

use super::alu::{AluOp, ShiftOp};
use crate::core::Width;

pub(crate) const B: u8 = 1;
pub(crate) const W: u8 = 2;
pub(crate) const L: u8 = 4;
pub(crate) const BW: u8 = B | W;
pub(crate) const WL: u8 = W | L;
pub(crate) const ANY: u8 = B | W | L;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Entry<T> {
    pub op: T,
    pub cycles: u8,
    /// Bit set of accepted operand widths (`B`, `W`, `L`).
    pub widths: u8,
}

impl<T: Copy> Entry<T> {
    pub(crate) fn accepts(&self, width: Width) -> bool {
        let bit = match width {
            Width::Byte => B,
            Width::Word => W,
            Width::Long => L,
        };
        self.widths & bit != 0
    }
}

/// Carry-flag bit operations (ANDCF, ORCF, XORCF, LDCF, STCF).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CarryOp {
    And,
    Or,
    Xor,
    Load,
    Store,
}

impl CarryOp {
    const fn from_index(index: u8) -> CarryOp {
        match index {
            0 => CarryOp::And,
            1 => CarryOp::Or,
            2 => CarryOp::Xor,
            3 => CarryOp::Load,
            _ => CarryOp::Store,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BitOp {
    Res,
    Set,
    Chg,
    Bit,
    Tset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockOp {
    Ldi,
    Ldir,
    Ldd,
    Lddr,
    Cpi,
    Cpir,
    Cpd,
    Cpdr,
}

// --- First byte ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PrimaryOp {
    Illegal,
    Nop,
    PushSr,
    PopSr,
    Halt,
    Ei,
    Reti,
    LdAbs8Imm8,
    PushImm8,
    LdwAbs8Imm16,
    PushImm16,
    Incf,
    Decf,
    Ret,
    Retd,
    Rcf,
    Scf,
    Ccf,
    Zcf,
    PushA,
    PopA,
    ExFlags,
    Ldf,
    PushF,
    PopF,
    Jp16,
    Jp24,
    Call16,
    Call24,
    Calr,
    LdImm(Width),
    Push(Width),
    Pop(Width),
    Jr,
    Jrl,
    Ldx,
    Swi,
    /// Memory-source prefix; width from the prefix byte.
    Source(Width),
    Destination,
    /// `C7`/`D7`/`E7`: a full register code byte follows.
    RegisterCode(Width),
    /// `C8+r`/`D8+r`/`E8+r`: three-bit register in the prefix.
    RegisterShort(Width),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegisterOp {
    Illegal,
    LdImm,
    Push,
    Pop,
    Cpl,
    Neg,
    MulImm { signed: bool },
    DivImm { signed: bool },
    Link,
    Unlk,
    Bs1f,
    Bs1b,
    Daa,
    Extz,
    Exts,
    Paa,
    Mirr,
    Mula,
    Djnz,
    CarryImm(CarryOp),
    CarryA(CarryOp),
    LdcToControl,
    LdcFromControl,
    BitImm(BitOp),
    Minc,
    Mdec,
    MulReg { signed: bool },
    DivReg { signed: bool },
    Inc,
    Dec,
    Scc,
    AluReg(AluOp),
    LdToR,
    LdFromR,
    LdImm3,
    Ex,
    AluImm(AluOp),
    CpImm3,
    ShiftImm(ShiftOp),
    ShiftA(ShiftOp),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SourceOp {
    Illegal,
    Push,
    Rld,
    Rrd,
    Block(BlockOp),
    CopyToAbs16,
    Load,
    Ex,
    AluImm(AluOp),
    Mul { signed: bool },
    Div { signed: bool },
    Inc,
    Dec,
    Shift(ShiftOp),
    AluToReg(AluOp),
    AluToMem(AluOp),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DestinationOp {
    Illegal,
    StoreImm(Width),
    Pop(Width),
    CopyFromAbs16(Width),
    Lda(Width),
    CarryA(CarryOp),
    Store(Width),
    CarryImm(CarryOp),
    Bit(BitOp),
    Jp,
    Call,
    Ret,
}

const fn e<T>(op: T, cycles: u8, widths: u8) -> Entry<T> {
    Entry { op, cycles, widths }
}

pub(crate) static PRIMARY: [Entry<PrimaryOp>; 256] = build_primary();
pub(crate) static REGISTER: [Entry<RegisterOp>; 256] = build_register();
pub(crate) static SOURCE: [Entry<SourceOp>; 256] = build_source();
pub(crate) static DESTINATION: [Entry<DestinationOp>; 256] = build_destination();

const fn build_primary() -> [Entry<PrimaryOp>; 256] {
    use PrimaryOp::*;
    let mut t = [e(Illegal, 0, 0); 256];

    t[0x00] = e(Nop, 2, 0);
    t[0x02] = e(PushSr, 4, 0);
    t[0x03] = e(PopSr, 6, 0);
    t[0x05] = e(Halt, 6, 0);
    t[0x06] = e(Ei, 5, 0);
    t[0x07] = e(Reti, 12, 0);
    t[0x08] = e(LdAbs8Imm8, 5, 0);
    t[0x09] = e(PushImm8, 4, 0);
    t[0x0A] = e(LdwAbs8Imm16, 6, 0);
    t[0x0B] = e(PushImm16, 5, 0);
    t[0x0C] = e(Incf, 2, 0);
    t[0x0D] = e(Decf, 2, 0);
    t[0x0E] = e(Ret, 9, 0);
    t[0x0F] = e(Retd, 9, 0);
    t[0x10] = e(Rcf, 2, 0);
    t[0x11] = e(Scf, 2, 0);
    t[0x12] = e(Ccf, 2, 0);
    t[0x13] = e(Zcf, 2, 0);
    t[0x14] = e(PushA, 3, 0);
    t[0x15] = e(PopA, 4, 0);
    t[0x16] = e(ExFlags, 2, 0);
    t[0x17] = e(Ldf, 2, 0);
    t[0x18] = e(PushF, 3, 0);
    t[0x19] = e(PopF, 4, 0);
    t[0x1A] = e(Jp16, 7, 0);
    t[0x1B] = e(Jp24, 7, 0);
    t[0x1C] = e(Call16, 12, 0);
    t[0x1D] = e(Call24, 12, 0);
    t[0x1E] = e(Calr, 12, 0);

    let mut i = 0;
    while i < 8 {
        t[0x20 + i] = e(LdImm(Width::Byte), 2, B);
        t[0x28 + i] = e(Push(Width::Word), 3, W);
        t[0x30 + i] = e(LdImm(Width::Word), 3, W);
        t[0x38 + i] = e(Push(Width::Long), 5, L);
        t[0x40 + i] = e(LdImm(Width::Long), 5, L);
        t[0x48 + i] = e(Pop(Width::Word), 4, W);
        t[0x58 + i] = e(Pop(Width::Long), 6, L);
        i += 1;
    }

    let mut i = 0;
    while i < 16 {
        t[0x60 + i] = e(Jr, 4, 0);
        t[0x70 + i] = e(Jrl, 4, 0);
        i += 1;
    }

    // Memory prefixes: 80/88 byte, 90/98 word, A0/A8 long, B0/B8 destination
    let mut i = 0;
    while i < 8 {
        t[0x80 + i] = e(Source(Width::Byte), 0, B);
        t[0x88 + i] = e(Source(Width::Byte), 0, B);
        t[0x90 + i] = e(Source(Width::Word), 0, W);
        t[0x98 + i] = e(Source(Width::Word), 0, W);
        t[0xA0 + i] = e(Source(Width::Long), 0, L);
        t[0xA8 + i] = e(Source(Width::Long), 0, L);
        t[0xB0 + i] = e(Destination, 0, 0);
        t[0xB8 + i] = e(Destination, 0, 0);
        i += 1;
    }

    let mut i = 0;
    while i < 6 {
        t[0xC0 + i] = e(Source(Width::Byte), 0, B);
        t[0xD0 + i] = e(Source(Width::Word), 0, W);
        t[0xE0 + i] = e(Source(Width::Long), 0, L);
        t[0xF0 + i] = e(Destination, 0, 0);
        i += 1;
    }

    t[0xC7] = e(RegisterCode(Width::Byte), 0, B);
    t[0xD7] = e(RegisterCode(Width::Word), 0, W);
    t[0xE7] = e(RegisterCode(Width::Long), 0, L);
    let mut i = 0;
    while i < 8 {
        t[0xC8 + i] = e(RegisterShort(Width::Byte), 0, B);
        t[0xD8 + i] = e(RegisterShort(Width::Word), 0, W);
        t[0xE8 + i] = e(RegisterShort(Width::Long), 0, L);
        t[0xF8 + i] = e(Swi, 16, 0);
        i += 1;
    }

    t[0xF7] = e(Ldx, 9, 0);
    t
}

const fn build_register() -> [Entry<RegisterOp>; 256] {
    use RegisterOp::*;
    let mut t = [e(Illegal, 0, 0); 256];

    t[0x03] = e(LdImm, 4, ANY);
    t[0x04] = e(Push, 5, ANY);
    t[0x05] = e(Pop, 6, ANY);
    t[0x06] = e(Cpl, 4, BW);
    t[0x07] = e(Neg, 5, BW);
    t[0x08] = e(MulImm { signed: false }, 12, BW);
    t[0x09] = e(MulImm { signed: true }, 10, BW);
    t[0x0A] = e(DivImm { signed: false }, 15, BW);
    t[0x0B] = e(DivImm { signed: true }, 18, BW);
    t[0x0C] = e(Link, 8, L);
    t[0x0D] = e(Unlk, 7, L);
    t[0x0E] = e(Bs1f, 4, W);
    t[0x0F] = e(Bs1b, 4, W);
    t[0x10] = e(Daa, 6, B);
    t[0x12] = e(Extz, 5, WL);
    t[0x13] = e(Exts, 5, WL);
    t[0x14] = e(Paa, 4, WL);
    t[0x16] = e(Mirr, 4, W);
    t[0x19] = e(Mula, 31, W);
    t[0x1C] = e(Djnz, 7, BW);

    let mut i = 0;
    while i < 5 {
        t[0x20 + i] = e(CarryImm(CarryOp::from_index(i as u8)), 3, BW);
        t[0x28 + i] = e(CarryA(CarryOp::from_index(i as u8)), 3, BW);
        i += 1;
    }

    t[0x2E] = e(LdcToControl, 3, ANY);
    t[0x2F] = e(LdcFromControl, 3, ANY);

    t[0x30] = e(BitImm(BitOp::Res), 4, BW);
    t[0x31] = e(BitImm(BitOp::Set), 4, BW);
    t[0x32] = e(BitImm(BitOp::Chg), 4, BW);
    t[0x33] = e(BitImm(BitOp::Bit), 4, BW);
    t[0x34] = e(BitImm(BitOp::Tset), 6, BW);

    t[0x38] = e(Minc, 5, W);
    t[0x39] = e(Minc, 5, W);
    t[0x3A] = e(Minc, 5, W);
    t[0x3C] = e(Mdec, 4, W);
    t[0x3D] = e(Mdec, 4, W);
    t[0x3E] = e(Mdec, 4, W);

    let mut i = 0;
    while i < 8 {
        t[0x40 + i] = e(MulReg { signed: false }, 12, BW);
        t[0x48 + i] = e(MulReg { signed: true }, 10, BW);
        t[0x50 + i] = e(DivReg { signed: false }, 15, BW);
        t[0x58 + i] = e(DivReg { signed: true }, 18, BW);
        t[0x60 + i] = e(Inc, 2, ANY);
        t[0x68 + i] = e(Dec, 2, ANY);

        t[0x80 + i] = e(AluReg(AluOp::Add), 2, ANY);
        t[0x88 + i] = e(LdToR, 2, ANY);
        t[0x90 + i] = e(AluReg(AluOp::Adc), 2, ANY);
        t[0x98 + i] = e(LdFromR, 2, ANY);
        t[0xA0 + i] = e(AluReg(AluOp::Sub), 2, ANY);
        t[0xA8 + i] = e(LdImm3, 2, ANY);
        t[0xB0 + i] = e(AluReg(AluOp::Sbc), 2, ANY);
        t[0xB8 + i] = e(Ex, 3, BW);
        t[0xC0 + i] = e(AluReg(AluOp::And), 2, ANY);
        t[0xC8 + i] = e(AluImm(AluOp::from_index(i as u8)), 3, ANY);
        t[0xD0 + i] = e(AluReg(AluOp::Xor), 2, ANY);
        t[0xD8 + i] = e(CpImm3, 2, BW);
        t[0xE0 + i] = e(AluReg(AluOp::Or), 2, ANY);
        t[0xE8 + i] = e(ShiftImm(ShiftOp::from_index(i as u8)), 3, ANY);
        t[0xF0 + i] = e(AluReg(AluOp::Cp), 2, ANY);
        t[0xF8 + i] = e(ShiftA(ShiftOp::from_index(i as u8)), 3, ANY);
        i += 1;
    }

    let mut i = 0;
    while i < 16 {
        t[0x70 + i] = e(Scc, 2, BW);
        i += 1;
    }
    t
}

const fn build_source() -> [Entry<SourceOp>; 256] {
    use SourceOp::*;
    let mut t = [e(Illegal, 0, 0); 256];

    t[0x04] = e(Push, 7, BW);
    t[0x06] = e(Rld, 12, B);
    t[0x07] = e(Rrd, 12, B);
    t[0x10] = e(Block(BlockOp::Ldi), 10, BW);
    t[0x11] = e(Block(BlockOp::Ldir), 10, BW);
    t[0x12] = e(Block(BlockOp::Ldd), 10, BW);
    t[0x13] = e(Block(BlockOp::Lddr), 10, BW);
    t[0x14] = e(Block(BlockOp::Cpi), 8, BW);
    t[0x15] = e(Block(BlockOp::Cpir), 8, BW);
    t[0x16] = e(Block(BlockOp::Cpd), 8, BW);
    t[0x17] = e(Block(BlockOp::Cpdr), 8, BW);
    t[0x19] = e(CopyToAbs16, 8, BW);

    let mut i = 0;
    while i < 8 {
        t[0x20 + i] = e(Load, 4, ANY);
        t[0x30 + i] = e(Ex, 6, BW);
        t[0x38 + i] = e(AluImm(AluOp::from_index(i as u8)), 7, BW);
        t[0x40 + i] = e(Mul { signed: false }, 18, BW);
        t[0x48 + i] = e(Mul { signed: true }, 15, BW);
        t[0x50 + i] = e(Div { signed: false }, 22, BW);
        t[0x58 + i] = e(Div { signed: true }, 24, BW);
        t[0x60 + i] = e(Inc, 6, BW);
        t[0x68 + i] = e(Dec, 6, BW);
        t[0x78 + i] = e(Shift(ShiftOp::from_index(i as u8)), 6, BW);

        let mut k = 0;
        while k < 8 {
            let op = AluOp::from_index(k as u8);
            t[0x80 + k * 16 + i] = e(AluToReg(op), 4, ANY);
            t[0x88 + k * 16 + i] = e(AluToMem(op), 6, ANY);
            k += 1;
        }
        i += 1;
    }
    t
}

const fn build_destination() -> [Entry<DestinationOp>; 256] {
    use DestinationOp::*;
    let mut t = [e(Illegal, 0, 0); 256];

    t[0x00] = e(StoreImm(Width::Byte), 5, 0);
    t[0x02] = e(StoreImm(Width::Word), 6, 0);
    t[0x04] = e(Pop(Width::Byte), 6, 0);
    t[0x06] = e(Pop(Width::Word), 6, 0);
    t[0x14] = e(CopyFromAbs16(Width::Byte), 8, 0);
    t[0x16] = e(CopyFromAbs16(Width::Word), 8, 0);

    let mut i = 0;
    while i < 8 {
        t[0x20 + i] = e(Lda(Width::Word), 4, 0);
        t[0x30 + i] = e(Lda(Width::Long), 4, 0);
        t[0x40 + i] = e(Store(Width::Byte), 4, 0);
        t[0x50 + i] = e(Store(Width::Word), 4, 0);
        t[0x60 + i] = e(Store(Width::Long), 6, 0);

        t[0x80 + i] = e(CarryImm(CarryOp::And), 6, 0);
        t[0x88 + i] = e(CarryImm(CarryOp::Or), 6, 0);
        t[0x90 + i] = e(CarryImm(CarryOp::Xor), 6, 0);
        t[0x98 + i] = e(CarryImm(CarryOp::Load), 6, 0);
        t[0xA0 + i] = e(CarryImm(CarryOp::Store), 7, 0);
        t[0xA8 + i] = e(Bit(BitOp::Tset), 10, 0);
        t[0xB0 + i] = e(Bit(BitOp::Res), 8, 0);
        t[0xB8 + i] = e(Bit(BitOp::Set), 8, 0);
        t[0xC0 + i] = e(Bit(BitOp::Chg), 8, 0);
        t[0xC8 + i] = e(Bit(BitOp::Bit), 4, 0);
        i += 1;
    }

    let mut i = 0;
    while i < 5 {
        t[0x28 + i] = e(CarryA(CarryOp::from_index(i as u8)), 6, 0);
        i += 1;
    }

    let mut i = 0;
    while i < 16 {
        t[0xD0 + i] = e(Jp, 4, 0);
        t[0xE0 + i] = e(Call, 6, 0);
        t[0xF0 + i] = e(Ret, 6, 0);
        i += 1;
    }
    t
}
