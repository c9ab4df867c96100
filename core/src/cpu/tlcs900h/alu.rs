//! Flag engine.
//!
//! Every operation here is a pure function of its inputs: operands, width and
//! the incoming F register. Handlers fetch operands, call in, then store
//! `result` and `flags` back. Results are always reduced modulo 2^width.

use super::registers::Flag;
use crate::core::Width;

mod binary;
mod muldiv;
mod shift;
mod unary;

pub use binary::apply;
pub use muldiv::{divide, multiply};
pub use shift::{ShiftOp, shift};
pub use unary::{cpl, daa, dec, exts, extz, inc, mirror, neg};

/// Two-operand ALU operations, in encoding order (`sub-opcode & 7`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    pub const fn from_index(index: u8) -> AluOp {
        match index & 7 {
            0 => AluOp::Add,
            1 => AluOp::Adc,
            2 => AluOp::Sub,
            3 => AluOp::Sbc,
            4 => AluOp::And,
            5 => AluOp::Xor,
            6 => AluOp::Or,
            _ => AluOp::Cp,
        }
    }

    /// CP computes flags only.
    pub const fn writes_result(self) -> bool {
        !matches!(self, AluOp::Cp)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluOutput {
    pub result: u32,
    pub flags: u8,
}

#[inline]
pub(crate) fn set(flags: u8, flag: Flag, on: bool) -> u8 {
    if on {
        flags | flag as u8
    } else {
        flags & !(flag as u8)
    }
}

#[inline]
pub(crate) fn has(flags: u8, flag: Flag) -> bool {
    flags & flag as u8 != 0
}

/// Set S and Z from `result`.
#[inline]
pub(crate) fn sign_zero(flags: u8, width: Width, result: u32) -> u8 {
    let flags = set(flags, Flag::S, result & width.sign_bit() != 0);
    set(flags, Flag::Z, result & width.mask() == 0)
}

/// True when `value` has an even number of set bits within `width`.
#[inline]
pub(crate) fn even_parity(width: Width, value: u32) -> bool {
    (value & width.mask()).count_ones() % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alu_op_index_order() {
        assert_eq!(AluOp::from_index(0), AluOp::Add);
        assert_eq!(AluOp::from_index(3), AluOp::Sbc);
        assert_eq!(AluOp::from_index(7), AluOp::Cp);
        assert!(!AluOp::Cp.writes_result());
    }

    #[test]
    fn parity_uses_width() {
        assert!(even_parity(Width::Byte, 0x0103)); // only 0x03 counts
        assert!(!even_parity(Width::Word, 0x0103));
    }
}
