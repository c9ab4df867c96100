use super::{AluOutput, even_parity, has, set, sign_zero};
use crate::core::Width;
use crate::cpu::tlcs900h::registers::Flag;

/// Shift and rotate operations, in encoding order (`sub-opcode & 7`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Sll,
    Srl,
}

/// What enters the vacated bit on each step.
#[derive(Clone, Copy)]
enum Fill {
    /// The bit that just left the other end.
    Rotate,
    /// The previous carry.
    Carry,
    Zero,
    /// A copy of the sign bit (right shifts only).
    Sign,
}

#[derive(Clone, Copy)]
struct ShiftRule {
    left: bool,
    fill: Fill,
}

const RULES: [ShiftRule; 8] = [
    ShiftRule { left: true, fill: Fill::Rotate },   // RLC
    ShiftRule { left: false, fill: Fill::Rotate },  // RRC
    ShiftRule { left: true, fill: Fill::Carry },    // RL
    ShiftRule { left: false, fill: Fill::Carry },   // RR
    ShiftRule { left: true, fill: Fill::Zero },     // SLA
    ShiftRule { left: false, fill: Fill::Sign },    // SRA
    ShiftRule { left: true, fill: Fill::Zero },     // SLL
    ShiftRule { left: false, fill: Fill::Zero },    // SRL
];

impl ShiftOp {
    pub const fn from_index(index: u8) -> ShiftOp {
        match index & 7 {
            0 => ShiftOp::Rlc,
            1 => ShiftOp::Rrc,
            2 => ShiftOp::Rl,
            3 => ShiftOp::Rr,
            4 => ShiftOp::Sla,
            5 => ShiftOp::Sra,
            6 => ShiftOp::Sll,
            _ => ShiftOp::Srl,
        }
    }

    fn rule(self) -> ShiftRule {
        RULES[self as usize]
    }
}

/// Shift `value` by `count` positions.
///
/// Flags: S and Z from the result, H = 0, N = 0, V = even parity of the
/// result, C = the last bit shifted out. A count of 0 leaves the value and
/// every flag untouched.
pub fn shift(op: ShiftOp, width: Width, value: u32, count: u32, flags: u8) -> AluOutput {
    let mask = width.mask();
    let sign = width.sign_bit();
    let rule = op.rule();

    let mut value = value & mask;
    let mut carry = has(flags, Flag::C);
    if count == 0 {
        return AluOutput { result: value, flags };
    }

    for _ in 0..count {
        let out = if rule.left { value & sign != 0 } else { value & 1 != 0 };
        let fill = match rule.fill {
            Fill::Rotate => out,
            Fill::Carry => carry,
            Fill::Zero => false,
            Fill::Sign => value & sign != 0,
        };
        value = if rule.left {
            ((value << 1) & mask) | fill as u32
        } else {
            (value >> 1) | if fill { sign } else { 0 }
        };
        carry = out;
    }

    let mut f = sign_zero(flags, width, value);
    f = set(f, Flag::H, false);
    f = set(f, Flag::N, false);
    f = set(f, Flag::V, even_parity(width, value));
    f = set(f, Flag::C, carry);
    AluOutput { result: value, flags: f }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: u8 = Flag::C as u8;
    const S: u8 = Flag::S as u8;
    const Z: u8 = Flag::Z as u8;
    const V: u8 = Flag::V as u8;

    #[test]
    fn rlc_moves_msb_to_lsb_and_carry() {
        let out = shift(ShiftOp::Rlc, Width::Byte, 0x81, 1, 0);
        assert_eq!(out.result, 0x03);
        assert_eq!(out.flags, C | V);
    }

    #[test]
    fn rr_through_carry() {
        let out = shift(ShiftOp::Rr, Width::Byte, 0x01, 1, C);
        assert_eq!(out.result, 0x80);
        assert_eq!(out.flags & (S | C), S | C);
    }

    #[test]
    fn sra_keeps_sign() {
        let out = shift(ShiftOp::Sra, Width::Word, 0x8002, 2, 0);
        assert_eq!(out.result, 0xE000);
        assert_eq!(out.flags & C, C);
    }

    #[test]
    fn srl_to_zero() {
        let out = shift(ShiftOp::Srl, Width::Byte, 0x01, 1, 0);
        assert_eq!(out.result, 0);
        assert_eq!(out.flags, Z | V | C);
    }

    #[test]
    fn sixteen_step_rotate_is_identity_on_words() {
        let out = shift(ShiftOp::Rlc, Width::Word, 0x1234, 16, 0);
        assert_eq!(out.result, 0x1234);
    }

    #[test]
    fn long_shift_left() {
        let out = shift(ShiftOp::Sla, Width::Long, 0x4000_0001, 2, 0);
        assert_eq!(out.result, 0x0000_0004);
        assert_eq!(out.flags & C, C);
    }

    #[test]
    fn zero_count_is_a_no_op() {
        let out = shift(ShiftOp::Sla, Width::Byte, 0x80, 0, Z);
        assert_eq!(out.result, 0x80);
        assert_eq!(out.flags, Z);
    }
}
