use super::{AluOp, AluOutput, has, set, sign_zero};
use crate::core::Width;
use crate::cpu::tlcs900h::registers::Flag;

/// Two-operand operation `a op b`.
///
/// Add/subtract set S, Z, H (carry out of bit 3), V (signed overflow), N and C.
/// Logical operations set S and Z and clear H, V, N and C.
pub fn apply(op: AluOp, width: Width, a: u32, b: u32, flags: u8) -> AluOutput {
    let a = a & width.mask();
    let b = b & width.mask();
    let carry_in = has(flags, Flag::C) as u32;
    match op {
        AluOp::Add => add(width, a, b, 0, flags),
        AluOp::Adc => add(width, a, b, carry_in, flags),
        AluOp::Sub | AluOp::Cp => sub(width, a, b, 0, flags),
        AluOp::Sbc => sub(width, a, b, carry_in, flags),
        AluOp::And => logical(width, a & b, flags),
        AluOp::Xor => logical(width, a ^ b, flags),
        AluOp::Or => logical(width, a | b, flags),
    }
}

pub(super) fn add(width: Width, a: u32, b: u32, carry: u32, flags: u8) -> AluOutput {
    let wide = a as u64 + b as u64 + carry as u64;
    let result = wide as u32 & width.mask();

    let mut f = sign_zero(flags, width, result);
    f = set(f, Flag::H, (a ^ b ^ result) & 0x10 != 0);
    f = set(f, Flag::V, (a ^ result) & (b ^ result) & width.sign_bit() != 0);
    f = set(f, Flag::N, false);
    f = set(f, Flag::C, wide > width.mask() as u64);
    AluOutput { result, flags: f }
}

pub(super) fn sub(width: Width, a: u32, b: u32, borrow: u32, flags: u8) -> AluOutput {
    let result = a.wrapping_sub(b).wrapping_sub(borrow) & width.mask();

    let mut f = sign_zero(flags, width, result);
    f = set(f, Flag::H, (a ^ b ^ result) & 0x10 != 0);
    f = set(f, Flag::V, (a ^ b) & (a ^ result) & width.sign_bit() != 0);
    f = set(f, Flag::N, true);
    f = set(f, Flag::C, (a as u64) < b as u64 + borrow as u64);
    AluOutput { result, flags: f }
}

fn logical(width: Width, result: u32, flags: u8) -> AluOutput {
    let mut f = sign_zero(flags, width, result);
    for flag in [Flag::H, Flag::V, Flag::N, Flag::C] {
        f = set(f, flag, false);
    }
    AluOutput {
        result: result & width.mask(),
        flags: f,
    }
}
