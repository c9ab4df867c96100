use super::binary::{add, sub};
use super::{AluOutput, even_parity, has, set, sign_zero};
use crate::core::Width;
use crate::cpu::tlcs900h::registers::Flag;

/// `value + n`, carry unchanged. Used by INC #3 on bytes and memory.
pub fn inc(width: Width, value: u32, n: u32, flags: u8) -> AluOutput {
    let out = add(width, value & width.mask(), n, 0, flags);
    AluOutput {
        result: out.result,
        flags: set(out.flags, Flag::C, has(flags, Flag::C)),
    }
}

/// `value - n`, carry unchanged.
pub fn dec(width: Width, value: u32, n: u32, flags: u8) -> AluOutput {
    let out = sub(width, value & width.mask(), n, 0, flags);
    AluOutput {
        result: out.result,
        flags: set(out.flags, Flag::C, has(flags, Flag::C)),
    }
}

/// `0 - value`.
pub fn neg(width: Width, value: u32, flags: u8) -> AluOutput {
    sub(width, 0, value & width.mask(), 0, flags)
}

/// One's complement. Only H and N change (both set).
pub fn cpl(width: Width, value: u32, flags: u8) -> AluOutput {
    AluOutput {
        result: !value & width.mask(),
        flags: set(set(flags, Flag::H, true), Flag::N, true),
    }
}

/// Decimal adjust after a BCD add or subtract (N selects which).
pub fn daa(value: u8, flags: u8) -> AluOutput {
    let subtract = has(flags, Flag::N);
    let half = has(flags, Flag::H);
    let mut carry = has(flags, Flag::C);

    let mut correction = 0u8;
    if half || value & 0x0F > 9 {
        correction |= 0x06;
    }
    if carry || value > 0x99 {
        correction |= 0x60;
        carry = true;
    }

    let result = if subtract {
        value.wrapping_sub(correction)
    } else {
        value.wrapping_add(correction)
    };
    let half_out = if subtract {
        half && value & 0x0F < 6
    } else {
        value & 0x0F > 9
    };

    let mut f = sign_zero(flags, Width::Byte, result as u32);
    f = set(f, Flag::H, half_out);
    f = set(f, Flag::V, even_parity(Width::Byte, result as u32));
    f = set(f, Flag::C, carry);
    AluOutput {
        result: result as u32,
        flags: f,
    }
}

/// Zero the upper half of a word or long.
pub fn extz(width: Width, value: u32) -> u32 {
    match width {
        Width::Word => value & 0x00FF,
        Width::Long => value & 0xFFFF,
        Width::Byte => value & 0xFF,
    }
}

/// Sign-extend the lower half of a word or long into the upper half.
pub fn exts(width: Width, value: u32) -> u32 {
    match width {
        Width::Word => Width::Byte.sign_extend(value) & 0xFFFF,
        Width::Long => Width::Word.sign_extend(value),
        Width::Byte => value & 0xFF,
    }
}

/// Bit-reverse a 16-bit value.
pub fn mirror(value: u16) -> u16 {
    value.reverse_bits()
}
