use super::{AluOutput, set};
use crate::core::Width;
use crate::cpu::tlcs900h::registers::Flag;

/// `a * b` for byte or word operands, producing a double-width product.
/// No flags are affected.
pub fn multiply(width: Width, a: u32, b: u32, signed: bool) -> u32 {
    let (a, b) = (a & width.mask(), b & width.mask());
    let product = if signed {
        (width.sign_extend(a) as i32).wrapping_mul(width.sign_extend(b) as i32) as u32
    } else {
        a.wrapping_mul(b)
    };
    match width {
        Width::Byte => product & 0xFFFF,
        _ => product,
    }
}

/// Divide a double-width `dividend` by a `width` divisor.
///
/// The result packs the remainder in the upper half and the quotient in the
/// lower half. V is set on division by zero or when the quotient does not fit
/// in `width`; no other flag changes.
pub fn divide(width: Width, dividend: u32, divisor: u32, signed: bool, flags: u8) -> AluOutput {
    let bits = width.bits();
    let double_mask = match width {
        Width::Byte => 0xFFFF,
        _ => 0xFFFF_FFFF,
    };
    let dividend = dividend & double_mask;
    let divisor = divisor & width.mask();

    if divisor == 0 {
        let swapped = ((dividend as u64) << bits) | ((dividend as u64 >> bits) ^ width.mask() as u64);
        let result = (swapped & double_mask as u64) as u32;
        return AluOutput {
            result,
            flags: set(flags, Flag::V, true),
        };
    }

    let (quotient, remainder, overflow) = if signed {
        let n = match width {
            Width::Byte => dividend as u16 as i16 as i64,
            _ => dividend as i32 as i64,
        };
        let d = width.sign_extend(divisor) as i32 as i64;
        let q = n / d;
        let r = n % d;
        let half = 1i64 << (bits - 1);
        (q as u32, r as u32, q < -half || q >= half)
    } else {
        let q = dividend / divisor;
        (q, dividend % divisor, q > width.mask())
    };

    let packed = (((remainder & width.mask()) as u64) << bits) | (quotient & width.mask()) as u64;
    let result = (packed & double_mask as u64) as u32;
    AluOutput {
        result,
        flags: set(flags, Flag::V, overflow),
    }
}
