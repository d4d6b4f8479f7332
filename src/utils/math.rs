//! Fixed-point arithmetic and curve math.
//!
//! All amounts are raw `u128` values at 18 decimals. Products that can exceed
//! 128 bits are carried in a 256-bit intermediate and checked on the way back.

use ethnum::U256;

use crate::error::{Error, Result};
use crate::utils::constants::ONE;

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

fn narrow(value: U256, operation: impl FnOnce() -> String) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(Error::Overflow {
            operation: operation(),
        });
    }
    Ok(value.as_u128())
}

/// Computes `a * b / d` with a 256-bit intermediate, truncating
pub fn mul_div(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let result = U256::from(a) * U256::from(b) / U256::from(d);
    narrow(result, || format!("({} * {}) / {}", a, b, d))
}

/// Computes `a * b / d` with a 256-bit intermediate, rounding up
pub fn mul_div_up(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let numerator = U256::from(a) * U256::from(b);
    let divisor = U256::from(d);
    let mut result = numerator / divisor;
    if numerator % divisor != U256::ZERO {
        result += U256::ONE;
    }
    narrow(result, || format!("ceil(({} * {}) / {})", a, b, d))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SQUARE ROOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Largest `y` such that `y * y <= x`
pub fn sqrt(x: U256) -> u128 {
    if x < U256::from(2u8) {
        return x.as_u128();
    }

    // Start at a power of two no smaller than the root; Newton then descends.
    let bits = 256 - x.leading_zeros();
    let mut y = U256::ONE << ((bits + 1) / 2);
    loop {
        let next = (y + x / y) >> 1;
        if next >= y {
            break;
        }
        y = next;
    }
    y.as_u128()
}

/// `a² + b²` as a 256-bit value
pub fn sum_of_squares(a: u128, b: u128) -> Result<U256> {
    let a2 = U256::from(a) * U256::from(a);
    let b2 = U256::from(b) * U256::from(b);
    a2.checked_add(b2).ok_or(Error::Overflow {
        operation: format!("{}² + {}²", a, b),
    })
}

/// Floor of `sqrt(a² + b²)`, the curve invariant of two supplies
pub fn invariant(a: u128, b: u128) -> Result<u128> {
    Ok(sqrt(sum_of_squares(a, b)?))
}

/// `x²` as a 256-bit value
pub fn square(x: u128) -> U256 {
    U256::from(x) * U256::from(x)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPONENTIAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Fractional bits of the binary fixed point used inside `exp`
const EXP_FRACTION_BITS: u32 = 192;

/// `ln 2` scaled by `2^192`, rounded down
const LN2_Q192: U256 = U256::from_words(
    12_786_308_645_202_655_659,
    268_357_121_134_877_432_155_352_775_128_268_715_565,
);

/// `(a * b) >> shift` through a 512-bit product.
///
/// The shifted result must fit 256 bits and `0 < shift < 256`.
fn mul_shr(a: U256, b: U256, shift: u32) -> U256 {
    let (a1, a0) = a.into_words();
    let (b1, b0) = b.into_words();
    let low = U256::from(a0) * U256::from(b0);
    let high = U256::from(a1) * U256::from(b1);
    let cross = U256::from(a0) * U256::from(b1);
    let (mid, mid_carry) = cross.overflowing_add(U256::from(a1) * U256::from(b0));

    let (low, low_carry) = low.overflowing_add(mid << 128u32);
    let mut high = high + (mid >> 128u32);
    if mid_carry {
        high += U256::ONE << 128u32;
    }
    if low_carry {
        high += U256::ONE;
    }
    (high << (256 - shift)) | (low >> shift)
}

/// Fixed-point natural exponential `e^x` for `x >= 0`, truncated to 18 decimals.
///
/// The argument is reduced to `x = k·ln 2 + r` with `0 <= r < ln 2`. The
/// Taylor series of `e^r` runs in a 192-bit binary fixed point and the
/// result is scaled by `2^k` on the way out, so the last decimal is exact.
pub fn exp(x: u128) -> Result<u128> {
    let overflow = || Error::Overflow {
        operation: format!("exp({})", x),
    };

    let whole = x / ONE;
    // e^128 is far past u128 at 18 decimals
    if whole >= 128 {
        return Err(overflow());
    }
    let one = U256::ONE << EXP_FRACTION_BITS;
    let x_fixed = (U256::from(whole) << EXP_FRACTION_BITS)
        + (U256::from(x % ONE) << EXP_FRACTION_BITS) / U256::from(ONE);

    let k = x_fixed / LN2_Q192;
    let r = x_fixed - k * LN2_Q192;

    let mut term = one;
    let mut sum = one;
    let mut n = 1u32;
    loop {
        term = mul_shr(term, r, EXP_FRACTION_BITS) / U256::from(n);
        if term == U256::ZERO {
            break;
        }
        sum += term;
        n += 1;
    }

    // sum < 2^193, so sum * ONE < 2^253 and k < 185 leaves a positive shift
    let scaled = (sum * U256::from(ONE)) >> (EXP_FRACTION_BITS - k.as_u32());
    narrow(scaled, || format!("exp({})", x))
}

// ═══════════════════════════════════════════════════════════════════════════════
// UTILITY FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Relative difference `|a - b| / max(a, b)` at 18 decimals
pub fn relative_difference(a: u128, b: u128) -> u128 {
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    if hi == 0 {
        return 0;
    }
    mul_div(hi - lo, ONE, hi).unwrap_or(ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_safe_arithmetic() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert!(safe_add(u128::MAX, 1).is_err());

        assert_eq!(safe_sub(5, 3).unwrap(), 2);
        assert!(matches!(safe_sub(3, 5), Err(Error::Underflow { .. })));
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div_up(10, 10, 3).unwrap(), 34);
        assert_eq!(mul_div_up(10, 10, 4).unwrap(), 25);
        assert!(mul_div(1, 1, 0).is_err());
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // Product exceeds u128 but the quotient does not
        let big = u128::MAX / 2;
        assert_eq!(mul_div(big, ONE, ONE).unwrap(), big);
        assert!(mul_div(u128::MAX, 2, 1).is_err());
    }

    #[test]
    fn test_sqrt_exact_and_floor() {
        assert_eq!(sqrt(U256::ZERO), 0);
        assert_eq!(sqrt(U256::ONE), 1);
        assert_eq!(sqrt(U256::from(15u8)), 3);
        assert_eq!(sqrt(U256::from(16u8)), 4);
        assert_eq!(sqrt(square(u128::MAX)), u128::MAX);
        assert_eq!(sqrt(U256::MAX), u128::MAX);
    }

    #[test]
    fn test_invariant_pythagorean() {
        assert_eq!(invariant(3 * ONE, 4 * ONE).unwrap(), 5 * ONE);
        assert_eq!(invariant(0, 7).unwrap(), 7);
    }

    #[test]
    fn test_exp_reference_values() {
        assert_eq!(exp(0).unwrap(), ONE);
        assert_eq!(exp(ONE).unwrap(), 2_718_281_828_459_045_235);
        assert_eq!(exp(ONE / 2).unwrap(), 1_648_721_270_700_128_146);
        assert_eq!(exp(2 * ONE).unwrap(), 7_389_056_098_930_650_227);
        assert_eq!(exp(10 * ONE).unwrap(), 22_026_465_794_806_716_516_957);
    }

    #[test]
    fn test_exp_large_arguments_exact() {
        // Floors of e^x · 10^18 from an 80-digit reference
        assert_eq!(exp(20 * ONE).unwrap(), 485_165_195_409_790_277_969_106_830);
        assert_eq!(exp(21 * ONE - 1).unwrap(), 1_318_815_734_483_214_695_891_183_149);
        assert_eq!(exp(30 * ONE).unwrap(), 10_686_474_581_524_462_146_990_468_650_741);
        assert_eq!(
            exp(40 * ONE).unwrap(),
            235_385_266_837_019_985_407_899_910_749_034_804
        );
        assert_eq!(
            exp(47 * ONE).unwrap(),
            258_131_288_619_006_739_623_285_800_215_273_380_431
        );
    }

    #[test]
    fn test_mul_shr_wide_product() {
        let a = U256::MAX >> 1u32;
        assert_eq!(mul_shr(a, U256::ONE << 200u32, 200), a);
        assert_eq!(mul_shr(U256::from(6u8), U256::from(7u8), 1), U256::from(21u8));
        let half = U256::ONE << 255u32;
        assert_eq!(mul_shr(half, half, 255), half);
    }

    #[test]
    fn test_exp_small_argument() {
        // e^(1e-18) truncates to exactly 1 + 1e-18
        assert_eq!(exp(1).unwrap(), ONE + 1);
    }

    #[test]
    fn test_exp_overflow() {
        // Largest argument whose result fits u128
        let max = 47_276_307_437_780_177_293;
        assert_eq!(exp(max).unwrap(), 340_282_366_920_938_463_435_517_268_169_940_837_588);
        assert!(matches!(exp(max + 1), Err(Error::Overflow { .. })));
        assert!(matches!(exp(100 * ONE), Err(Error::Overflow { .. })));
        assert!(matches!(exp(u128::MAX), Err(Error::Overflow { .. })));
    }

    #[test]
    fn test_relative_difference() {
        assert_eq!(relative_difference(100, 100), 0);
        assert_eq!(relative_difference(100, 50), ONE / 2);
        assert_eq!(relative_difference(0, 0), 0);
    }

    proptest! {
        #[test]
        fn prop_sqrt_is_floor(x in any::<u128>(), y in any::<u128>()) {
            let value = square(x) / U256::from(2u8) + U256::from(y);
            let root = sqrt(value);
            prop_assert!(square(root) <= value);
            let next = U256::from(root) + U256::ONE;
            prop_assert!(next * next > value);
        }

        #[test]
        fn prop_exp_additive(a in 0u128..5 * ONE, b in 0u128..5 * ONE) {
            let lhs = exp(a + b).unwrap();
            let rhs = mul_div(exp(a).unwrap(), exp(b).unwrap(), ONE).unwrap();
            // Truncation error stays far below one part in 10^15
            prop_assert!(relative_difference(lhs, rhs) <= 1_000);
        }

        #[test]
        fn prop_exp_monotonic(a in 0u128..20 * ONE, delta in 1u128..ONE) {
            prop_assert!(exp(a + delta).unwrap() >= exp(a).unwrap());
        }

        #[test]
        fn prop_mul_div_up_bounds(a in any::<u64>(), b in any::<u64>(), d in 1u64..) {
            let down = mul_div(a as u128, b as u128, d as u128).unwrap();
            let up = mul_div_up(a as u128, b as u128, d as u128).unwrap();
            prop_assert!(up == down || up == down + 1);
        }
    }
}
