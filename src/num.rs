//! Fixed-point rate arithmetic.
//!
//! Rates are destination units per source unit scaled by [`PRECISION`].
//! Quantities are raw token amounts in the smallest unit of each token,
//! so every conversion has to account for the decimals of both tokens.

use alloy::primitives::{U256, U512};
use fastnum::{
    bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};
use thiserror::Error;

/// Rate scaling factor, `10^18`.
pub const PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Maximum token quantity accepted or produced, `10^28`.
pub const MAX_QTY: U256 = U256::from_limbs([4_477_988_020_393_345_024, 542_101_086, 0, 0]);

/// Maximum rate accepted, `10^24` (`PRECISION * 10^6`).
pub const MAX_RATE: U256 = U256::from_limbs([2_003_764_205_206_896_640, 54_210, 0, 0]);

/// Maximum supported difference between source and destination decimals.
pub const MAX_DECIMALS: u8 = 18;

/// Decimals of the native asset.
pub const ETH_DECIMALS: u8 = 18;

/// Basis points in 100%.
pub const BPS: u64 = 10_000;

/// Error type for rate arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("src qty {qty} above max qty")]
    SrcQtyTooHigh { qty: U256 },

    #[error("dst qty {qty} above max qty")]
    DstQtyTooHigh { qty: U256 },

    #[error("rate {rate} above max rate")]
    RateTooHigh { rate: U256 },

    #[error("decimals gap too big: src {src_decimals}, dst {dst_decimals}")]
    DecimalsGap { src_decimals: u8, dst_decimals: u8 },

    #[error("zero src qty")]
    ZeroSrcQty,

    #[error("zero rate")]
    ZeroRate,
}

/// Result type for rate arithmetic.
pub type RateResult<T> = Result<T, RateError>;

/// Destination quantity received for `src_qty` at `rate`, rounded down.
pub fn calc_dst_qty(
    src_qty: U256,
    src_decimals: u8,
    dst_decimals: u8,
    rate: U256,
) -> RateResult<U256> {
    if src_qty > MAX_QTY {
        return Err(RateError::SrcQtyTooHigh { qty: src_qty });
    }
    if rate > MAX_RATE {
        return Err(RateError::RateTooHigh { rate });
    }
    check_decimals(src_decimals, dst_decimals)?;

    let product = U512::from(src_qty) * U512::from(rate);
    let dst = if dst_decimals >= src_decimals {
        product * pow10(dst_decimals - src_decimals) / U512::from(PRECISION)
    } else {
        product / (U512::from(PRECISION) * pow10(src_decimals - dst_decimals))
    };
    bounded_qty(dst).ok_or(RateError::DstQtyTooHigh {
        qty: saturate(dst),
    })
}

/// Source quantity required to receive `dst_qty` at `rate`, rounded up
/// so that converting it back never yields less than `dst_qty`.
pub fn calc_src_qty(
    dst_qty: U256,
    src_decimals: u8,
    dst_decimals: u8,
    rate: U256,
) -> RateResult<U256> {
    if dst_qty > MAX_QTY {
        return Err(RateError::DstQtyTooHigh { qty: dst_qty });
    }
    if rate > MAX_RATE {
        return Err(RateError::RateTooHigh { rate });
    }
    if rate.is_zero() {
        return Err(RateError::ZeroRate);
    }
    check_decimals(src_decimals, dst_decimals)?;

    let (numerator, denominator) = if src_decimals >= dst_decimals {
        (
            U512::from(PRECISION) * U512::from(dst_qty) * pow10(src_decimals - dst_decimals),
            U512::from(rate),
        )
    } else {
        (
            U512::from(PRECISION) * U512::from(dst_qty),
            U512::from(rate) * pow10(dst_decimals - src_decimals),
        )
    };
    let src = (numerator + denominator - U512::from(1u64)) / denominator;
    bounded_qty(src).ok_or(RateError::SrcQtyTooHigh {
        qty: saturate(src),
    })
}

/// Effective rate of converting `src_qty` into `dst_qty`, rounded down.
pub fn calc_rate_from_qty(
    src_qty: U256,
    dst_qty: U256,
    src_decimals: u8,
    dst_decimals: u8,
) -> RateResult<U256> {
    if src_qty > MAX_QTY {
        return Err(RateError::SrcQtyTooHigh { qty: src_qty });
    }
    if dst_qty > MAX_QTY {
        return Err(RateError::DstQtyTooHigh { qty: dst_qty });
    }
    if src_qty.is_zero() {
        return Err(RateError::ZeroSrcQty);
    }
    check_decimals(src_decimals, dst_decimals)?;

    let scaled_dst = U512::from(PRECISION) * U512::from(dst_qty);
    let rate = if dst_decimals >= src_decimals {
        scaled_dst / (pow10(dst_decimals - src_decimals) * U512::from(src_qty))
    } else {
        scaled_dst * pow10(src_decimals - dst_decimals) / U512::from(src_qty)
    };
    // Bounded by PRECISION * MAX_QTY * 10^MAX_DECIMALS, always fits.
    Ok(saturate(rate))
}

/// `amount * bps / BPS`, rounded down.
pub fn apply_bps(amount: U256, bps: u64) -> U256 {
    saturate(U512::from(amount) * U512::from(bps) / U512::from(BPS))
}

/// `amount * numerator / denominator`, rounded down, clamped at `U256::MAX`.
/// Zero for a zero denominator.
pub fn mul_div(amount: U256, numerator: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::ZERO;
    }
    saturate(U512::from(amount) * U512::from(numerator) / U512::from(denominator))
}

/// [`mul_div`] rounded up.
pub fn mul_div_up(amount: U256, numerator: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::ZERO;
    }
    let denominator = U512::from(denominator);
    let product = U512::from(amount) * U512::from(numerator);
    saturate((product + denominator - U512::from(1u64)) / denominator)
}

fn check_decimals(src_decimals: u8, dst_decimals: u8) -> RateResult<()> {
    if src_decimals.abs_diff(dst_decimals) > MAX_DECIMALS {
        return Err(RateError::DecimalsGap {
            src_decimals,
            dst_decimals,
        });
    }
    Ok(())
}

fn pow10(exp: u8) -> U512 {
    U512::from(10u64).pow(U512::from(exp))
}

fn bounded_qty(value: U512) -> Option<U256> {
    (value <= U512::from(MAX_QTY)).then(|| saturate(value))
}

/// Narrows to 256 bits, clamping at `U256::MAX`.
fn saturate(value: U512) -> U256 {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        U256::MAX
    } else {
        U256::from_limbs_slice(&limbs[..4])
    }
}

/// Fixed-point to decimal converter, used to present amounts and rates.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    /// Converter for rates scaled by [`PRECISION`].
    pub fn rate() -> Self {
        Self::new(18)
    }

    /// Decimal view of a fixed-point value, `None` if it does not fit `N` words.
    pub fn from_unsigned<const N: usize>(&self, value: U256) -> Option<UnsignedDecimal<N>> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())?;
        Some(UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        ))
    }

    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> U256 {
        let rescaled = value.rescale(self.decimals as i16);
        U256::from_le_slice(rescaled.digits().to_radix_le(256).as_slice())
    }
}

#[cfg(test)]
mod tests {
    use fastnum::udec256;

    use super::*;

    fn e18(n: u64) -> U256 {
        U256::from(n) * PRECISION
    }

    #[test]
    fn test_constants() {
        assert_eq!(PRECISION, U256::from(10u64).pow(U256::from(18)));
        assert_eq!(MAX_QTY, U256::from(10u64).pow(U256::from(28)));
        assert_eq!(MAX_RATE, U256::from(10u64).pow(U256::from(24)));
    }

    #[test]
    fn test_dst_qty_same_decimals() {
        assert_eq!(calc_dst_qty(e18(1), 18, 18, e18(2)).unwrap(), e18(2));
        assert_eq!(
            calc_dst_qty(U256::from(1000), 18, 18, PRECISION / U256::from(3)).unwrap(),
            U256::from(333)
        );
    }

    #[test]
    fn test_dst_qty_decimals_scaling() {
        // 1 token of 6 decimals at rate 2 into 18 decimals.
        assert_eq!(
            calc_dst_qty(U256::from(1_000_000), 6, 18, e18(2)).unwrap(),
            e18(2)
        );
        // And back into 6 decimals.
        assert_eq!(
            calc_dst_qty(e18(2), 18, 6, PRECISION / U256::from(2)).unwrap(),
            U256::from(1_000_000)
        );
    }

    #[test]
    fn test_dst_qty_zero_inputs() {
        assert_eq!(calc_dst_qty(U256::ZERO, 18, 18, e18(2)).unwrap(), U256::ZERO);
        assert_eq!(calc_dst_qty(e18(5), 18, 18, U256::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_dst_qty_ceilings() {
        assert!(calc_dst_qty(MAX_QTY, 18, 18, PRECISION / U256::from(2)).is_ok());
        assert_eq!(
            calc_dst_qty(MAX_QTY + U256::from(1), 18, 18, PRECISION),
            Err(RateError::SrcQtyTooHigh {
                qty: MAX_QTY + U256::from(1)
            })
        );
        assert_eq!(
            calc_dst_qty(e18(1), 18, 18, MAX_RATE + U256::from(1)),
            Err(RateError::RateTooHigh {
                rate: MAX_RATE + U256::from(1)
            })
        );
        assert!(matches!(
            calc_dst_qty(MAX_QTY, 10, 20, PRECISION),
            Err(RateError::DstQtyTooHigh { .. })
        ));
        assert!(matches!(
            calc_dst_qty(e18(1), 0, 19, PRECISION),
            Err(RateError::DecimalsGap { .. })
        ));
        assert_eq!(
            calc_dst_qty(U256::from(1), 0, 18, PRECISION).unwrap(),
            PRECISION
        );
    }

    #[test]
    fn test_src_qty_rounds_up() {
        let rate = PRECISION / U256::from(3);
        let src = calc_src_qty(U256::from(333), 18, 18, rate).unwrap();
        assert_eq!(src, U256::from(1000));
        assert_eq!(calc_dst_qty(U256::from(999), 18, 18, rate).unwrap(), U256::from(332));
        assert!(calc_dst_qty(src, 18, 18, rate).unwrap() >= U256::from(333));

        assert_eq!(
            calc_src_qty(U256::from(100_000), 18, 18, e18(5)).unwrap(),
            U256::from(20_000)
        );
        assert_eq!(
            calc_src_qty(U256::from(1), 18, 18, U256::ZERO),
            Err(RateError::ZeroRate)
        );
    }

    #[test]
    fn test_src_qty_decimals_scaling() {
        let src = calc_src_qty(e18(2), 6, 18, e18(2)).unwrap();
        assert_eq!(src, U256::from(1_000_000));
        let src = calc_src_qty(U256::from(1_000_000), 18, 6, PRECISION / U256::from(2)).unwrap();
        assert_eq!(src, e18(2));
    }

    #[test]
    fn test_rate_from_qty() {
        assert_eq!(
            calc_rate_from_qty(e18(2), e18(9), 18, 18).unwrap(),
            PRECISION * U256::from(9) / U256::from(2)
        );
        assert_eq!(
            calc_rate_from_qty(U256::from(1_000_000), e18(2), 6, 18).unwrap(),
            e18(2)
        );
        assert_eq!(
            calc_rate_from_qty(e18(2), U256::from(1_000_000), 18, 6).unwrap(),
            PRECISION / U256::from(2)
        );
        assert_eq!(
            calc_rate_from_qty(U256::ZERO, e18(1), 18, 18),
            Err(RateError::ZeroSrcQty)
        );
        assert!(matches!(
            calc_rate_from_qty(e18(1), MAX_QTY + U256::from(1), 18, 18),
            Err(RateError::DstQtyTooHigh { .. })
        ));
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(U256::from(12345), 2500), U256::from(3086));
        assert_eq!(apply_bps(U256::MAX, BPS), U256::MAX);
        assert_eq!(
            mul_div(U256::MAX, U256::from(2), U256::from(4)),
            U256::MAX / U256::from(2)
        );
        assert_eq!(mul_div(U256::from(7), U256::from(3), U256::ZERO), U256::ZERO);
        assert_eq!(mul_div_up(U256::from(7), U256::from(3), U256::from(2)), U256::from(11));
        assert_eq!(mul_div_up(U256::from(8), U256::from(3), U256::from(2)), U256::from(12));
    }

    #[test]
    fn test_numeric_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned(U256::from(1234567890)),
            Some(udec256!(1234567890))
        );
        assert_eq!(
            Converter::new(6).from_unsigned(U256::from(1234567890)),
            Some(udec256!(1234.56789))
        );
        assert_eq!(
            Converter::rate().from_unsigned(PRECISION * U256::from(9) / U256::from(2)),
            Some(udec256!(4.5))
        );
    }

    #[test]
    fn test_numeric_converter_to_unsigned() {
        assert_eq!(
            Converter::new(6).to_unsigned(udec256!(1234.56789)),
            U256::from(1234567890)
        );
        assert_eq!(Converter::new(18).to_unsigned(udec256!(1.5)), e18(3) / U256::from(2));
    }
}
