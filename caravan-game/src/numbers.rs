//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

use crate::constants::BPS_DENOM;

/// Floor a f64 and clamp it to the u64 range, returning 0 for non-finite or negative values.
#[must_use]
pub fn floor_f64_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    let clamped = value.min(max).floor();
    cast::<f64, u64>(clamped).unwrap_or(u64::MAX)
}

/// Round a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// `floor(amount * bps / 10_000)` computed exactly, clamped to the i64 range.
///
/// `bps` may be negative, in which case the result rounds toward negative infinity.
#[must_use]
pub fn apply_bps(amount: u64, bps: i64) -> i64 {
    let product = i128::from(amount) * i128::from(bps);
    let floored = product.div_euclid(i128::from(BPS_DENOM));
    i64::try_from(floored).unwrap_or(if floored.is_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Unsigned variant of [`apply_bps`], saturating at `u64::MAX`.
#[must_use]
pub fn apply_bps_unsigned(amount: u64, bps: u32) -> u64 {
    let product = u128::from(amount) * u128::from(bps);
    u64::try_from(product / u128::from(BPS_DENOM)).unwrap_or(u64::MAX)
}
