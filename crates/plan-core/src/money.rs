//! Numeric guards and the currency rounding rule.
//!
//! Internal arithmetic stays in `f64`. Amounts are rounded to 2 decimals,
//! midpoint away from zero, only when they leave the engine.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to currency-minor-unit precision.
///
/// Non-finite or out-of-range values become zero.
pub fn round_money(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp a percentage into `[0, 100]`; non-finite becomes 0.
pub fn clamp_pct(pct: f64) -> f64 {
    if pct.is_finite() {
        pct.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Clamp to `>= 0`; non-finite becomes 0.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// `num / den`, or 0 when the quotient is undefined.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        return 0.0;
    }
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(1.005_000_1), Decimal::new(101, 2));
        assert_eq!(round_money(2.5), Decimal::new(250, 2));
        assert_eq!(round_money(-0.125), Decimal::new(-13, 2));
        assert_eq!(round_money(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn guards() {
        assert_eq!(clamp_pct(120.0), 100.0);
        assert_eq!(clamp_pct(-3.0), 0.0);
        assert_eq!(clamp_pct(f64::INFINITY), 0.0);
        assert_eq!(non_negative(-1.0), 0.0);
        assert_eq!(ratio(1.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 2.0), 1.5);
    }
}
