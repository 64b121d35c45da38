//! Discount needed for a target margin, and the break-even discount.

use plan_core::{clamp_pct, non_negative};
use serde::Serialize;

use crate::pnl::{profit_and_loss, ProfitAndLoss};

/// Margin at the configured discount plus the two solved discounts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarginResult {
    pub revenue: f64,
    pub margin: f64,
    pub margin_pct: f64,
    /// target + risk contingency, in percent.
    pub effective_target_pct: f64,
    /// Discount that leaves exactly the effective target margin.
    pub suggested_discount_pct: f64,
    /// The target cannot be reached at any discount >= 0.
    pub target_unreachable: bool,
    pub break_even_discount_pct: f64,
}

/// Solve `base × (1 − d) × (1 − target) = cost` for `d`, in percent.
///
/// Clamped into `[0, 100]`; 100 when the target is 100% or more.
pub fn suggested_discount(total_cost: f64, base_amount: f64, effective_target_pct: f64) -> f64 {
    let base = non_negative(base_amount);
    if base <= 0.0 {
        return 0.0;
    }
    let denom = base * (1.0 - effective_target_pct / 100.0);
    if denom <= 0.0 || !denom.is_finite() {
        return 100.0;
    }
    clamp_pct((1.0 - total_cost / denom) * 100.0)
}

/// Discount at which margin is zero, in percent, clamped into `[0, 100]`.
pub fn break_even_discount(total_cost: f64, base_amount: f64) -> f64 {
    let base = non_negative(base_amount);
    if base <= 0.0 {
        return 0.0;
    }
    clamp_pct((1.0 - total_cost / base) * 100.0)
}

/// Margin analysis at the statement's discount.
///
/// effective target = target + risk; the suggested discount leaves exactly
/// that margin, break-even leaves none. The target is unreachable when
/// cost > base × (1 − effective_target/100).
///
/// Example:
/// let pnl = profit_and_loss(1_000_000.0, 10.0, 900_000.0);
/// let m = margin_result(&pnl, 15.0, 3.0);
/// assert_eq!(m.break_even_discount_pct, 10.0);
/// assert!(m.target_unreachable);
pub fn margin_result(pnl: &ProfitAndLoss, target_margin_pct: f64, risk_contingency_pct: f64) -> MarginResult {
    let effective_target_pct = target_margin_pct + risk_contingency_pct;
    let base = pnl.base_amount;
    let reachable_denom = base * (1.0 - effective_target_pct / 100.0);
    MarginResult {
        revenue: pnl.revenue,
        margin: pnl.margin,
        margin_pct: pnl.margin_pct,
        effective_target_pct,
        suggested_discount_pct: suggested_discount(pnl.total_cost, base, effective_target_pct),
        target_unreachable: base > 0.0
            && (reachable_denom <= 0.0 || pnl.total_cost > reachable_denom),
        break_even_discount_pct: break_even_discount(pnl.total_cost, base),
    }
}

/// P&L at each candidate discount.
pub fn simulate_discounts(total_cost: f64, base_amount: f64, discounts_pct: &[f64]) -> Vec<ProfitAndLoss> {
    discounts_pct
        .iter()
        .map(|d| profit_and_loss(base_amount, *d, total_cost))
        .collect()
}
