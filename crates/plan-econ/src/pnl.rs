//! Cost aggregation and the profit & loss statement.
//!
//! Team cost is accumulated month-segment by month-segment: for every mapping
//! period, each overlapping piece of the member's effective FTE is priced at
//! that period's blended rate.

use plan_core::{
    clamp_pct, non_negative, ratio, MappingStatus, RateCatalog, SubcontractConfig,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::governance::GovernanceCost;
use crate::rates::ProfileRate;
use crate::team::MemberFte;

/// Key of the bucket holding cost not allocated to a defined TOW.
pub const UNALLOCATED_TOW: &str = "unallocated";

const SHARE_EPSILON: f64 = 1e-9;

/// Team cost of one member with the factors behind it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberCost {
    pub profile_id: String,
    pub label: String,
    pub mapping_status: MappingStatus,
    pub avg_effective_fte: f64,
    /// Working days priced (months with a valid rate only).
    pub effective_days: f64,
    pub costed_months: u32,
    pub cost: f64,
    /// `cost / effective_days`; the mapping's display rate when nothing was priced.
    pub avg_daily_rate: f64,
    pub avg_profile_factor: f64,
    pub avg_tow_factor: f64,
    pub reuse_multiplier: f64,
}

/// Cost charged to one internal profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProfileCost {
    pub internal_profile_id: String,
    pub label: String,
    pub daily_rate: f64,
    pub effective_days: f64,
    pub cost: f64,
}

/// Fully loaded cost of one TOW.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TowCost {
    pub tow_id: String,
    pub effective_fte: f64,
    pub team_cost: f64,
    /// Share of governance, risk and subcontract.
    pub overhead_cost: f64,
    pub total_cost: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub team_cost: f64,
    pub governance: GovernanceCost,
    pub governance_cost: f64,
    pub risk_cost: f64,
    pub subcontract_cost: f64,
    pub total_cost: f64,
    pub by_member: Vec<MemberCost>,
    pub by_tow: BTreeMap<String, TowCost>,
    /// Cost of effort not shared out to a TOW.
    pub unallocated: TowCost,
    pub by_internal_profile: BTreeMap<String, ProfileCost>,
    /// Team cost per contract month (index 0 = month 1).
    pub monthly_team_cost: Vec<f64>,
}

/// Priced detail of one member before aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct PricedMember {
    pub cost: MemberCost,
    /// internal profile id -> (days, cost)
    pub by_profile: BTreeMap<String, (f64, f64)>,
    pub monthly: Vec<f64>,
}

/// Price a member against its resolved mapping.
pub fn price_member(member: &MemberFte, rate: &ProfileRate, duration_months: u32) -> PricedMember {
    let mut monthly = vec![0.0; duration_months.max(1) as usize];
    let mut by_profile: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut cost = 0.0;
    let mut days_total = 0.0;
    let mut costed_months = 0;

    for period in rate.periods.iter().filter(|p| p.blend.is_valid()) {
        costed_months += period.range.months();
        for (piece, fte) in member.fte_pieces(period.range) {
            let days = fte * member.days_per_year * piece.years();
            let piece_cost = days * period.blend.rate;
            cost += piece_cost;
            days_total += days;
            for share in &period.blend.shares {
                let slot = by_profile
                    .entry(share.internal_profile_id.clone())
                    .or_insert((0.0, 0.0));
                slot.0 += days * share.weight;
                slot.1 += days * share.weight * share.daily_rate;
            }
            let per_month = piece_cost / f64::from(piece.months());
            for m in piece.start..=piece.end {
                if let Some(v) = monthly.get_mut(m as usize - 1) {
                    *v += per_month;
                }
            }
        }
    }

    let avg_daily_rate = if days_total > 0.0 {
        cost / days_total
    } else {
        rate.display_rate
    };
    debug!(
        profile = %member.profile_id,
        cost,
        days = days_total,
        costed_months,
        "member priced"
    );

    PricedMember {
        cost: MemberCost {
            profile_id: member.profile_id.clone(),
            label: member.label.clone(),
            mapping_status: rate.status,
            avg_effective_fte: member.avg_effective_fte,
            effective_days: days_total,
            costed_months,
            cost,
            avg_daily_rate,
            avg_profile_factor: member.avg_profile_factor,
            avg_tow_factor: member.avg_tow_factor,
            reuse_multiplier: member.reuse_multiplier,
        },
        by_profile,
        monthly,
    }
}

/// Subcontracted cost for the configured mode.
pub fn subcontract_cost(config: &SubcontractConfig, team_cost: f64) -> f64 {
    match config {
        SubcontractConfig::None => 0.0,
        SubcontractConfig::Fixed { amount } => non_negative(*amount),
        SubcontractConfig::PercentOfTeam { pct } => non_negative(team_cost) * clamp_pct(*pct) / 100.0,
    }
}

/// `(team + governance) × risk/100`.
pub fn risk_cost(team_cost: f64, governance_cost: f64, risk_contingency_pct: f64) -> f64 {
    (team_cost + governance_cost) * clamp_pct(risk_contingency_pct) / 100.0
}

/// Sum members and cost components into a breakdown.
///
/// `members` and `priced` are parallel slices. Whatever part of a member's
/// effort its `tow_shares` leave uncovered is charged to `unallocated`.
pub fn aggregate_costs(
    members: &[MemberFte],
    priced: &[PricedMember],
    governance: GovernanceCost,
    risk_contingency_pct: f64,
    subcontract: &SubcontractConfig,
    catalog: &RateCatalog,
    duration_months: u32,
) -> CostBreakdown {
    let team_cost: f64 = priced.iter().map(|p| p.cost.cost).sum();
    let governance_cost = governance.final_cost;
    let risk_cost = risk_cost(team_cost, governance_cost, risk_contingency_pct);
    let subcontract_cost = subcontract_cost(subcontract, team_cost);
    let total_cost = team_cost + governance_cost + risk_cost + subcontract_cost;

    let mut monthly_team_cost = vec![0.0; duration_months.max(1) as usize];
    let mut by_internal_profile: BTreeMap<String, ProfileCost> = BTreeMap::new();
    let mut by_tow: BTreeMap<String, TowCost> = BTreeMap::new();
    let mut unallocated = TowCost {
        tow_id: UNALLOCATED_TOW.to_string(),
        ..TowCost::default()
    };

    for (member, p) in members.iter().zip(priced) {
        for (slot, v) in monthly_team_cost.iter_mut().zip(&p.monthly) {
            *slot += v;
        }
        for (id, (days, cost)) in &p.by_profile {
            let entry = by_internal_profile
                .entry(id.clone())
                .or_insert_with(|| ProfileCost {
                    internal_profile_id: id.clone(),
                    label: catalog.get(id).map(|ip| ip.label.clone()).unwrap_or_default(),
                    daily_rate: catalog.rate(id).unwrap_or(0.0),
                    ..ProfileCost::default()
                });
            entry.effective_days += days;
            entry.cost += cost;
        }
        let rest = 1.0 - member.tow_shares.values().sum::<f64>();
        if rest > SHARE_EPSILON {
            unallocated.team_cost += p.cost.cost * rest;
            unallocated.effective_fte += member.avg_effective_fte * rest;
        }
        for (tow, share) in &member.tow_shares {
            let entry = by_tow.entry(tow.clone()).or_insert_with(|| TowCost {
                tow_id: tow.clone(),
                ..TowCost::default()
            });
            entry.team_cost += p.cost.cost * share;
            entry.effective_fte += member.avg_effective_fte * share;
        }
    }

    let overhead = governance_cost + risk_cost + subcontract_cost;
    if team_cost > 0.0 {
        for t in by_tow.values_mut().chain(std::iter::once(&mut unallocated)) {
            t.overhead_cost = overhead * ratio(t.team_cost, team_cost);
            t.total_cost = t.team_cost + t.overhead_cost;
        }
    } else {
        unallocated.overhead_cost = overhead;
        unallocated.total_cost = unallocated.team_cost + overhead;
        for t in by_tow.values_mut() {
            t.total_cost = t.team_cost;
        }
    }

    debug!(
        team_cost,
        governance_cost, risk_cost, subcontract_cost, total_cost, "costs aggregated"
    );

    CostBreakdown {
        team_cost,
        governance,
        governance_cost,
        risk_cost,
        subcontract_cost,
        total_cost,
        by_member: priced.iter().map(|p| p.cost.clone()).collect(),
        by_tow,
        unallocated,
        by_internal_profile,
        monthly_team_cost,
    }
}

/// Revenue, cost and margin at a given discount.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfitAndLoss {
    pub base_amount: f64,
    pub discount_pct: f64,
    pub revenue: f64,
    pub total_cost: f64,
    pub margin: f64,
    pub margin_pct: f64,
}

/// `base × (1 − discount/100)` with the discount clamped into `[0, 100]`.
pub fn discounted_revenue(base_amount: f64, discount_pct: f64) -> f64 {
    non_negative(base_amount) * (1.0 - clamp_pct(discount_pct) / 100.0)
}

/// `margin / revenue × 100`, 0 without revenue.
pub fn margin_pct(margin: f64, revenue: f64) -> f64 {
    if revenue > 0.0 {
        ratio(margin, revenue) * 100.0
    } else {
        0.0
    }
}

/// Profit & loss at `discount_pct`.
///
/// revenue = base × (1 − discount/100); margin = revenue − cost;
/// margin% = margin/revenue × 100, or 0 without revenue.
///
/// Example:
/// let p = profit_and_loss(1_000_000.0, 10.0, 285_516.0);
/// assert_eq!(p.revenue, 900_000.0);
/// assert_eq!(p.margin, 614_484.0);
pub fn profit_and_loss(base_amount: f64, discount_pct: f64, total_cost: f64) -> ProfitAndLoss {
    let revenue = discounted_revenue(base_amount, discount_pct);
    let margin = revenue - total_cost;
    ProfitAndLoss {
        base_amount: non_negative(base_amount),
        discount_pct: clamp_pct(discount_pct),
        revenue,
        total_cost,
        margin,
        margin_pct: margin_pct(margin, revenue),
    }
}
