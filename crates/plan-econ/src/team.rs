//! Team composition: effective FTE per member across adjustment periods.
//!
//! `effective_fte = base_fte × profile_factor × reuse_multiplier × tow_factor`
//! where the TOW factor is the allocation-weighted average over the TOWs the
//! member actually works on.

use plan_core::{
    clamp_pct, non_negative, MonthRange, Seniority, TeamMember, Timeline,
    VolumeAdjustmentPeriod,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::volume::{resolve_factor, AdjustmentKey, AdjustmentSchedule};

/// Factors applied to one member over one adjustment period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodFte {
    pub range: MonthRange,
    pub profile_factor: f64,
    pub reuse_multiplier: f64,
    pub tow_factor: f64,
    pub effective_fte: f64,
}

/// Effective FTE of a member, with per-period detail for audit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberFte {
    pub profile_id: String,
    pub label: String,
    pub seniority: Seniority,
    /// Base FTE after clamping to >= 0.
    pub base_fte: f64,
    pub days_per_year: f64,
    pub periods: Vec<PeriodFte>,
    /// Month-weighted average over the periods.
    pub avg_effective_fte: f64,
    pub avg_profile_factor: f64,
    pub avg_tow_factor: f64,
    pub reuse_multiplier: f64,
    /// TOW id -> share of the member's effort, normalized over positive
    /// allocations. Empty when the member is not allocated.
    /// The plan pass drops shares naming no defined TOW.
    pub tow_shares: BTreeMap<String, f64>,
}

impl MemberFte {
    pub fn fte_timeline(&self) -> Timeline<f64> {
        let mut t = Timeline::new();
        for p in &self.periods {
            t.insert(p.range, p.effective_fte);
        }
        t
    }

    /// Effective FTE on consecutive pieces of `range`. Months outside every
    /// adjustment period take the member's average effective FTE.
    pub fn fte_pieces(&self, range: MonthRange) -> Vec<(MonthRange, f64)> {
        self.fte_timeline()
            .pieces(range)
            .into_iter()
            .map(|(r, v)| (r, v.copied().unwrap_or(self.avg_effective_fte)))
            .collect()
    }

    /// Working days delivered over `duration_months`.
    pub fn effective_days(&self, duration_months: u32) -> f64 {
        self.avg_effective_fte * self.days_per_year * f64::from(duration_months) / 12.0
    }
}

/// `1 − reuse/100`, with reuse clamped into `[0, 100]`.
pub fn reuse_multiplier(reuse_factor_pct: f64) -> f64 {
    1.0 - clamp_pct(reuse_factor_pct) / 100.0
}

/// `(tow_id, weight)` for every positive allocation, weight = pct/100.
pub fn allocation_weights(member: &TeamMember) -> Vec<(&str, f64)> {
    member
        .tow_allocation
        .iter()
        .filter(|(_, pct)| pct.is_finite() && **pct > 0.0)
        .map(|(tow, pct)| (tow.as_str(), pct / 100.0))
        .collect()
}

/// Allocation-weighted TOW factor of a member in one period; 1.0 without
/// allocation.
pub fn tow_factor(member: &TeamMember, period: Option<&VolumeAdjustmentPeriod>) -> f64 {
    let weights = allocation_weights(member);
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return 1.0;
    }
    let weighted: f64 = weights
        .iter()
        .map(|(tow, w)| w * resolve_factor(period, AdjustmentKey::Tow(tow)))
        .sum();
    weighted / total
}

/// Effective FTE of one member across the adjustment periods.
///
/// effective = fte × profile_factor × (1 − reuse/100) × tow_factor, where
/// tow_factor is the allocation-weighted mean of the period's TOW factors.
/// Averages are weighted by months.
///
/// Example:
/// let fte = member_effective_fte(&member, &schedule, 10.0);
/// assert_eq!(fte.avg_effective_fte, member.fte * 0.9); // no adjustments
pub fn member_effective_fte(
    member: &TeamMember,
    schedule: &AdjustmentSchedule<'_>,
    reuse_factor_pct: f64,
) -> MemberFte {
    let base_fte = non_negative(member.fte);
    let reuse = reuse_multiplier(reuse_factor_pct);
    let periods: Vec<PeriodFte> = schedule
        .timeline()
        .segments()
        .map(|(range, period)| {
            let profile_factor =
                resolve_factor(*period, AdjustmentKey::Profile(&member.profile_id));
            let tow_factor = tow_factor(member, *period);
            PeriodFte {
                range: *range,
                profile_factor,
                reuse_multiplier: reuse,
                tow_factor,
                effective_fte: base_fte * profile_factor * reuse * tow_factor,
            }
        })
        .collect();

    let weighted = |f: fn(&PeriodFte) -> f64| -> f64 {
        let months: u32 = periods.iter().map(|p| p.range.months()).sum();
        if months == 0 {
            return 0.0;
        }
        periods
            .iter()
            .map(|p| f(p) * f64::from(p.range.months()))
            .sum::<f64>()
            / f64::from(months)
    };
    let avg_effective_fte = weighted(|p| p.effective_fte);
    let avg_profile_factor = weighted(|p| p.profile_factor);
    let avg_tow_factor = weighted(|p| p.tow_factor);

    let weights = allocation_weights(member);
    let total_weight: f64 = weights.iter().map(|(_, w)| w).sum();
    let tow_shares = weights
        .iter()
        .map(|(tow, w)| (tow.to_string(), w / total_weight))
        .collect();

    debug!(
        profile = %member.profile_id,
        base_fte,
        avg_effective_fte,
        periods = periods.len(),
        "member effective fte"
    );

    MemberFte {
        profile_id: member.profile_id.clone(),
        label: member.label.clone(),
        seniority: member.seniority.clone(),
        base_fte,
        days_per_year: non_negative(member.days_per_year),
        periods,
        avg_effective_fte,
        avg_profile_factor,
        avg_tow_factor,
        reuse_multiplier: reuse,
        tow_shares,
    }
}

pub fn team_effective_fte(
    team: &[TeamMember],
    schedule: &AdjustmentSchedule<'_>,
    reuse_factor_pct: f64,
) -> Vec<MemberFte> {
    team.iter()
        .map(|m| member_effective_fte(m, schedule, reuse_factor_pct))
        .collect()
}

/// Σ base FTE (clamped) of the roster.
pub fn total_base_fte(team: &[TeamMember]) -> f64 {
    team.iter().map(|m| non_negative(m.fte)).sum()
}
