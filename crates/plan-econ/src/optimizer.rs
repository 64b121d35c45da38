//! TOW profitability and seniority-mix re-balancing proposals.
//!
//! Every TOW gets a margin, a senior/mid/junior FTE split and a status. The
//! re-balancing heuristic then branches on the TOW margin:
//!
//! - `<= 0`: cut the senior share and propose junior-rate replacements.
//! - `< 15`: trim the senior share and thin out concentrations of expensive
//!   contributors.
//! - `< 25`: leave the mix alone.
//! - `>= 25`: flag junior-heavy, heavy-weight TOWs as able to absorb senior
//!   capacity, and shift some junior share back to senior on the heaviest.

use plan_core::{non_negative, ratio, SeniorityBand, TowDefinition};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::pnl::{margin_pct, CostBreakdown};
use crate::team::MemberFte;

pub const WARNING_MARGIN_PCT: f64 = 10.0;
pub const EXCELLENT_MARGIN_PCT: f64 = 20.0;
pub const JUNIORIZE_BELOW_PCT: f64 = 15.0;
pub const ABSORB_FROM_PCT: f64 = 25.0;

const LOSS_SENIOR_CUT_POINTS: f64 = 30.0;
const LOSS_SENIOR_FLOOR_PCT: f64 = 10.0;
const LOSS_TO_MID_SHARE: f64 = 0.4;
const JUNIOR_RATE_RATIO: f64 = 0.6;
const REPLACEABLE_FTE_SHARE: f64 = 0.5;
const MIN_REPLACEMENT_SAVING: f64 = 5_000.0;

const LOW_SENIOR_CUT_RATIO: f64 = 0.2;
const LOW_SENIOR_CUT_POINTS: f64 = 15.0;
const LOW_SENIOR_FLOOR_PCT: f64 = 20.0;
const EXPENSIVE_RATE_RATIO: f64 = 1.2;
const EXPENSIVE_TRIGGER_PCT: f64 = 50.0;
const EXPENSIVE_TARGET_PCT: f64 = 30.0;
const EXPENSIVE_MOVE_SHARE: f64 = 0.3;
const TARGET_RATE_RATIO: f64 = 0.7;

const ABSORB_JUNIOR_MIN_PCT: f64 = 30.0;
const ABSORB_WEIGHT_MIN_PCT: f64 = 20.0;
const ABSORB_CAPACITY_SHARE: f64 = 0.2;
const SHIFT_WEIGHT_MIN_PCT: f64 = 25.0;
const SHIFT_MAX_POINTS: f64 = 10.0;
const SHIFT_JUNIOR_FLOOR_PCT: f64 = 10.0;

const SURFACE_SENIOR_DELTA: f64 = 0.3;
/// Reductions below one currency cent do not count.
const MIN_COST_REDUCTION: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TowStatus {
    Loss,
    Warning,
    Ok,
    Excellent,
}

/// First match wins: loss, warning, excellent, ok.
pub fn classify_status(margin_pct: f64) -> TowStatus {
    if margin_pct < 0.0 {
        TowStatus::Loss
    } else if margin_pct < WARNING_MARGIN_PCT {
        TowStatus::Warning
    } else if margin_pct >= EXCELLENT_MARGIN_PCT {
        TowStatus::Excellent
    } else {
        TowStatus::Ok
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    Critical,
    Juniorize,
    Absorb,
    Rebalance,
    Maintain,
}

/// Senior/mid/junior split in FTE and percent of the TOW total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SeniorityMix {
    pub senior_fte: f64,
    pub mid_fte: f64,
    pub junior_fte: f64,
    pub senior_pct: f64,
    pub mid_pct: f64,
    pub junior_pct: f64,
}

impl SeniorityMix {
    pub fn from_fte(senior: f64, mid: f64, junior: f64) -> Self {
        let total = senior + mid + junior;
        Self {
            senior_fte: senior,
            mid_fte: mid,
            junior_fte: junior,
            senior_pct: ratio(senior, total) * 100.0,
            mid_pct: ratio(mid, total) * 100.0,
            junior_pct: ratio(junior, total) * 100.0,
        }
    }

    pub fn total_fte(&self) -> f64 {
        self.senior_fte + self.mid_fte + self.junior_fte
    }

    fn band_fte(&self, band: SeniorityBand) -> f64 {
        match band {
            SeniorityBand::Senior => self.senior_fte,
            SeniorityBand::Mid => self.mid_fte,
            SeniorityBand::Junior => self.junior_fte,
        }
    }
}

/// A member's effort on one TOW.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Contributor {
    pub profile_id: String,
    pub band: SeniorityBand,
    pub fte: f64,
    pub daily_rate: f64,
    pub days_per_year: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TowProfitability {
    pub tow_id: String,
    pub label: String,
    pub weight_pct: f64,
    pub revenue: f64,
    pub cost: f64,
    pub margin: f64,
    pub margin_pct: f64,
    pub status: TowStatus,
    pub mix: SeniorityMix,
    /// FTE-weighted daily rate of the contributors.
    pub avg_daily_rate: f64,
    pub contributors: Vec<Contributor>,
    /// Members whose seniority label could not be classified (counted as mid).
    pub unclassified_members: Vec<String>,
    pub quantity: Option<f64>,
    /// Quantity after TOW volume adjustments.
    pub effective_quantity: Option<f64>,
    pub unit_revenue: Option<f64>,
    pub unit_cost: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReallocationAction {
    /// Move senior FTE to mid and junior.
    ReduceSenior {
        fte: f64,
        to_mid_fte: f64,
        to_junior_fte: f64,
    },
    /// Substitute part of a senior contributor with junior-rate effort.
    ReplaceWithJunior {
        profile_id: String,
        fte: f64,
        current_rate: f64,
        replacement_rate: f64,
        savings: f64,
    },
    /// Move part of an expensive contributor to cheaper effort.
    MoveExpensive {
        profile_id: String,
        fte: f64,
        current_rate: f64,
        target_rate: f64,
        savings: f64,
    },
    /// The TOW can take on senior capacity from elsewhere.
    AbsorbSenior { fte_capacity: f64 },
    /// Move junior FTE to senior.
    ShiftToSenior { fte: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationProposal {
    pub tow_id: String,
    pub kind: ProposalKind,
    pub status: TowStatus,
    pub margin_pct: f64,
    pub current: SeniorityMix,
    pub proposed: SeniorityMix,
    pub senior_fte_delta: f64,
    /// Savings of the concrete replacement/move actions.
    pub action_savings: f64,
    /// Cost change of the proposed mix at observed band rates.
    pub mix_savings: f64,
    pub estimated_cost_reduction: f64,
    pub actions: Vec<ReallocationAction>,
    pub unclassified_members: Vec<String>,
}

impl OptimizationProposal {
    /// Worth showing: saves money, moves senior effort noticeably, or the TOW
    /// is losing money.
    pub fn is_actionable(&self) -> bool {
        self.estimated_cost_reduction >= MIN_COST_REDUCTION
            || self.senior_fte_delta.abs() > SURFACE_SENIOR_DELTA
            || self.status == TowStatus::Loss
            || self.kind == ProposalKind::Critical
    }
}

/// Inputs of the per-TOW analysis.
#[derive(Clone, Debug)]
pub struct TowInputs<'a> {
    pub tows: &'a [TowDefinition],
    /// Parallel to `costs.by_member`.
    pub members: &'a [MemberFte],
    pub costs: &'a CostBreakdown,
    pub total_revenue: f64,
    /// TOW id -> time-weighted quantity after volume adjustments.
    pub effective_quantities: &'a BTreeMap<String, f64>,
}

fn per_unit(amount: f64, quantity: Option<f64>) -> Option<f64> {
    quantity.filter(|q| *q > 0.0).map(|q| amount / q)
}

/// Profitability and seniority mix of every defined TOW.
///
/// revenue = total_revenue × weight/Σ weights; cost is the TOW's loaded
/// cost from `by_tow`; margin% = (revenue − cost)/revenue × 100. Members
/// contribute avg effective FTE × their share of the TOW.
///
/// Example:
/// let tows = tow_profitability(&TowInputs { tows: &lot.tows, members: &members, costs: &costs, .. });
/// assert_eq!(tows.len(), lot.tows.len());
pub fn tow_profitability(inputs: &TowInputs<'_>) -> Vec<TowProfitability> {
    let weight_total: f64 = inputs.tows.iter().map(|t| non_negative(t.weight_pct)).sum();
    inputs
        .tows
        .iter()
        .map(|tow| {
            let mut contributors = Vec::new();
            let mut unclassified_members = Vec::new();
            for (member, cost) in inputs.members.iter().zip(&inputs.costs.by_member) {
                let Some(share) = member.tow_shares.get(&tow.tow_id) else {
                    continue;
                };
                if !member.seniority.is_classified() {
                    unclassified_members.push(member.profile_id.clone());
                }
                contributors.push(Contributor {
                    profile_id: member.profile_id.clone(),
                    band: member.seniority.band(),
                    fte: member.avg_effective_fte * share,
                    daily_rate: cost.avg_daily_rate,
                    days_per_year: member.days_per_year,
                });
            }
            let band_total = |band: SeniorityBand| -> f64 {
                contributors
                    .iter()
                    .filter(|c| c.band == band)
                    .map(|c| c.fte)
                    .sum()
            };
            let mix = SeniorityMix::from_fte(
                band_total(SeniorityBand::Senior),
                band_total(SeniorityBand::Mid),
                band_total(SeniorityBand::Junior),
            );
            let avg_daily_rate = ratio(
                contributors.iter().map(|c| c.fte * c.daily_rate).sum(),
                mix.total_fte(),
            );

            let revenue = inputs.total_revenue * ratio(non_negative(tow.weight_pct), weight_total);
            let cost = inputs
                .costs
                .by_tow
                .get(&tow.tow_id)
                .map(|c| c.total_cost)
                .unwrap_or(0.0);
            let margin = revenue - cost;
            let pct = margin_pct(margin, revenue);
            let quantity = tow.kind.quantity();
            let effective_quantity = quantity.map(|q| {
                inputs
                    .effective_quantities
                    .get(&tow.tow_id)
                    .copied()
                    .unwrap_or(q)
            });
            if !unclassified_members.is_empty() {
                warn!(tow = %tow.tow_id, members = ?unclassified_members, "unclassified seniority counted as mid");
            }

            TowProfitability {
                tow_id: tow.tow_id.clone(),
                label: tow.label.clone(),
                weight_pct: tow.weight_pct,
                revenue,
                cost,
                margin,
                margin_pct: pct,
                status: classify_status(pct),
                mix,
                avg_daily_rate,
                contributors,
                unclassified_members,
                quantity,
                effective_quantity,
                unit_revenue: per_unit(revenue, effective_quantity),
                unit_cost: per_unit(cost, effective_quantity),
            }
        })
        .collect()
}

/// Mix shares in percentage points, adjusted by the heuristic.
#[derive(Clone, Copy, Debug)]
struct Shares {
    senior: f64,
    mid: f64,
    junior: f64,
}

fn band_rate(tow: &TowProfitability, band: SeniorityBand) -> f64 {
    let (num, den) = tow
        .contributors
        .iter()
        .filter(|c| c.band == band)
        .fold((0.0, 0.0), |(n, d), c| (n + c.fte * c.daily_rate, d + c.fte));
    if den > 0.0 {
        num / den
    } else {
        tow.avg_daily_rate
    }
}

fn years(duration_months: u32) -> f64 {
    f64::from(duration_months.max(1)) / 12.0
}

/// Build the re-balancing proposal for one TOW.
pub fn propose(tow: &TowProfitability, duration_months: u32) -> OptimizationProposal {
    let total = tow.mix.total_fte();
    let years = years(duration_months);
    let mut shares = Shares {
        senior: tow.mix.senior_pct,
        mid: tow.mix.mid_pct,
        junior: tow.mix.junior_pct,
    };
    let mut actions = Vec::new();
    let pct = tow.margin_pct;

    let kind = if pct <= 0.0 {
        let cut = LOSS_SENIOR_CUT_POINTS.min(shares.senior - LOSS_SENIOR_FLOOR_PCT).max(0.0);
        if cut > 0.0 {
            shares.senior -= cut;
            shares.mid += cut * LOSS_TO_MID_SHARE;
            shares.junior += cut * (1.0 - LOSS_TO_MID_SHARE);
            actions.push(ReallocationAction::ReduceSenior {
                fte: cut / 100.0 * total,
                to_mid_fte: cut * LOSS_TO_MID_SHARE / 100.0 * total,
                to_junior_fte: cut * (1.0 - LOSS_TO_MID_SHARE) / 100.0 * total,
            });
        }
        let mut seniors: Vec<&Contributor> = tow
            .contributors
            .iter()
            .filter(|c| c.band == SeniorityBand::Senior && c.fte > 0.0)
            .collect();
        seniors.sort_by(|a, b| b.daily_rate.total_cmp(&a.daily_rate));
        for c in seniors {
            let fte = c.fte * REPLACEABLE_FTE_SHARE;
            let replacement_rate = c.daily_rate * JUNIOR_RATE_RATIO;
            let savings = fte * (c.daily_rate - replacement_rate) * c.days_per_year * years;
            if savings > MIN_REPLACEMENT_SAVING {
                actions.push(ReallocationAction::ReplaceWithJunior {
                    profile_id: c.profile_id.clone(),
                    fte,
                    current_rate: c.daily_rate,
                    replacement_rate,
                    savings,
                });
            }
        }
        ProposalKind::Critical
    } else if pct < JUNIORIZE_BELOW_PCT {
        let cut = (shares.senior * LOW_SENIOR_CUT_RATIO).min(LOW_SENIOR_CUT_POINTS);
        let floored = if shares.senior > LOW_SENIOR_FLOOR_PCT {
            (shares.senior - cut).max(LOW_SENIOR_FLOOR_PCT)
        } else {
            shares.senior
        };
        let freed = shares.senior - floored;
        if freed > 0.0 {
            shares.senior = floored;
            shares.mid += freed / 2.0;
            shares.junior += freed / 2.0;
            actions.push(ReallocationAction::ReduceSenior {
                fte: freed / 100.0 * total,
                to_mid_fte: freed / 200.0 * total,
                to_junior_fte: freed / 200.0 * total,
            });
        }

        let threshold = tow.avg_daily_rate * EXPENSIVE_RATE_RATIO;
        let mut expensive: Vec<&Contributor> = tow
            .contributors
            .iter()
            .filter(|c| c.daily_rate > threshold && c.fte > 0.0)
            .collect();
        let expensive_fte: f64 = expensive.iter().map(|c| c.fte).sum();
        if ratio(expensive_fte, total) * 100.0 > EXPENSIVE_TRIGGER_PCT {
            expensive.sort_by(|a, b| b.daily_rate.total_cmp(&a.daily_rate));
            let mut excess = expensive_fte - total * EXPENSIVE_TARGET_PCT / 100.0;
            let target_rate = tow.avg_daily_rate * TARGET_RATE_RATIO;
            for c in expensive {
                let fte = (c.fte * EXPENSIVE_MOVE_SHARE).min(excess);
                if fte <= 0.0 {
                    break;
                }
                excess -= fte;
                actions.push(ReallocationAction::MoveExpensive {
                    profile_id: c.profile_id.clone(),
                    fte,
                    current_rate: c.daily_rate,
                    target_rate,
                    savings: fte * (c.daily_rate - target_rate).max(0.0) * c.days_per_year * years,
                });
            }
        }
        ProposalKind::Juniorize
    } else if pct < ABSORB_FROM_PCT {
        ProposalKind::Maintain
    } else {
        let mut kind = ProposalKind::Maintain;
        if shares.junior > ABSORB_JUNIOR_MIN_PCT && tow.weight_pct > ABSORB_WEIGHT_MIN_PCT {
            actions.push(ReallocationAction::AbsorbSenior {
                fte_capacity: total * ABSORB_CAPACITY_SHARE,
            });
            kind = ProposalKind::Absorb;
        }
        if tow.weight_pct > SHIFT_WEIGHT_MIN_PCT {
            let shift = SHIFT_MAX_POINTS
                .min(shares.junior - SHIFT_JUNIOR_FLOOR_PCT)
                .max(0.0);
            if shift > 0.0 {
                shares.junior -= shift;
                shares.senior += shift;
                actions.push(ReallocationAction::ShiftToSenior {
                    fte: shift / 100.0 * total,
                });
                if kind == ProposalKind::Maintain {
                    kind = ProposalKind::Rebalance;
                }
            }
        }
        kind
    };

    let sum = shares.senior + shares.mid + shares.junior;
    let proposed = if sum > 0.0 {
        SeniorityMix::from_fte(
            shares.senior / sum * total,
            shares.mid / sum * total,
            shares.junior / sum * total,
        )
    } else {
        tow.mix
    };

    let days_per_year = ratio(
        tow.contributors.iter().map(|c| c.fte * c.days_per_year).sum(),
        total,
    );
    let mix_savings: f64 = [SeniorityBand::Senior, SeniorityBand::Mid, SeniorityBand::Junior]
        .into_iter()
        .map(|band| {
            (tow.mix.band_fte(band) - proposed.band_fte(band))
                * band_rate(tow, band)
                * days_per_year
                * years
        })
        .sum();
    let action_savings: f64 = actions
        .iter()
        .map(|a| match a {
            ReallocationAction::ReplaceWithJunior { savings, .. }
            | ReallocationAction::MoveExpensive { savings, .. } => *savings,
            _ => 0.0,
        })
        .sum();
    let estimated_cost_reduction = action_savings.max(mix_savings).max(0.0);
    let senior_fte_delta = proposed.senior_fte - tow.mix.senior_fte;

    debug!(
        tow = %tow.tow_id,
        ?kind,
        margin_pct = pct,
        senior_fte_delta,
        estimated_cost_reduction,
        "mix proposal"
    );

    OptimizationProposal {
        tow_id: tow.tow_id.clone(),
        kind,
        status: tow.status,
        margin_pct: pct,
        current: tow.mix,
        proposed,
        senior_fte_delta,
        action_savings,
        mix_savings,
        estimated_cost_reduction,
        actions,
        unclassified_members: tow.unclassified_members.clone(),
    }
}

/// Proposals worth surfacing, one per TOW at most.
pub fn optimize(tows: &[TowProfitability], duration_months: u32) -> Vec<OptimizationProposal> {
    tows.iter()
        .map(|t| propose(t, duration_months))
        .filter(OptimizationProposal::is_actionable)
        .collect()
}
