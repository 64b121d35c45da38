//! The full calculation pass: `compute_business_plan(&LotConfig)`.

use plan_core::{
    allocation_checks, non_negative, projection_years, resolve_periods, round_money,
    tow_weight_check, GovernanceMode, LotConfig, MixEntry, RateCatalog, SubcontractConfig,
    ValidationReport, YearSlice,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::governance::{governance_cost, GovernanceDetail, GovernanceInputs};
use crate::margin::{margin_result, MarginResult};
use crate::optimizer::{optimize, tow_profitability, OptimizationProposal, TowInputs, TowProfitability};
use crate::pnl::{aggregate_costs, price_member, profit_and_loss, subcontract_cost, CostBreakdown, ProfitAndLoss};
use crate::rates::{resolve_profile_rate, team_average_rate, ProfileRate};
use crate::team::{team_effective_fte, total_base_fte, MemberFte};
use crate::volume::{effective_quantity, AdjustmentSchedule};

/// Costs and revenue falling into one projection year.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct YearPlan {
    pub slice: YearSlice,
    pub team_cost: f64,
    pub governance_cost: f64,
    pub risk_cost: f64,
    pub subcontract_cost: f64,
    pub total_cost: f64,
    pub revenue: f64,
    pub margin: f64,
    /// `(1 + inflation/100)^index`.
    pub inflation_index: f64,
    pub inflated_total_cost: f64,
}

/// Headline figures rounded for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub team_cost: Decimal,
    pub governance_cost: Decimal,
    pub risk_cost: Decimal,
    pub subcontract_cost: Decimal,
    /// Sum of the rounded components.
    pub total_cost: Decimal,
    pub revenue: Decimal,
    pub margin: Decimal,
    pub margin_pct: Decimal,
    pub suggested_discount_pct: Decimal,
    pub break_even_discount_pct: Decimal,
}

/// Everything derived from one lot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BusinessPlan {
    pub name: String,
    pub duration_months: u32,
    pub periods: Vec<YearSlice>,
    pub members: Vec<MemberFte>,
    /// Parallel to `members`.
    pub profile_rates: Vec<ProfileRate>,
    pub team_average_rate: f64,
    pub costs: CostBreakdown,
    pub pnl: ProfitAndLoss,
    pub margin: MarginResult,
    pub tows: Vec<TowProfitability>,
    pub proposals: Vec<OptimizationProposal>,
    pub yearly: Vec<YearPlan>,
    pub validation: ValidationReport,
}

impl BusinessPlan {
    pub fn summary(&self) -> PlanSummary {
        let team_cost = round_money(self.costs.team_cost);
        let governance_cost = round_money(self.costs.governance_cost);
        let risk_cost = round_money(self.costs.risk_cost);
        let subcontract_cost = round_money(self.costs.subcontract_cost);
        let total_cost = team_cost + governance_cost + risk_cost + subcontract_cost;
        let revenue = round_money(self.pnl.revenue);
        PlanSummary {
            team_cost,
            governance_cost,
            risk_cost,
            subcontract_cost,
            total_cost,
            revenue,
            margin: revenue - total_cost,
            margin_pct: round_money(self.pnl.margin_pct),
            suggested_discount_pct: round_money(self.margin.suggested_discount_pct),
            break_even_discount_pct: round_money(self.margin.break_even_discount_pct),
        }
    }
}

fn sum_months(series: &[f64], slice: &YearSlice) -> f64 {
    (slice.range.start..=slice.range.end)
        .filter_map(|m| series.get(m as usize - 1))
        .sum()
}

/// Split the plan over projection years with the inflation index applied.
pub fn yearly_projection(lot: &LotConfig, costs: &CostBreakdown, pnl: &ProfitAndLoss) -> Vec<YearPlan> {
    let months = lot.duration.months();
    let governance = costs.governance.monthly(months);
    let inflation = lot.economics.inflation_pct;
    projection_years(&lot.duration)
        .into_iter()
        .map(|slice| {
            let share = f64::from(slice.months) / f64::from(months);
            let team_cost = sum_months(&costs.monthly_team_cost, &slice);
            let governance_cost = sum_months(&governance, &slice);
            let risk_cost = crate::pnl::risk_cost(
                team_cost,
                governance_cost,
                lot.economics.risk_contingency_pct,
            );
            let subcontract_cost = match lot.subcontract {
                SubcontractConfig::PercentOfTeam { .. } => {
                    subcontract_cost(&lot.subcontract, team_cost)
                }
                _ => costs.subcontract_cost * share,
            };
            let total_cost = team_cost + governance_cost + risk_cost + subcontract_cost;
            let revenue = pnl.revenue * share;
            let inflation_index = if inflation.is_finite() {
                (1.0 + inflation / 100.0).powi(slice.index as i32)
            } else {
                1.0
            };
            YearPlan {
                team_cost,
                governance_cost,
                risk_cost,
                subcontract_cost,
                total_cost,
                revenue,
                margin: revenue - total_cost,
                inflation_index,
                inflated_total_cost: total_cost * inflation_index,
                slice,
            }
        })
        .collect()
}

fn missing_in(mix: &[MixEntry], catalog: &RateCatalog) -> Vec<String> {
    mix.iter()
        .filter(|e| catalog.get(&e.internal_profile_id).is_none())
        .map(|e| e.internal_profile_id.clone())
        .collect()
}

/// Run every calculator over `lot`. Never fails: out-of-range inputs are
/// clamped and problems are collected in `validation`.
pub fn compute_business_plan(lot: &LotConfig) -> BusinessPlan {
    let months = lot.duration.months();
    let settings = &lot.settings;
    let tolerance = settings.completeness_tolerance_pct;
    let economics = &lot.economics;
    let catalog = RateCatalog::new(&lot.catalog);

    let schedule = AdjustmentSchedule::new(&lot.volume_adjustments, months, settings.gap_policy);
    let known_tows: BTreeSet<&str> = lot.tows.iter().map(|t| t.tow_id.as_str()).collect();
    let mut members = team_effective_fte(&lot.team, &schedule, economics.reuse_factor_pct);
    for member in &mut members {
        member
            .tow_shares
            .retain(|id, _| known_tows.contains(id.as_str()));
    }
    let profile_rates: Vec<ProfileRate> = lot
        .team
        .iter()
        .map(|m| {
            resolve_profile_rate(
                &m.profile_id,
                lot.profile_mappings.get(&m.profile_id),
                &catalog,
                months,
                tolerance,
            )
        })
        .collect();
    let team_average_rate = team_average_rate(
        profile_rates
            .iter()
            .zip(&members)
            .map(|(rate, member)| (rate, member.base_fte)),
    );

    let priced: Vec<_> = members
        .iter()
        .zip(&profile_rates)
        .map(|(member, rate)| price_member(member, rate, months))
        .collect();
    let team_cost: f64 = priced.iter().map(|p| p.cost.cost).sum();
    let governance = governance_cost(
        &economics.governance,
        &GovernanceInputs {
            team_cost,
            total_team_fte: total_base_fte(&lot.team),
            catalog: &catalog,
            duration_months: months,
            days_per_fte: settings.days_per_fte,
            reuse_factor_pct: economics.reuse_factor_pct,
            tolerance,
        },
    );
    let governance_overlapped = matches!(
        governance.detail,
        GovernanceDetail::Fte {
            overlapped: true,
            ..
        }
    );
    let costs = aggregate_costs(
        &members,
        &priced,
        governance,
        economics.risk_contingency_pct,
        &lot.subcontract,
        &catalog,
        months,
    );

    let pnl = profit_and_loss(lot.base_amount, lot.discount_pct, costs.total_cost);
    let margin = margin_result(
        &pnl,
        economics.target_margin_pct,
        economics.risk_contingency_pct,
    );

    let effective_quantities: BTreeMap<String, f64> = lot
        .tows
        .iter()
        .filter_map(|t| {
            let base = t.kind.quantity()?;
            let reduced = effective_quantity(base, &schedule.tow_factors(&t.tow_id))
                .weighted_mean(|q| *q)
                .unwrap_or(non_negative(base));
            Some((t.tow_id.clone(), reduced))
        })
        .collect();
    let tows = tow_profitability(&TowInputs {
        tows: &lot.tows,
        members: &members,
        costs: &costs,
        total_revenue: pnl.revenue,
        effective_quantities: &effective_quantities,
    });
    let proposals = optimize(&tows, months);
    let yearly = yearly_projection(lot, &costs, &pnl);

    let validation = validation_report(lot, &catalog, &schedule, &profile_rates, governance_overlapped);
    for warning in validation.warnings() {
        warn!(lot = %lot.name, "{warning}");
    }

    info!(
        lot = %lot.name,
        months,
        team_cost = costs.team_cost,
        total_cost = costs.total_cost,
        revenue = pnl.revenue,
        margin_pct = pnl.margin_pct,
        proposals = proposals.len(),
        "business plan computed"
    );

    BusinessPlan {
        name: lot.name.clone(),
        duration_months: months,
        periods: resolve_periods(&lot.duration),
        members,
        profile_rates,
        team_average_rate,
        costs,
        pnl,
        margin,
        tows,
        proposals,
        yearly,
        validation,
    }
}

fn validation_report(
    lot: &LotConfig,
    catalog: &RateCatalog,
    schedule: &AdjustmentSchedule<'_>,
    profile_rates: &[ProfileRate],
    governance_overlapped: bool,
) -> ValidationReport {
    let tolerance = lot.settings.completeness_tolerance_pct;
    let known_tows: BTreeSet<&str> = lot.tows.iter().map(|t| t.tow_id.as_str()).collect();

    let allocated = lot.team.iter().flat_map(|m| {
        m.tow_allocation
            .iter()
            .filter(|(_, pct)| **pct > 0.0)
            .map(|(id, _)| id)
    });
    let adjusted = lot.volume_adjustments.iter().flat_map(|p| p.by_tow.keys());
    let unknown_tow_refs: BTreeSet<String> = allocated
        .chain(adjusted)
        .filter(|id| !known_tows.contains(id.as_str()))
        .cloned()
        .collect();

    let mut overlapping_periods = Vec::new();
    if schedule.overlapped() {
        overlapping_periods.push("volume_adjustments".to_string());
    }
    for rate in profile_rates.iter().filter(|r| r.overlapped) {
        overlapping_periods.push(format!("profile_mappings.{}", rate.client_profile_id));
    }
    if governance_overlapped {
        overlapping_periods.push("governance.periods".to_string());
    }

    let mut missing_rate_refs: BTreeSet<String> = profile_rates
        .iter()
        .flat_map(|r| r.missing_refs().map(str::to_string))
        .collect();
    match &lot.economics.governance.mode {
        GovernanceMode::Fte { periods } => {
            for p in periods {
                missing_rate_refs.extend(missing_in(&p.team_mix, catalog));
            }
        }
        GovernanceMode::TeamMix { team_mix, .. } => {
            missing_rate_refs.extend(missing_in(team_mix, catalog));
        }
        GovernanceMode::Percentage { .. } | GovernanceMode::Manual { .. } => {}
    }

    ValidationReport {
        tow_weights: tow_weight_check(&lot.tows, tolerance),
        allocations: allocation_checks(&lot.team, tolerance),
        mappings: profile_rates
            .iter()
            .map(|r| (r.client_profile_id.clone(), r.status))
            .collect(),
        overlapping_periods,
        missing_rate_refs,
        unclassified_seniority: lot
            .team
            .iter()
            .filter(|m| !m.seniority.is_classified())
            .map(|m| m.seniority.label().to_string())
            .collect(),
        unknown_tow_refs,
    }
}
