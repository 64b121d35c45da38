#![deny(warnings)]

//! Business-plan calculators for a tender lot.
//!
//! The pipeline runs leaf-first: volume adjustments feed the team effective
//! FTE, profile mappings turn into blended rates, members are priced, then
//! governance, risk and subcontract are layered on top to form the cost
//! breakdown and the P&L. The margin simulator and the TOW mix optimizer
//! work on those results. [`compute_business_plan`] runs the whole pass and
//! is a pure function of the lot.

pub mod governance;
pub mod margin;
pub mod optimizer;
pub mod plan;
pub mod pnl;
pub mod rates;
pub mod team;
pub mod volume;

pub use governance::{governance_cost, GovernanceCost, GovernanceDetail, GovernanceInputs};
pub use margin::{break_even_discount, margin_result, simulate_discounts, suggested_discount, MarginResult};
pub use optimizer::{
    classify_status, optimize, propose, tow_profitability, OptimizationProposal, ProposalKind,
    ReallocationAction, SeniorityMix, TowProfitability, TowStatus,
};
pub use plan::{compute_business_plan, yearly_projection, BusinessPlan, PlanSummary, YearPlan};
pub use pnl::{
    aggregate_costs, profit_and_loss, CostBreakdown, MemberCost, ProfitAndLoss, TowCost,
    UNALLOCATED_TOW,
};
pub use rates::{blend_mix, resolve_profile_rate, team_average_rate, MixBlend, ProfileRate};
pub use team::{member_effective_fte, team_effective_fte, MemberFte};
pub use volume::{AdjustmentKey, AdjustmentSchedule};
