//! Governance cost under the four configurable modes.

use plan_core::{
    clamp_pct, non_negative, GovernanceConfig, GovernanceMode, MonthRange, RateCatalog, Timeline,
};
use serde::Serialize;
use tracing::debug;

use crate::rates::blend_mix;

/// Everything governance needs from the rest of the plan.
#[derive(Clone, Debug)]
pub struct GovernanceInputs<'a> {
    pub team_cost: f64,
    /// Σ base FTE of the team.
    pub total_team_fte: f64,
    pub catalog: &'a RateCatalog,
    pub duration_months: u32,
    pub days_per_fte: f64,
    pub reuse_factor_pct: f64,
    pub tolerance: f64,
}

/// Cost of one governance FTE slice.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GovernancePeriodCost {
    pub range: MonthRange,
    pub fte: f64,
    pub rate: f64,
    pub cost: f64,
    pub missing: Vec<String>,
}

/// How the base cost was obtained.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GovernanceDetail {
    Percentage { team_cost: f64, percentage: f64 },
    Fte { periods: Vec<GovernancePeriodCost>, overlapped: bool },
    Manual { manual_cost: f64 },
    TeamMix { fte: f64, rate: f64, years: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GovernanceCost {
    pub base_cost: f64,
    pub final_cost: f64,
    /// `base_cost − final_cost`.
    pub reuse_savings: f64,
    pub apply_reuse: bool,
    pub detail: GovernanceDetail,
}

impl GovernanceCost {
    /// Final cost spread over contract months. FTE slices stay on their own
    /// months; every other mode is spread evenly.
    pub fn monthly(&self, duration_months: u32) -> Vec<f64> {
        let n = duration_months.max(1) as usize;
        let mut out = vec![0.0; n];
        let scale = plan_core::ratio(self.final_cost, self.base_cost);
        match &self.detail {
            GovernanceDetail::Fte { periods, .. } => {
                for p in periods {
                    let per_month = p.cost * scale / f64::from(p.range.months().max(1));
                    for m in p.range.start..=p.range.end {
                        if let Some(slot) = out.get_mut(m as usize - 1) {
                            *slot += per_month;
                        }
                    }
                }
            }
            _ => {
                let per_month = self.final_cost / n as f64;
                out.iter_mut().for_each(|v| *v = per_month);
            }
        }
        out
    }
}

/// Governance cost for the configured mode.
///
/// - percentage: team_cost × pct/100
/// - manual: the given amount
/// - fte: Σ periods fte × blended rate × days_per_fte × years
/// - team_mix: (Σ base FTE × pct/100) × blended rate × days_per_fte × years
///
/// With `apply_reuse` the result is scaled by (1 − reuse/100).
///
/// Example:
/// let cfg = GovernanceConfig { mode: GovernanceMode::Percentage { percentage: 5.0 }, apply_reuse: false };
/// let g = governance_cost(&cfg, &GovernanceInputs { team_cost: 264_000.0, .. });
/// assert_eq!(g.final_cost, 13_200.0);
pub fn governance_cost(config: &GovernanceConfig, inputs: &GovernanceInputs<'_>) -> GovernanceCost {
    let days = non_negative(inputs.days_per_fte);
    let detail = match &config.mode {
        GovernanceMode::Percentage { percentage } => GovernanceDetail::Percentage {
            team_cost: inputs.team_cost,
            percentage: clamp_pct(*percentage),
        },
        GovernanceMode::Manual { manual_cost } => GovernanceDetail::Manual {
            manual_cost: non_negative(*manual_cost),
        },
        GovernanceMode::Fte { periods } => {
            let (timeline, overlapped) = Timeline::from_ranges(
                periods.iter().map(|p| (p.range(), p)),
                inputs.duration_months,
            );
            let periods = timeline
                .segments()
                .map(|(range, p)| {
                    let blend = blend_mix(&p.team_mix, inputs.catalog, inputs.tolerance);
                    let fte = non_negative(p.fte);
                    GovernancePeriodCost {
                        range: *range,
                        fte,
                        rate: blend.rate,
                        cost: fte * blend.rate * days * range.years(),
                        missing: blend.missing,
                    }
                })
                .collect();
            GovernanceDetail::Fte {
                periods,
                overlapped,
            }
        }
        GovernanceMode::TeamMix {
            percentage,
            team_mix,
        } => {
            let blend = blend_mix(team_mix, inputs.catalog, inputs.tolerance);
            GovernanceDetail::TeamMix {
                fte: non_negative(inputs.total_team_fte) * clamp_pct(*percentage) / 100.0,
                rate: blend.rate,
                years: f64::from(inputs.duration_months.max(1)) / 12.0,
            }
        }
    };

    let base_cost = match &detail {
        GovernanceDetail::Percentage {
            team_cost,
            percentage,
        } => non_negative(*team_cost) * percentage / 100.0,
        GovernanceDetail::Manual { manual_cost } => *manual_cost,
        GovernanceDetail::Fte { periods, .. } => periods.iter().map(|p| p.cost).sum::<f64>(),
        GovernanceDetail::TeamMix { fte, rate, years } => fte * days * years * rate,
    };
    let final_cost = if config.apply_reuse {
        base_cost * (1.0 - clamp_pct(inputs.reuse_factor_pct) / 100.0)
    } else {
        base_cost
    };
    debug!(base_cost, final_cost, apply_reuse = config.apply_reuse, "governance cost");

    GovernanceCost {
        base_cost,
        final_cost,
        reuse_savings: base_cost - final_cost,
        apply_reuse: config.apply_reuse,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{GovernanceFtePeriod, InternalProfile, MixEntry};
    use proptest::prelude::*;

    fn catalog() -> RateCatalog {
        RateCatalog::new(&[InternalProfile {
            id: "pmo:lead".into(),
            label: "PMO lead".into(),
            daily_rate: 600.0,
            practice: "pmo".into(),
        }])
    }

    fn inputs(catalog: &RateCatalog, reuse: f64) -> GovernanceInputs<'_> {
        GovernanceInputs {
            team_cost: 264_000.0,
            total_team_fte: 3.0,
            catalog,
            duration_months: 24,
            days_per_fte: 220.0,
            reuse_factor_pct: reuse,
            tolerance: 1.0,
        }
    }

    fn mix() -> Vec<MixEntry> {
        vec![MixEntry {
            internal_profile_id: "pmo:lead".into(),
            pct: 100.0,
        }]
    }

    fn cfg(mode: GovernanceMode, apply_reuse: bool) -> GovernanceConfig {
        GovernanceConfig { mode, apply_reuse }
    }

    #[test]
    fn percentage_mode() {
        let cat = catalog();
        let g = governance_cost(
            &cfg(GovernanceMode::Percentage { percentage: 5.0 }, false),
            &inputs(&cat, 0.0),
        );
        assert!((g.final_cost - 13_200.0).abs() < 1e-9);
        assert_eq!(g.reuse_savings, 0.0);
    }

    #[test]
    fn manual_mode_with_reuse() {
        let cat = catalog();
        let g = governance_cost(
            &cfg(GovernanceMode::Manual { manual_cost: 10_000.0 }, true),
            &inputs(&cat, 20.0),
        );
        assert_eq!(g.base_cost, 10_000.0);
        assert!((g.final_cost - 8_000.0).abs() < 1e-9);
        assert!((g.reuse_savings - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn fte_mode_per_slice() {
        let cat = catalog();
        let periods = vec![
            GovernanceFtePeriod {
                month_start: 1,
                month_end: 12,
                fte: 0.5,
                team_mix: mix(),
            },
            GovernanceFtePeriod {
                month_start: 13,
                month_end: 24,
                fte: 0.25,
                team_mix: mix(),
            },
        ];
        let g = governance_cost(&cfg(GovernanceMode::Fte { periods }, false), &inputs(&cat, 0.0));
        let expected = 0.5 * 600.0 * 220.0 + 0.25 * 600.0 * 220.0;
        assert!((g.base_cost - expected).abs() < 1e-6);
        let monthly = g.monthly(24);
        assert!((monthly[0] - 0.5 * 600.0 * 220.0 / 12.0).abs() < 1e-6);
        assert!((monthly[23] - 0.25 * 600.0 * 220.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn team_mix_mode() {
        let cat = catalog();
        let g = governance_cost(
            &cfg(
                GovernanceMode::TeamMix {
                    percentage: 10.0,
                    team_mix: mix(),
                },
                false,
            ),
            &inputs(&cat, 0.0),
        );
        // 0.3 FTE × 220 days × 2 years × 600
        assert!((g.base_cost - 0.3 * 220.0 * 2.0 * 600.0).abs() < 1e-6);
        let monthly = g.monthly(24);
        assert!((monthly.iter().sum::<f64>() - g.final_cost).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn reuse_never_increases_cost(manual in 0.0f64..1e6, reuse in 0.0f64..100.0, apply in proptest::bool::ANY) {
            let cat = catalog();
            let g = governance_cost(
                &cfg(GovernanceMode::Manual { manual_cost: manual }, apply),
                &inputs(&cat, reuse),
            );
            prop_assert!(g.final_cost <= g.base_cost);
            if !apply {
                prop_assert_eq!(g.final_cost, g.base_cost);
            }
        }
    }
}
