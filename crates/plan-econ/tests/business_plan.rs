use plan_core::{
    ContractDuration, GovernanceConfig, GovernanceMode, InternalProfile, LotConfig, MappingPeriod,
    MappingStatus, MixEntry, ProfileMapping, Seniority, TeamMember, TowDefinition, TowKind,
    VolumeAdjustmentPeriod,
};
use plan_econ::{compute_business_plan, propose, ProposalKind, TowStatus};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn member(id: &str, seniority: Seniority, fte: f64, alloc: &[(&str, f64)]) -> TeamMember {
    TeamMember {
        profile_id: id.into(),
        label: id.into(),
        seniority,
        fte,
        days_per_year: 220.0,
        tow_allocation: alloc.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

fn full_mapping(internal: &str, months: u32) -> ProfileMapping {
    ProfileMapping {
        periods: vec![MappingPeriod {
            month_start: 1,
            month_end: months,
            mix: vec![MixEntry {
                internal_profile_id: internal.into(),
                pct: 100.0,
            }],
        }],
    }
}

/// Two members at 400/day for a year, 5% governance, 3% risk, 10% discount.
fn reference_lot() -> LotConfig {
    let mut lot = LotConfig {
        name: "reference".into(),
        duration: ContractDuration::new(12),
        team: vec![
            member("analyst", Seniority::Senior, 1.0, &[("build", 100.0)]),
            member("developer", Seniority::Junior, 2.0, &[("build", 50.0), ("run", 50.0)]),
        ],
        tows: vec![
            TowDefinition {
                tow_id: "build".into(),
                label: "Build".into(),
                kind: TowKind::Task { num_tasks: 40 },
                weight_pct: 60.0,
            },
            TowDefinition {
                tow_id: "run".into(),
                label: "Run".into(),
                kind: TowKind::Corpo {
                    duration_months: 12,
                },
                weight_pct: 40.0,
            },
        ],
        catalog: vec![InternalProfile {
            id: "dev:consultant".into(),
            label: "Consultant".into(),
            daily_rate: 400.0,
            practice: "dev".into(),
        }],
        base_amount: 1_000_000.0,
        discount_pct: 10.0,
        ..LotConfig::default()
    };
    for id in ["analyst", "developer"] {
        lot.profile_mappings
            .insert(id.into(), full_mapping("dev:consultant", 12));
    }
    lot.economics.governance = GovernanceConfig {
        mode: GovernanceMode::Percentage { percentage: 5.0 },
        apply_reuse: false,
    };
    lot.economics.risk_contingency_pct = 3.0;
    lot.economics.target_margin_pct = 15.0;
    lot
}

#[test]
fn reference_scenario_costs_and_margin() {
    let plan = compute_business_plan(&reference_lot());
    let c = &plan.costs;
    assert!((c.team_cost - 264_000.0).abs() < 1e-6);
    assert!((c.governance_cost - 13_200.0).abs() < 1e-6);
    assert!((c.risk_cost - 8_316.0).abs() < 1e-6);
    assert_eq!(c.subcontract_cost, 0.0);
    assert!((c.total_cost - 285_516.0).abs() < 1e-6);
    assert!((plan.pnl.revenue - 900_000.0).abs() < 1e-6);
    assert!((plan.pnl.margin - 614_484.0).abs() < 1e-6);
    assert!((plan.pnl.margin_pct - 68.276).abs() < 1e-3);

    let s = plan.summary();
    assert_eq!(s.total_cost, Decimal::new(28_551_600, 2));
    assert_eq!(s.margin, Decimal::new(61_448_400, 2));
    assert_eq!(s.margin_pct, Decimal::new(6828, 2));
    assert_eq!(plan.team_average_rate, 400.0);
    assert!(plan.validation.is_clean(), "{:?}", plan.validation.warnings());
}

#[test]
fn reference_scenario_tows() {
    let plan = compute_business_plan(&reference_lot());
    let build = &plan.costs.by_tow["build"];
    // analyst 88,000 + half of developer 176,000
    assert!((build.team_cost - 176_000.0).abs() < 1e-6);
    let tow_total: f64 = plan.costs.by_tow.values().map(|t| t.total_cost).sum();
    assert!((tow_total - plan.costs.total_cost).abs() < 1e-6);

    let build = plan.tows.iter().find(|t| t.tow_id == "build").expect("build tow");
    assert!((build.revenue - 540_000.0).abs() < 1e-6);
    assert_eq!(build.status, TowStatus::Excellent);
    assert!((build.mix.senior_fte - 1.0).abs() < 1e-12);
    assert!((build.mix.junior_fte - 1.0).abs() < 1e-12);
    assert_eq!(build.effective_quantity, Some(40.0));
    assert!((build.unit_revenue.unwrap_or_default() - 13_500.0).abs() < 1e-6);

    let run = plan.tows.iter().find(|t| t.tow_id == "run").expect("run tow");
    assert_eq!(run.quantity, Some(12.0));
    // junior-only TOW at 40% weight: absorb capacity and shift 10 points to senior
    let proposal = propose(run, plan.duration_months);
    assert_eq!(proposal.kind, ProposalKind::Absorb);
    assert!((proposal.proposed.senior_pct - 10.0).abs() < 1e-9);
    // a 0.1 FTE shift with no savings is not worth surfacing
    assert!(!proposal.is_actionable());
    assert!(plan.proposals.iter().all(|p| p.tow_id != "run"));
}

#[test]
fn break_even_at_ten_percent() {
    let mut lot = reference_lot();
    lot.economics.governance.mode = GovernanceMode::Manual {
        manual_cost: 636_000.0,
    };
    lot.economics.risk_contingency_pct = 0.0;
    let plan = compute_business_plan(&lot);
    assert!((plan.costs.total_cost - 900_000.0).abs() < 1e-6);
    assert!((plan.margin.break_even_discount_pct - 10.0).abs() < 1e-9);
    assert!(plan.pnl.margin.abs() < 1e-6);
    assert!(plan.margin.target_unreachable);
    assert!(plan.margin.suggested_discount_pct <= plan.margin.break_even_discount_pct);
}

#[test]
fn pipeline_is_idempotent() {
    let lot = reference_lot();
    let a = compute_business_plan(&lot);
    let b = compute_business_plan(&lot);
    assert_eq!(a.costs, b.costs);
    assert_eq!(a.margin, b.margin);
    assert_eq!(a, b);
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn mapping_completeness_drives_status() {
    let mut lot = reference_lot();
    lot.profile_mappings.get_mut("analyst").expect("analyst").periods[0].mix[0].pct = 99.0;
    lot.profile_mappings.remove("developer");
    let plan = compute_business_plan(&lot);
    assert_eq!(plan.validation.mappings["analyst"], MappingStatus::Incomplete);
    assert_eq!(plan.validation.mappings["developer"], MappingStatus::Unmapped);
    // unmapped member contributes no team cost
    assert!((plan.costs.team_cost - 88_000.0).abs() < 1e-6);
    assert_eq!(plan.validation.warnings().len(), 2);
}

#[test]
fn volume_reductions_and_overlaps() {
    let mut lot = reference_lot();
    lot.volume_adjustments = vec![
        VolumeAdjustmentPeriod {
            month_start: 1,
            month_end: 6,
            by_profile: [("developer".to_string(), 0.5)].into_iter().collect(),
            by_tow: BTreeMap::new(),
        },
        VolumeAdjustmentPeriod {
            month_start: 4,
            month_end: 12,
            by_profile: BTreeMap::new(),
            by_tow: [("build".to_string(), 0.5)].into_iter().collect(),
        },
    ];
    let plan = compute_business_plan(&lot);
    assert_eq!(plan.validation.overlapping_periods, vec!["volume_adjustments".to_string()]);
    let dev = &plan.members[1];
    // months 1-3: 2 × 0.5; months 4-12: 2 × (0.5 × 0.5 + 0.5 × 1.0)
    let expected = (1.0 * 3.0 + 1.5 * 9.0) / 12.0;
    assert!((dev.avg_effective_fte - expected).abs() < 1e-12);
    assert!(dev.avg_effective_fte <= dev.base_fte);
    let build = plan.tows.iter().find(|t| t.tow_id == "build").expect("build tow");
    assert!((build.effective_quantity.unwrap_or_default() - 40.0 * (3.0 + 0.5 * 9.0) / 12.0).abs() < 1e-9);
}

#[test]
fn lot_from_json() {
    let raw = r#"{
        "name": "json lot",
        "duration": { "months": 24, "start": { "year": 2026, "month": 7 } },
        "team": [
            { "profile_id": "pm", "label": "PM", "seniority": "Senior Manager", "fte": 0.5,
              "tow_allocation": { "gov": 100 } }
        ],
        "tows": [ { "tow_id": "gov", "type": "consumo", "weight_pct": 100 } ],
        "profile_mappings": {
            "pm": { "periods": [ { "month_start": 1, "month_end": 24,
                                   "mix": [ { "internal_profile_id": "pmo:pm", "pct": 100 } ] } ] }
        },
        "catalog": [ { "id": "pmo:pm", "label": "PM", "daily_rate": 600, "practice": "pmo" } ],
        "economics": { "governance": { "mode": "manual", "manual_cost": 5000 }, "inflation_pct": 2.0 },
        "base_amount": 200000
    }"#;
    let lot: LotConfig = serde_json::from_str(raw).expect("lot parses");
    let plan = compute_business_plan(&lot);
    assert!((plan.costs.team_cost - 0.5 * 600.0 * 220.0 * 2.0).abs() < 1e-6);
    assert_eq!(plan.costs.governance_cost, 5_000.0);
    assert_eq!(plan.yearly.len(), 3);
    assert_eq!(plan.yearly[0].slice.months, 6);
    assert_eq!(plan.tows[0].unit_cost, None);
    assert!(plan.validation.is_clean());
}

#[test]
fn misspelled_tow_is_flagged_and_cost_kept() {
    let mut lot = reference_lot();
    lot.team[0].tow_allocation = [("build".to_string(), 50.0), ("bulid".to_string(), 50.0)]
        .into_iter()
        .collect();
    let plan = compute_business_plan(&lot);
    assert!(!plan.validation.is_clean());
    assert!(plan.validation.unknown_tow_refs.contains("bulid"));
    assert!(plan
        .validation
        .warnings()
        .iter()
        .any(|w| w.contains("unknown TOW bulid")));

    let c = &plan.costs;
    assert!(!c.by_tow.contains_key("bulid"));
    // half of the analyst's 88,000
    assert!((c.unallocated.team_cost - 44_000.0).abs() < 1e-6);
    let tow_cost: f64 = plan.tows.iter().map(|t| t.cost).sum();
    assert!((tow_cost + c.unallocated.total_cost - c.total_cost).abs() < 1e-6);
}
