//! Structural validation (hard errors) and percentage-sum signals (soft).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::{LotConfig, TeamMember, TowDefinition};

/// Longest contract accepted; monthly series are allocated per month.
pub const MAX_DURATION_MONTHS: u32 = 1200;

/// Problems clamping cannot repair.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("duplicate team member profile id: {0}")]
    DuplicateMember(String),
    #[error("duplicate TOW id: {0}")]
    DuplicateTow(String),
    #[error("duplicate internal profile id: {0}")]
    DuplicateInternalProfile(String),
    /// Calendar start month outside 1..=12.
    #[error("calendar start month {0} is outside 1..=12")]
    InvalidStartMonth(u32),
    /// Numeric field must be finite.
    #[error("non-finite numeric value in {0}")]
    NonFinite(String),
    #[error("contract duration of {0} months exceeds {MAX_DURATION_MONTHS}")]
    ImplausibleDuration(u32),
}

/// Result of checking that a set of percentages adds up to 100.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentCheck {
    pub total: f64,
    pub is_valid: bool,
}

impl PercentCheck {
    pub fn of<I>(values: I, tolerance: f64) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let total: f64 = values.into_iter().filter(|v| v.is_finite()).sum();
        Self {
            total,
            is_valid: (total - 100.0).abs() < tolerance,
        }
    }
}

/// Completeness of a client profile mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    Unmapped,
    Incomplete,
    Complete,
}

/// Every soft signal raised during a calculation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub tow_weights: PercentCheck,
    /// Members with a non-zero allocation only.
    pub allocations: BTreeMap<String, PercentCheck>,
    pub mappings: BTreeMap<String, MappingStatus>,
    /// Inputs whose month ranges overlapped (later entry won).
    pub overlapping_periods: Vec<String>,
    pub missing_rate_refs: BTreeSet<String>,
    pub unclassified_seniority: Vec<String>,
    /// Allocation or volume-adjustment keys naming no defined TOW.
    #[serde(default)]
    pub unknown_tow_refs: BTreeSet<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.tow_weights.is_valid
            && self.allocations.values().all(|c| c.is_valid)
            && self
                .mappings
                .values()
                .all(|s| *s == MappingStatus::Complete)
            && self.overlapping_periods.is_empty()
            && self.missing_rate_refs.is_empty()
            && self.unclassified_seniority.is_empty()
            && self.unknown_tow_refs.is_empty()
    }

    /// One line per problem, suitable for display as warnings.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.tow_weights.is_valid {
            out.push(format!(
                "TOW weights sum to {:.2}%, expected 100%",
                self.tow_weights.total
            ));
        }
        for (id, check) in &self.allocations {
            if !check.is_valid {
                out.push(format!(
                    "allocation of {id} sums to {:.2}%, expected 100%",
                    check.total
                ));
            }
        }
        for (id, status) in &self.mappings {
            match status {
                MappingStatus::Complete => {}
                MappingStatus::Unmapped => out.push(format!("profile {id} is unmapped")),
                MappingStatus::Incomplete => {
                    out.push(format!("mapping of profile {id} is incomplete"))
                }
            }
        }
        for what in &self.overlapping_periods {
            out.push(format!("overlapping periods in {what}"));
        }
        for id in &self.missing_rate_refs {
            out.push(format!("internal profile {id} not found in catalog"));
        }
        for label in &self.unclassified_seniority {
            out.push(format!("unclassified seniority label: {label}"));
        }
        for id in &self.unknown_tow_refs {
            out.push(format!("allocation or adjustment references unknown TOW {id}"));
        }
        out
    }
}

pub fn tow_weight_check(tows: &[TowDefinition], tolerance: f64) -> PercentCheck {
    PercentCheck::of(tows.iter().map(|t| t.weight_pct), tolerance)
}

/// Allocation checks for members with any non-zero allocation.
pub fn allocation_checks(team: &[TeamMember], tolerance: f64) -> BTreeMap<String, PercentCheck> {
    team.iter()
        .filter(|m| m.tow_allocation.values().any(|p| *p != 0.0))
        .map(|m| {
            (
                m.profile_id.clone(),
                PercentCheck::of(m.tow_allocation.values().copied(), tolerance),
            )
        })
        .collect()
}

fn finite(value: f64, what: impl FnOnce() -> String) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite(what()))
    }
}

/// Validate identifiers and numeric sanity of a lot.
pub fn validate_lot(lot: &LotConfig) -> Result<(), ValidationError> {
    if lot.duration.months > MAX_DURATION_MONTHS {
        return Err(ValidationError::ImplausibleDuration(lot.duration.months));
    }
    if let Some(start) = &lot.duration.start {
        if !(1..=12).contains(&start.month) {
            return Err(ValidationError::InvalidStartMonth(start.month));
        }
    }
    finite(lot.base_amount, || "base_amount".into())?;
    finite(lot.discount_pct, || "discount_pct".into())?;

    let mut seen = BTreeSet::new();
    for m in &lot.team {
        if !seen.insert(m.profile_id.as_str()) {
            return Err(ValidationError::DuplicateMember(m.profile_id.clone()));
        }
        finite(m.fte, || format!("team.{}.fte", m.profile_id))?;
        finite(m.days_per_year, || format!("team.{}.days_per_year", m.profile_id))?;
        for (tow, pct) in &m.tow_allocation {
            finite(*pct, || format!("team.{}.tow_allocation.{tow}", m.profile_id))?;
        }
    }

    let mut seen = BTreeSet::new();
    for t in &lot.tows {
        if !seen.insert(t.tow_id.as_str()) {
            return Err(ValidationError::DuplicateTow(t.tow_id.clone()));
        }
        finite(t.weight_pct, || format!("tows.{}.weight_pct", t.tow_id))?;
    }

    let mut seen = BTreeSet::new();
    for p in &lot.catalog {
        if !seen.insert(p.id.as_str()) {
            return Err(ValidationError::DuplicateInternalProfile(p.id.clone()));
        }
        finite(p.daily_rate, || format!("catalog.{}.daily_rate", p.id))?;
    }

    let e = &lot.economics;
    finite(e.risk_contingency_pct, || "economics.risk_contingency_pct".into())?;
    finite(e.reuse_factor_pct, || "economics.reuse_factor_pct".into())?;
    finite(e.inflation_pct, || "economics.inflation_pct".into())?;
    finite(e.target_margin_pct, || "economics.target_margin_pct".into())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CalendarStart, InternalProfile, Seniority, TowKind};
    use proptest::prelude::*;

    fn member(id: &str, alloc: &[(&str, f64)]) -> TeamMember {
        TeamMember {
            profile_id: id.to_string(),
            label: id.to_string(),
            seniority: Seniority::Mid,
            fte: 1.0,
            days_per_year: 220.0,
            tow_allocation: alloc.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn tow(id: &str, weight: f64) -> TowDefinition {
        TowDefinition {
            tow_id: id.to_string(),
            label: id.to_string(),
            kind: TowKind::Consumo,
            weight_pct: weight,
        }
    }

    #[test]
    fn percent_check_tolerance() {
        assert!(PercentCheck::of([60.0, 40.0], 1.0).is_valid);
        assert!(PercentCheck::of([60.0, 39.5], 1.0).is_valid);
        assert!(!PercentCheck::of([60.0, 39.0], 1.0).is_valid);
    }

    #[test]
    fn allocation_checks_skip_unallocated_members() {
        let team = vec![
            member("a", &[("x", 50.0), ("y", 30.0)]),
            member("b", &[]),
            member("c", &[("x", 100.0)]),
        ];
        let checks = allocation_checks(&team, 1.0);
        assert_eq!(checks.len(), 2);
        assert!(!checks["a"].is_valid);
        assert_eq!(checks["a"].total, 80.0);
        assert!(checks["c"].is_valid);
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut lot = LotConfig {
            team: vec![member("a", &[]), member("a", &[])],
            ..LotConfig::default()
        };
        assert_eq!(
            validate_lot(&lot),
            Err(ValidationError::DuplicateMember("a".into()))
        );
        lot.team.pop();
        lot.tows = vec![tow("t", 50.0), tow("t", 50.0)];
        assert_eq!(validate_lot(&lot), Err(ValidationError::DuplicateTow("t".into())));
        lot.tows.pop();
        let p = InternalProfile {
            id: "dev:sr".into(),
            label: String::new(),
            daily_rate: 400.0,
            practice: "dev".into(),
        };
        lot.catalog = vec![p.clone(), p];
        assert_eq!(
            validate_lot(&lot),
            Err(ValidationError::DuplicateInternalProfile("dev:sr".into()))
        );
    }

    #[test]
    fn bad_start_month_and_nan() {
        let mut lot = LotConfig::default();
        lot.duration.start = Some(CalendarStart {
            year: 2025,
            month: 13,
        });
        assert_eq!(validate_lot(&lot), Err(ValidationError::InvalidStartMonth(13)));
        lot.duration.start = None;
        lot.base_amount = f64::NAN;
        assert!(matches!(validate_lot(&lot), Err(ValidationError::NonFinite(_))));
    }

    #[test]
    fn report_warnings_list_problems() {
        let report = ValidationReport {
            tow_weights: PercentCheck::of([90.0], 1.0),
            allocations: BTreeMap::new(),
            mappings: [("dev".to_string(), MappingStatus::Unmapped)].into_iter().collect(),
            overlapping_periods: vec![],
            missing_rate_refs: BTreeSet::new(),
            unclassified_seniority: vec![],
            unknown_tow_refs: ["bulid".to_string()].into_iter().collect(),
        };
        assert!(!report.is_clean());
        let w = report.warnings();
        assert_eq!(w.len(), 3);
        assert!(w[0].contains("90.00"));
        assert!(w[2].contains("unknown TOW bulid"));
    }

    #[test]
    fn implausible_duration_is_rejected() {
        let mut lot = LotConfig::default();
        lot.duration.months = MAX_DURATION_MONTHS;
        assert_eq!(validate_lot(&lot), Ok(()));
        lot.duration.months = 1_000_000_000;
        assert_eq!(
            validate_lot(&lot),
            Err(ValidationError::ImplausibleDuration(1_000_000_000))
        );
    }

    proptest! {
        #[test]
        fn split_of_hundred_is_valid(a in 0.0f64..100.0) {
            prop_assert!(PercentCheck::of([a, 100.0 - a], 1.0).is_valid);
        }
    }
}
