//! Profile mapping and blended daily rates.

use plan_core::{
    non_negative, MappingPeriod, MappingStatus, MixEntry, MonthRange, ProfileMapping, RateCatalog,
    Timeline,
};
use serde::Serialize;
use tracing::{debug, warn};

/// One resolvable internal profile inside a blended mix.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MixShare {
    pub internal_profile_id: String,
    /// Share of the blended rate, normalized over resolvable entries.
    pub weight: f64,
    pub daily_rate: f64,
}

/// Blended rate of a profile mix.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MixBlend {
    /// Σ(pct × rate) / Σ(pct) over entries found in the catalog.
    pub rate: f64,
    /// Raw Σ(pct) over every entry.
    pub total_pct: f64,
    /// |total_pct − 100| within tolerance.
    pub is_complete: bool,
    pub shares: Vec<MixShare>,
    /// Referenced internal profiles missing from the catalog.
    pub missing: Vec<String>,
}

impl MixBlend {
    /// At least one entry contributes to the rate.
    pub fn is_valid(&self) -> bool {
        !self.shares.is_empty()
    }
}

pub fn blend_mix(mix: &[MixEntry], catalog: &RateCatalog, tolerance: f64) -> MixBlend {
    let mut total_pct = 0.0;
    let mut found: Vec<(&str, f64, f64)> = Vec::new();
    let mut missing = Vec::new();
    for entry in mix {
        let pct = non_negative(entry.pct);
        total_pct += pct;
        match catalog.rate(&entry.internal_profile_id) {
            Some(rate) if pct > 0.0 => found.push((entry.internal_profile_id.as_str(), pct, rate)),
            Some(_) => {}
            None => missing.push(entry.internal_profile_id.clone()),
        }
    }
    let weight_total: f64 = found.iter().map(|(_, pct, _)| pct / 100.0).sum();
    let (rate, shares) = if weight_total > 0.0 {
        let rate = found
            .iter()
            .map(|(_, pct, rate)| pct / 100.0 * rate)
            .sum::<f64>()
            / weight_total;
        let shares = found
            .iter()
            .map(|(id, pct, rate)| MixShare {
                internal_profile_id: id.to_string(),
                weight: pct / 100.0 / weight_total,
                daily_rate: *rate,
            })
            .collect();
        (rate, shares)
    } else {
        (0.0, Vec::new())
    };
    MixBlend {
        rate,
        total_pct,
        is_complete: (total_pct - 100.0).abs() < tolerance,
        shares,
        missing,
    }
}

/// Rate of one mapping period after normalization onto contract months.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodRate {
    pub range: MonthRange,
    pub blend: MixBlend,
}

/// Resolved mapping of a client profile.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileRate {
    pub client_profile_id: String,
    pub status: MappingStatus,
    pub periods: Vec<PeriodRate>,
    pub covered_months: u32,
    /// Simple average of the valid periods' rates; display only.
    pub display_rate: f64,
    /// Mapping periods overlapped each other.
    pub overlapped: bool,
}

impl ProfileRate {
    pub fn has_valid_period(&self) -> bool {
        self.periods.iter().any(|p| p.blend.is_valid())
    }

    pub fn missing_refs(&self) -> impl Iterator<Item = &str> {
        self.periods
            .iter()
            .flat_map(|p| p.blend.missing.iter().map(String::as_str))
    }
}

/// Resolve a client profile's mapping into priced month periods.
///
/// Each period's rate is Σ internal daily_rate × pct/100 over its mix. A
/// period is valid when its mix sums to 100 within `tolerance`; later
/// periods win on overlapping months. Status is unmapped without a valid
/// period and incomplete when valid periods do not cover `duration`.
///
/// Example:
/// let r = resolve_profile_rate("dev", Some(&mapping), &catalog, 12, 1.0);
/// assert_eq!(r.status, MappingStatus::Complete);
/// assert_eq!(r.display_rate, 400.0);
pub fn resolve_profile_rate(
    client_profile_id: &str,
    mapping: Option<&ProfileMapping>,
    catalog: &RateCatalog,
    duration: u32,
    tolerance: f64,
) -> ProfileRate {
    let raw: &[MappingPeriod] = mapping.map(|m| m.periods.as_slice()).unwrap_or(&[]);
    let (timeline, overlapped) =
        Timeline::from_ranges(raw.iter().map(|p| (p.range(), p)), duration);
    let periods: Vec<PeriodRate> = timeline
        .segments()
        .map(|(range, p)| PeriodRate {
            range: *range,
            blend: blend_mix(&p.mix, catalog, tolerance),
        })
        .collect();
    let covered_months = timeline.covered_months();

    let status = if raw.is_empty() {
        MappingStatus::Unmapped
    } else if !periods.is_empty()
        && periods.iter().all(|p| p.blend.is_complete)
        && covered_months >= duration
    {
        MappingStatus::Complete
    } else {
        MappingStatus::Incomplete
    };

    let valid: Vec<f64> = periods
        .iter()
        .filter(|p| p.blend.is_valid())
        .map(|p| p.blend.rate)
        .collect();
    let display_rate = if valid.is_empty() {
        0.0
    } else {
        valid.iter().sum::<f64>() / valid.len() as f64
    };

    match status {
        MappingStatus::Unmapped => warn!(profile = client_profile_id, "profile is unmapped"),
        MappingStatus::Incomplete => warn!(
            profile = client_profile_id,
            covered_months, duration, "profile mapping is incomplete"
        ),
        MappingStatus::Complete => {
            debug!(profile = client_profile_id, display_rate, "profile mapping complete")
        }
    }

    ProfileRate {
        client_profile_id: client_profile_id.to_string(),
        status,
        periods,
        covered_months,
        display_rate,
        overlapped,
    }
}

/// FTE-weighted average of per-profile rates over profiles with at least one
/// valid period; 0 when no FTE qualifies.
pub fn team_average_rate<'a, I>(profiles: I) -> f64
where
    I: IntoIterator<Item = (&'a ProfileRate, f64)>,
{
    let mut num = 0.0;
    let mut den = 0.0;
    for (rate, fte) in profiles {
        if !rate.has_valid_period() {
            continue;
        }
        let fte = non_negative(fte);
        num += rate.display_rate * fte;
        den += fte;
    }
    plan_core::ratio(num, den)
}
