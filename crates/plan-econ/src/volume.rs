//! Volume adjustment engine: per-period reduction factors by profile and TOW.

use plan_core::{GapPolicy, MonthRange, Timeline, VolumeAdjustmentPeriod};
use tracing::{debug, warn};

/// What a factor is looked up for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustmentKey<'k> {
    Profile(&'k str),
    Tow(&'k str),
}

/// Clamp a factor into `[0, 1]`; non-finite means "no change".
pub fn clamp_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Factor for `key` in a period; `None` (implicit period) is 1.0.
pub fn resolve_factor(period: Option<&VolumeAdjustmentPeriod>, key: AdjustmentKey<'_>) -> f64 {
    let raw = period.and_then(|p| match key {
        AdjustmentKey::Profile(id) => p.by_profile.get(id),
        AdjustmentKey::Tow(id) => p.by_tow.get(id),
    });
    raw.copied().map(clamp_factor).unwrap_or(1.0)
}

/// Month-weighted average of a factor timeline, 1.0 when it covers nothing.
pub fn time_weighted_factor(factors: &Timeline<f64>) -> f64 {
    factors.weighted_mean(|f| *f).unwrap_or(1.0)
}

/// Volume adjustment periods normalized onto the contract months.
#[derive(Clone, Debug)]
pub struct AdjustmentSchedule<'a> {
    timeline: Timeline<Option<&'a VolumeAdjustmentPeriod>>,
    overlapped: bool,
}

impl<'a> AdjustmentSchedule<'a> {
    /// Without periods, one implicit period spans the whole duration at 1.0.
    pub fn new(periods: &'a [VolumeAdjustmentPeriod], duration: u32, policy: GapPolicy) -> Self {
        let (mut timeline, overlapped) =
            Timeline::from_ranges(periods.iter().map(|p| (p.range(), Some(p))), duration);
        if timeline.is_empty() {
            if !periods.is_empty() {
                warn!(
                    count = periods.len(),
                    duration, "no volume adjustment period falls inside the contract"
                );
            }
            timeline = Timeline::constant(duration, None);
        } else if policy == GapPolicy::Neutral {
            timeline.fill_gaps(duration, None);
        }
        debug!(
            segments = timeline.len(),
            covered = timeline.covered_months(),
            ?policy,
            "volume adjustment schedule"
        );
        Self {
            timeline,
            overlapped,
        }
    }

    pub fn timeline(&self) -> &Timeline<Option<&'a VolumeAdjustmentPeriod>> {
        &self.timeline
    }

    /// True when supplied periods overlapped each other.
    pub fn overlapped(&self) -> bool {
        self.overlapped
    }

    pub fn factors(&self, key: AdjustmentKey<'_>) -> Timeline<f64> {
        self.timeline.map(|p| resolve_factor(*p, key))
    }

    pub fn profile_factors(&self, profile_id: &str) -> Timeline<f64> {
        self.factors(AdjustmentKey::Profile(profile_id))
    }

    pub fn tow_factors(&self, tow_id: &str) -> Timeline<f64> {
        self.factors(AdjustmentKey::Tow(tow_id))
    }

    /// Time-weighted average factor for `key`.
    pub fn average_factor(&self, key: AdjustmentKey<'_>) -> f64 {
        time_weighted_factor(&self.factors(key))
    }

    /// Period ranges the schedule is made of.
    pub fn ranges(&self) -> Vec<MonthRange> {
        self.timeline.segments().map(|(r, _)| *r).collect()
    }
}

/// Reduced quantity per period: `base × factor`.
pub fn effective_quantity(base: f64, factors: &Timeline<f64>) -> Timeline<f64> {
    let base = plan_core::non_negative(base);
    factors.map(|f| base * f)
}
