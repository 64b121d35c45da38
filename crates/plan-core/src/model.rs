//! Lot configuration: every input of a business-plan calculation pass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::timeline::MonthRange;

/// Working days per FTE-year used when nothing else is configured.
pub const DEFAULT_DAYS_PER_YEAR: f64 = 220.0;

fn default_days_per_year() -> f64 {
    DEFAULT_DAYS_PER_YEAR
}

fn default_tolerance() -> f64 {
    1.0
}

fn default_duration_months() -> u32 {
    12
}

/// Calendar month in which the contract starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarStart {
    pub year: i32,
    /// Month of year, 1..=12.
    pub month: u32,
}

impl CalendarStart {
    /// First day of the starting month, with the month clamped into 1..=12.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.clamp(1, 12), 1)
    }
}

/// Contract length with an optional calendar anchor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractDuration {
    /// Duration in months (>= 1).
    #[serde(default = "default_duration_months")]
    pub months: u32,
    /// Calendar start, when known.
    #[serde(default)]
    pub start: Option<CalendarStart>,
}

impl Default for ContractDuration {
    fn default() -> Self {
        Self {
            months: default_duration_months(),
            start: None,
        }
    }
}

impl ContractDuration {
    pub fn new(months: u32) -> Self {
        Self {
            months,
            start: None,
        }
    }

    /// Duration clamped to at least one month.
    pub fn months(&self) -> u32 {
        self.months.max(1)
    }

    pub fn years(&self) -> f64 {
        f64::from(self.months()) / 12.0
    }

    pub fn range(&self) -> MonthRange {
        MonthRange::full(self.months())
    }
}

/// Seniority of a team member.
///
/// Known labels map onto the closed set; free text goes through
/// [`Seniority::classify`] and anything it cannot place is kept as
/// `Unclassified` so callers can flag it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Expert,
    Unclassified(String),
}

/// Three-way bucket used by the resource-mix optimizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityBand {
    Junior,
    Mid,
    Senior,
}

const EXPERT_WORDS: &[&str] = &["expert"];
const SENIOR_WORDS: &[&str] = &["senior", "sr"];
const JUNIOR_WORDS: &[&str] = &["junior", "jr", "entry", "graduate", "trainee", "intern"];
const MID_WORDS: &[&str] = &["mid", "medior", "intermediate", "middle", "regular"];
const EXPERT_ROLES: &[&str] = &["principal", "architect", "partner", "director"];
const SENIOR_ROLES: &[&str] = &["lead", "manager"];

impl Seniority {
    /// Keyword classifier over a free-text label. Explicit level words win
    /// over role words, so "Junior Architect" is junior.
    pub fn classify(label: &str) -> Self {
        let lower = label.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let hit = |words: &[&str]| tokens.iter().any(|t| words.contains(t));
        if hit(EXPERT_WORDS) {
            Seniority::Expert
        } else if hit(SENIOR_WORDS) {
            Seniority::Senior
        } else if hit(JUNIOR_WORDS) {
            Seniority::Junior
        } else if hit(MID_WORDS) {
            Seniority::Mid
        } else if hit(EXPERT_ROLES) {
            Seniority::Expert
        } else if hit(SENIOR_ROLES) {
            Seniority::Senior
        } else {
            Seniority::Unclassified(label.trim().to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Seniority::Junior => "junior",
            Seniority::Mid => "mid",
            Seniority::Senior => "senior",
            Seniority::Expert => "expert",
            Seniority::Unclassified(s) => s,
        }
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, Seniority::Unclassified(_))
    }

    /// Optimizer bucket; unclassified labels count as mid.
    pub fn band(&self) -> SeniorityBand {
        match self {
            Seniority::Junior => SeniorityBand::Junior,
            Seniority::Senior | Seniority::Expert => SeniorityBand::Senior,
            Seniority::Mid | Seniority::Unclassified(_) => SeniorityBand::Mid,
        }
    }
}

impl From<String> for Seniority {
    fn from(label: String) -> Self {
        Seniority::classify(&label)
    }
}

impl From<Seniority> for String {
    fn from(s: Seniority) -> Self {
        s.label().to_string()
    }
}

/// A member of the delivery team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Client-side profile identifier, unique within the team.
    pub profile_id: String,
    #[serde(default)]
    pub label: String,
    pub seniority: Seniority,
    /// Base FTE (>= 0).
    pub fte: f64,
    #[serde(default = "default_days_per_year")]
    pub days_per_year: f64,
    /// TOW id -> allocation percentage.
    #[serde(default)]
    pub tow_allocation: BTreeMap<String, f64>,
}

/// Kind of a Type of Work and its quantity metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TowKind {
    Task { num_tasks: u32 },
    Corpo { duration_months: u32 },
    Consumo,
}

impl TowKind {
    /// Quantity used for unit economics; `None` for open-ended work.
    pub fn quantity(&self) -> Option<f64> {
        match self {
            TowKind::Task { num_tasks } => Some(f64::from(*num_tasks)),
            TowKind::Corpo { duration_months } => Some(f64::from(*duration_months)),
            TowKind::Consumo => None,
        }
    }
}

/// A Type of Work bucket with its share of revenue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowDefinition {
    pub tow_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub kind: TowKind,
    /// Share of revenue in percent.
    pub weight_pct: f64,
}

/// Multiplicative FTE/quantity reductions over a month range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeAdjustmentPeriod {
    pub month_start: u32,
    pub month_end: u32,
    /// Profile id -> factor (1.0 = no change).
    #[serde(default)]
    pub by_profile: BTreeMap<String, f64>,
    /// TOW id -> factor (1.0 = no change).
    #[serde(default)]
    pub by_tow: BTreeMap<String, f64>,
}

impl VolumeAdjustmentPeriod {
    pub fn range(&self) -> MonthRange {
        MonthRange::new(self.month_start, self.month_end)
    }
}

/// One internal profile and its weight inside a mix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixEntry {
    pub internal_profile_id: String,
    pub pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingPeriod {
    pub month_start: u32,
    pub month_end: u32,
    #[serde(default)]
    pub mix: Vec<MixEntry>,
}

impl MappingPeriod {
    pub fn range(&self) -> MonthRange {
        MonthRange::new(self.month_start, self.month_end)
    }
}

/// Time-varying mapping of a client profile onto internal profiles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMapping {
    #[serde(default)]
    pub periods: Vec<MappingPeriod>,
}

/// An internal (practice) profile with its daily rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternalProfile {
    /// Composite `practice:profile` key.
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Currency per day (>= 0).
    pub daily_rate: f64,
    #[serde(default)]
    pub practice: String,
}

impl InternalProfile {
    pub fn composite_id(practice: &str, profile: &str) -> String {
        format!("{practice}:{profile}")
    }
}

/// Read-only lookup over internal profiles.
#[derive(Clone, Debug, Default)]
pub struct RateCatalog {
    profiles: BTreeMap<String, InternalProfile>,
}

impl RateCatalog {
    pub fn new(profiles: &[InternalProfile]) -> Self {
        Self {
            profiles: profiles
                .iter()
                .map(|p| (p.id.clone(), p.clone()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&InternalProfile> {
        self.profiles.get(id)
    }

    /// Daily rate, clamped to >= 0 and 0 when non-finite.
    pub fn rate(&self, id: &str) -> Option<f64> {
        self.get(id).map(|p| {
            if p.daily_rate.is_finite() {
                p.daily_rate.max(0.0)
            } else {
                0.0
            }
        })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Governance FTE slice with its own profile mix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceFtePeriod {
    pub month_start: u32,
    pub month_end: u32,
    pub fte: f64,
    #[serde(default)]
    pub team_mix: Vec<MixEntry>,
}

impl GovernanceFtePeriod {
    pub fn range(&self) -> MonthRange {
        MonthRange::new(self.month_start, self.month_end)
    }
}

/// How governance cost is derived; each mode carries only its own fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GovernanceMode {
    /// Percentage of team cost.
    Percentage { percentage: f64 },
    /// Explicit FTE time slices, each with a profile mix.
    Fte {
        #[serde(default)]
        periods: Vec<GovernanceFtePeriod>,
    },
    /// Manual override.
    Manual { manual_cost: f64 },
    /// Notional FTE (percentage of team FTE) at a blended mix rate.
    TeamMix {
        percentage: f64,
        #[serde(default)]
        team_mix: Vec<MixEntry>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(flatten)]
    pub mode: GovernanceMode,
    /// Net the governance cost of the reuse factor.
    #[serde(default)]
    pub apply_reuse: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            mode: GovernanceMode::Percentage { percentage: 0.0 },
            apply_reuse: false,
        }
    }
}

/// Subcontracted cost on top of the internal team.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubcontractConfig {
    #[default]
    None,
    Fixed {
        amount: f64,
    },
    PercentOfTeam {
        pct: f64,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicParameters {
    #[serde(default)]
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub risk_contingency_pct: f64,
    #[serde(default)]
    pub reuse_factor_pct: f64,
    /// Yearly escalation applied in the yearly projection.
    #[serde(default)]
    pub inflation_pct: f64,
    #[serde(default)]
    pub target_margin_pct: f64,
}

/// Treatment of contract months not covered by any volume adjustment period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Only months inside supplied periods weigh in the averages.
    #[default]
    CoveredOnly,
    /// Uncovered months count with an implicit factor of 1.0.
    Neutral,
}

/// Engine-wide knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Working days per governance FTE-year.
    #[serde(default = "default_days_per_year")]
    pub days_per_fte: f64,
    #[serde(default)]
    pub gap_policy: GapPolicy,
    /// Allowed distance from 100 for a percentage sum to count as valid.
    #[serde(default = "default_tolerance")]
    pub completeness_tolerance_pct: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            days_per_fte: DEFAULT_DAYS_PER_YEAR,
            gap_policy: GapPolicy::default(),
            completeness_tolerance_pct: default_tolerance(),
        }
    }
}

/// Complete configuration of a tender lot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LotConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration: ContractDuration,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    #[serde(default)]
    pub tows: Vec<TowDefinition>,
    #[serde(default)]
    pub volume_adjustments: Vec<VolumeAdjustmentPeriod>,
    /// Client profile id -> mapping.
    #[serde(default)]
    pub profile_mappings: BTreeMap<String, ProfileMapping>,
    #[serde(default)]
    pub catalog: Vec<InternalProfile>,
    #[serde(default)]
    pub economics: EconomicParameters,
    /// Contract value before discount (already scaled to the bidder's share).
    #[serde(default)]
    pub base_amount: f64,
    #[serde(default)]
    pub discount_pct: f64,
    #[serde(default)]
    pub subcontract: SubcontractConfig,
    #[serde(default)]
    pub settings: EngineSettings,
}
