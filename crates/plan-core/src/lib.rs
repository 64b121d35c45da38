#![deny(warnings)]

//! Core domain models and invariants for the bid business-plan engine.
//!
//! This crate defines the serializable lot configuration (team roster, TOW
//! buckets, profile mappings, rate catalog, economic parameters), the
//! piecewise month timeline every time-varying input is normalized into,
//! the yearly period resolver, currency rounding and validation helpers.

pub mod model;
pub mod money;
pub mod periods;
pub mod timeline;
pub mod validation;

pub use model::*;
pub use money::{clamp_pct, non_negative, ratio, round_money};
pub use periods::{calendar_years, contract_years, projection_years, resolve_periods, YearSlice};
pub use timeline::{MonthRange, Timeline};
pub use validation::{
    allocation_checks, tow_weight_check, validate_lot, MappingStatus, PercentCheck,
    ValidationError, ValidationReport, MAX_DURATION_MONTHS,
};
