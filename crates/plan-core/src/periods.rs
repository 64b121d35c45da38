//! Splitting a contract into yearly slices.

use chrono::{Datelike, Months};
use serde::{Deserialize, Serialize};

use crate::model::{CalendarStart, ContractDuration};
use crate::timeline::MonthRange;

/// One year-long (or shorter) piece of the contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearSlice {
    /// Position in the contract, starting at 0.
    pub index: u32,
    /// Calendar year; `None` for unlabeled contract years.
    pub year: Option<i32>,
    pub months: u32,
    pub start_month_in_year: u32,
    pub end_month_in_year: u32,
    /// Contract months covered by this slice.
    pub range: MonthRange,
}

/// Calendar-year breakdown of `months` starting at `start`.
///
/// December rolls over into January of the next year. The months of the
/// output always add up to `months`.
pub fn calendar_years(months: u32, start: &CalendarStart) -> Vec<YearSlice> {
    let Some(mut cursor) = start.first_day() else {
        return vec![unlabeled(0, 1, months)];
    };
    let mut out = Vec::new();
    let mut offset = 0u32;
    while offset < months {
        let month = cursor.month();
        let take = (13 - month).min(months - offset);
        out.push(YearSlice {
            index: out.len() as u32,
            year: Some(cursor.year()),
            months: take,
            start_month_in_year: month,
            end_month_in_year: month + take - 1,
            range: MonthRange::new(offset + 1, offset + take),
        });
        offset += take;
        match cursor.checked_add_months(Months::new(take)) {
            Some(next) => cursor = next,
            None => {
                if offset < months {
                    out.push(unlabeled(out.len() as u32, offset + 1, months));
                }
                break;
            }
        }
    }
    out
}

/// Consecutive 12-month contract years, the last one possibly shorter.
pub fn contract_years(months: u32) -> Vec<YearSlice> {
    let months = months.max(1);
    (0..months.div_ceil(12))
        .map(|i| {
            let first = i * 12 + 1;
            unlabeled(i, first, (first + 11).min(months))
        })
        .collect()
}

/// Time-period resolution: calendar years when the start is known,
/// otherwise the whole duration as a single unlabeled period.
pub fn resolve_periods(duration: &ContractDuration) -> Vec<YearSlice> {
    match &duration.start {
        Some(start) => calendar_years(duration.months(), start),
        None => vec![unlabeled(0, 1, duration.months())],
    }
}

/// Slices used for the yearly projection: calendar years when the start is
/// known, contract years otherwise.
pub fn projection_years(duration: &ContractDuration) -> Vec<YearSlice> {
    match &duration.start {
        Some(start) => calendar_years(duration.months(), start),
        None => contract_years(duration.months()),
    }
}

fn unlabeled(index: u32, first: u32, last: u32) -> YearSlice {
    let range = MonthRange::new(first, last);
    YearSlice {
        index,
        year: None,
        months: range.months(),
        start_month_in_year: 1,
        end_month_in_year: range.months(),
        range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn november_start_rolls_over() {
        let slices = calendar_years(
            16,
            &CalendarStart {
                year: 2025,
                month: 11,
            },
        );
        let summary: Vec<_> = slices
            .iter()
            .map(|s| (s.year, s.months, s.start_month_in_year, s.end_month_in_year))
            .collect();
        assert_eq!(
            summary,
            vec![(Some(2025), 2, 11, 12), (Some(2026), 12, 1, 12), (Some(2027), 2, 1, 2)]
        );
        assert_eq!(slices[2].range, MonthRange::new(15, 16));
    }

    #[test]
    fn unknown_start_is_single_period() {
        let slices = resolve_periods(&ContractDuration::new(30));
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].year, None);
        assert_eq!(slices[0].months, 30);
    }

    #[test]
    fn contract_years_split() {
        let slices = contract_years(30);
        assert_eq!(
            slices.iter().map(|s| s.months).collect::<Vec<_>>(),
            vec![12, 12, 6]
        );
        assert_eq!(slices[2].range, MonthRange::new(25, 30));
    }

    proptest! {
        #[test]
        fn calendar_slices_partition_duration(months in 1u32..240, year in 1990i32..2100, month in 1u32..=12) {
            let slices = calendar_years(months, &CalendarStart { year, month });
            prop_assert_eq!(slices.iter().map(|s| s.months).sum::<u32>(), months);
            let mut next = 1;
            for s in &slices {
                prop_assert_eq!(s.range.start, next);
                prop_assert_eq!(s.range.months(), s.months);
                next = s.range.end + 1;
            }
        }
    }
}
