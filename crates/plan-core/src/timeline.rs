//! Piecewise month timeline shared by every time-varying input.
//!
//! Volume adjustments, profile mappings and governance FTE slices are all
//! "lists of month ranges". They are normalized here into an ordered,
//! non-overlapping interval map over 1-based contract months, with a single
//! time-weighted reducer.

use serde::{Deserialize, Serialize};

/// Inclusive, 1-based range of contract months.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthRange {
    /// First month (1-based, inclusive).
    pub start: u32,
    /// Last month (1-based, inclusive).
    pub end: u32,
}

impl MonthRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Range covering a whole contract of `duration` months.
    pub fn full(duration: u32) -> Self {
        Self::new(1, duration.max(1))
    }

    /// Number of months in the range; zero when `end < start`.
    pub fn months(&self) -> u32 {
        if self.end >= self.start {
            self.end - self.start + 1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.months() == 0
    }

    pub fn contains(&self, month: u32) -> bool {
        month >= self.start && month <= self.end
    }

    /// Clamp into `[1, duration]`. Returns `None` when nothing is left.
    pub fn clamp_to(&self, duration: u32) -> Option<MonthRange> {
        let start = self.start.max(1);
        let end = self.end.min(duration);
        (start <= end).then_some(MonthRange::new(start, end))
    }

    pub fn intersect(&self, other: &MonthRange) -> Option<MonthRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(MonthRange::new(start, end))
    }

    /// Fraction of a year spanned by the range.
    pub fn years(&self) -> f64 {
        f64::from(self.months()) / 12.0
    }
}

/// Ordered, non-overlapping map from month ranges to values.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline<T> {
    segments: Vec<(MonthRange, T)>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { segments: Vec::new() }
    }
}

impl<T: Clone> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single segment covering the whole contract.
    pub fn constant(duration: u32, value: T) -> Self {
        Self {
            segments: vec![(MonthRange::full(duration), value)],
        }
    }

    /// Build from raw ranges, clamping each into the contract.
    ///
    /// Later entries override earlier ones on overlapping months. The second
    /// element of the result is true when any override happened.
    pub fn from_ranges<I>(entries: I, duration: u32) -> (Self, bool)
    where
        I: IntoIterator<Item = (MonthRange, T)>,
    {
        let mut timeline = Self::new();
        let mut overlapped = false;
        for (range, value) in entries {
            if let Some(range) = range.clamp_to(duration) {
                overlapped |= timeline.insert(range, value);
            }
        }
        (timeline, overlapped)
    }

    /// Insert a segment, carving it out of whatever it overlaps.
    /// Returns true when existing months were displaced.
    pub fn insert(&mut self, range: MonthRange, value: T) -> bool {
        if range.is_empty() {
            return false;
        }
        let mut displaced = false;
        let mut kept = Vec::with_capacity(self.segments.len() + 2);
        for (r, v) in self.segments.drain(..) {
            if r.end < range.start || r.start > range.end {
                kept.push((r, v));
                continue;
            }
            displaced = true;
            let left = (r.start < range.start).then(|| MonthRange::new(r.start, range.start - 1));
            let right = (r.end > range.end).then(|| MonthRange::new(range.end + 1, r.end));
            match (left, right) {
                (Some(l), Some(rr)) => {
                    kept.push((l, v.clone()));
                    kept.push((rr, v));
                }
                (Some(l), None) => kept.push((l, v)),
                (None, Some(rr)) => kept.push((rr, v)),
                (None, None) => {}
            }
        }
        kept.push((range, value));
        kept.sort_by_key(|(r, _)| r.start);
        self.segments = kept;
        displaced
    }

    /// Fill every uncovered month of `[1, duration]` with `value`.
    pub fn fill_gaps(&mut self, duration: u32, value: T) {
        for gap in self.gaps(duration) {
            self.insert(gap, value.clone());
        }
    }

    /// Map values, keeping the ranges.
    pub fn map<U, F>(&self, mut f: F) -> Timeline<U>
    where
        F: FnMut(&T) -> U,
    {
        Timeline {
            segments: self.segments.iter().map(|(r, v)| (*r, f(v))).collect(),
        }
    }
}

impl<T> Timeline<T> {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> impl Iterator<Item = (&MonthRange, &T)> {
        self.segments.iter().map(|(r, v)| (r, v))
    }

    pub fn value_at(&self, month: u32) -> Option<&T> {
        self.segments
            .iter()
            .find(|(r, _)| r.contains(month))
            .map(|(_, v)| v)
    }

    /// Total months carrying a value.
    pub fn covered_months(&self) -> u32 {
        self.segments.iter().map(|(r, _)| r.months()).sum()
    }

    /// Uncovered ranges within `[1, duration]`.
    pub fn gaps(&self, duration: u32) -> Vec<MonthRange> {
        let mut gaps = Vec::new();
        let mut cursor = 1u32;
        for (r, _) in &self.segments {
            if r.start > cursor {
                gaps.push(MonthRange::new(cursor, r.start - 1));
            }
            cursor = cursor.max(r.end.saturating_add(1));
        }
        if cursor <= duration {
            gaps.push(MonthRange::new(cursor, duration));
        }
        gaps
    }

    /// Partition `range` into consecutive pieces, each either inside a
    /// segment (`Some(value)`) or a gap (`None`).
    pub fn pieces(&self, range: MonthRange) -> Vec<(MonthRange, Option<&T>)> {
        let mut out = Vec::new();
        let mut cursor = range.start;
        for (r, v) in &self.segments {
            let Some(hit) = r.intersect(&range) else {
                continue;
            };
            if hit.start > cursor {
                out.push((MonthRange::new(cursor, hit.start - 1), None));
            }
            out.push((hit, Some(v)));
            cursor = hit.end + 1;
        }
        if cursor <= range.end {
            out.push((MonthRange::new(cursor, range.end), None));
        }
        out
    }

    /// Month-weighted mean: Σ(f(v) × months) / Σ(months).
    /// `None` when the timeline covers no months.
    pub fn weighted_mean<F>(&self, mut f: F) -> Option<f64>
    where
        F: FnMut(&T) -> f64,
    {
        let mut num = 0.0;
        let mut den = 0u32;
        for (r, v) in &self.segments {
            let m = r.months();
            num += f(v) * f64::from(m);
            den += m;
        }
        (den > 0).then(|| num / f64::from(den))
    }

    /// Σ(f(range, v)) over segments.
    pub fn sum_by<F>(&self, mut f: F) -> f64
    where
        F: FnMut(&MonthRange, &T) -> f64,
    {
        self.segments.iter().map(|(r, v)| f(r, v)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn range_months_and_clamp() {
        assert_eq!(MonthRange::new(3, 5).months(), 3);
        assert_eq!(MonthRange::new(5, 3).months(), 0);
        assert_eq!(
            MonthRange::new(0, 40).clamp_to(36),
            Some(MonthRange::new(1, 36))
        );
        assert_eq!(MonthRange::new(37, 40).clamp_to(36), None);
    }

    #[test]
    fn later_entry_overrides_overlap() {
        let (t, overlapped) = Timeline::from_ranges(
            vec![
                (MonthRange::new(1, 12), 'a'),
                (MonthRange::new(6, 8), 'b'),
            ],
            12,
        );
        assert!(overlapped);
        let segs: Vec<_> = t.segments().map(|(r, v)| (*r, *v)).collect();
        assert_eq!(
            segs,
            vec![
                (MonthRange::new(1, 5), 'a'),
                (MonthRange::new(6, 8), 'b'),
                (MonthRange::new(9, 12), 'a'),
            ]
        );
        assert_eq!(t.covered_months(), 12);
    }

    #[test]
    fn gaps_and_pieces() {
        let (t, overlapped) = Timeline::from_ranges(
            vec![(MonthRange::new(3, 4), 1.0), (MonthRange::new(8, 9), 2.0)],
            10,
        );
        assert!(!overlapped);
        assert_eq!(
            t.gaps(10),
            vec![
                MonthRange::new(1, 2),
                MonthRange::new(5, 7),
                MonthRange::new(10, 10)
            ]
        );
        let pieces = t.pieces(MonthRange::new(2, 8));
        assert_eq!(pieces.len(), 4);
        assert_eq!(pieces[0], (MonthRange::new(2, 2), None));
        assert_eq!(pieces[1], (MonthRange::new(3, 4), Some(&1.0)));
        assert_eq!(pieces[2], (MonthRange::new(5, 7), None));
        assert_eq!(pieces[3], (MonthRange::new(8, 8), Some(&2.0)));
    }

    #[test]
    fn weighted_mean_uses_months() {
        let (t, _) = Timeline::from_ranges(
            vec![(MonthRange::new(1, 6), 0.8), (MonthRange::new(7, 36), 1.0)],
            36,
        );
        let avg = t.weighted_mean(|v| *v).unwrap();
        assert!((avg - (0.8 * 6.0 + 30.0) / 36.0).abs() < 1e-12);
        assert!(Timeline::<f64>::new().weighted_mean(|v| *v).is_none());
    }

    #[test]
    fn fill_gaps_covers_duration() {
        let (mut t, _) = Timeline::from_ranges(vec![(MonthRange::new(4, 6), 0.5)], 12);
        t.fill_gaps(12, 1.0);
        assert_eq!(t.covered_months(), 12);
        assert_eq!(t.value_at(1), Some(&1.0));
        assert_eq!(t.value_at(5), Some(&0.5));
    }

    proptest! {
        #[test]
        fn segments_never_overlap(ranges in proptest::collection::vec((1u32..40, 0u32..12), 0..8)) {
            let entries = ranges
                .iter()
                .enumerate()
                .map(|(i, (s, len))| (MonthRange::new(*s, s + len), i));
            let (t, _) = Timeline::from_ranges(entries, 36);
            let segs: Vec<MonthRange> = t.segments().map(|(r, _)| *r).collect();
            for w in segs.windows(2) {
                prop_assert!(w[0].end < w[1].start);
            }
            prop_assert!(t.covered_months() <= 36);
            prop_assert_eq!(t.covered_months() + t.gaps(36).iter().map(|g| g.months()).sum::<u32>(), 36);
        }
    }
}
