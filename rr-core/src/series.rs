//! Step-function time series
//!
//! `TimeIndexedSeries` answers "most recent value at or before `t`" with a
//! binary search. Every held-last lookup in the engine (lap number,
//! classification, tyre, cumulative time, track status) goes through it.

use serde::Serialize;

/// Time-ordered `(session_time, value)` pairs with last-value-held lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeIndexedSeries<T> {
    entries: Vec<(f64, T)>,
}

impl<T> Default for TimeIndexedSeries<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> TimeIndexedSeries<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary-order entries
    ///
    /// Entries with a non-finite timestamp are dropped. The sort is stable,
    /// so entries sharing a timestamp keep their input order and the last
    /// of them wins on lookup.
    pub fn from_unsorted(entries: impl IntoIterator<Item = (f64, T)>) -> Self {
        let mut entries: Vec<(f64, T)> = entries.into_iter().filter(|(t, _)| t.is_finite()).collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { entries }
    }

    /// Index of the last entry with timestamp <= `t`
    fn index_at(&self, t: f64) -> Option<usize> {
        let n = self.entries.partition_point(|(ts, _)| *ts <= t);
        n.checked_sub(1)
    }

    /// Most recent value at or before `t`
    pub fn at(&self, t: f64) -> Option<&T> {
        self.index_at(t).map(|i| &self.entries[i].1)
    }

    pub fn last(&self) -> Option<(f64, &T)> {
        self.entries.last().map(|(t, v)| (*t, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &T)> {
        self.entries.iter().map(|(t, v)| (*t, v))
    }
}

impl<T: Clone> TimeIndexedSeries<T> {
    /// Most recent value at or before `t`, or `default` if none
    pub fn at_or(&self, t: f64, default: T) -> T {
        self.at(t).cloned().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laps() -> TimeIndexedSeries<u32> {
        TimeIndexedSeries::from_unsorted(vec![(183.0, 2), (95.0, 1), (270.5, 3)])
    }

    #[test]
    fn test_lookup_holds_last_value() {
        let s = laps();
        assert_eq!(s.at(95.0), Some(&1));
        assert_eq!(s.at(150.0), Some(&1));
        assert_eq!(s.at(183.0), Some(&2));
        assert_eq!(s.at(10_000.0), Some(&3));
    }

    #[test]
    fn test_lookup_before_first_entry_is_none() {
        let s = laps();
        assert_eq!(s.at(94.999), None);
        assert_eq!(s.at_or(0.0, 1), 1);
    }

    #[test]
    fn test_empty_series_defaults() {
        let s: TimeIndexedSeries<u32> = TimeIndexedSeries::new();
        assert!(s.is_empty());
        assert_eq!(s.at(100.0), None);
        assert_eq!(s.at_or(100.0, 7), 7);
        assert_eq!(s.last(), None);
    }

    #[test]
    fn test_equal_timestamps_last_wins() {
        let s = TimeIndexedSeries::from_unsorted(vec![(10.0, "a"), (10.0, "b"), (5.0, "z")]);
        assert_eq!(s.at(10.0), Some(&"b"));
        assert_eq!(s.at(7.0), Some(&"z"));
    }

    #[test]
    fn test_non_finite_timestamps_dropped() {
        let s = TimeIndexedSeries::from_unsorted(vec![(f64::NAN, 9), (1.0, 1)]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_iter_in_time_order() {
        let s = laps();
        let times: Vec<f64> = s.iter().map(|(t, _)| t).collect();
        assert_eq!(times, vec![95.0, 183.0, 270.5]);
        assert_eq!(s.last(), Some((270.5, &3)));
    }
}
