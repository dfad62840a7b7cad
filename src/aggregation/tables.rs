//! Output tables of the jam aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// shift code → machine → state → seconds.
pub type DurationTotals = BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>;
/// shift code → machine → jam events.
pub type JamCountByShift = BTreeMap<String, BTreeMap<String, u64>>;
/// machine → jam events.
pub type OverallJamCount = BTreeMap<String, u64>;

/// The three accumulators produced by a run.
///
/// Every writer only touches entries under its own machine key, so
/// tables built for disjoint machine sets merge by plain union.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTables {
    /// Seconds per shift, machine and state.
    pub duration_totals: DurationTotals,
    /// Jam events per shift and machine. A jam touching several shifts
    /// counts once in each.
    pub jam_count_by_shift: JamCountByShift,
    /// Jam events per machine, once per event.
    pub overall_jam_count: OverallJamCount,
}

impl AggregateTables {
    /// Creates empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds seconds to `duration_totals[shift][machine][state]`.
    pub fn add_duration(&mut self, shift_code: &str, machine: &str, state: &str, secs: f64) {
        *self
            .duration_totals
            .entry(shift_code.to_string())
            .or_default()
            .entry(machine.to_string())
            .or_default()
            .entry(state.to_string())
            .or_insert(0.0) += secs;
    }

    /// Records one jam event for `machine` touching `shift_codes`.
    pub fn record_jam<'s>(
        &mut self,
        machine: &str,
        shift_codes: impl IntoIterator<Item = &'s str>,
    ) {
        for code in shift_codes {
            *self
                .jam_count_by_shift
                .entry(code.to_string())
                .or_default()
                .entry(machine.to_string())
                .or_insert(0) += 1;
        }
        *self.overall_jam_count.entry(machine.to_string()).or_insert(0) += 1;
    }

    /// Total seconds for a shift/machine/state, 0.0 if never recorded.
    pub fn duration(&self, shift_code: &str, machine: &str, state: &str) -> f64 {
        self.duration_totals
            .get(shift_code)
            .and_then(|m| m.get(machine))
            .and_then(|s| s.get(state))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether a shift/machine/state total exists.
    pub fn has_duration(&self, shift_code: &str, machine: &str, state: &str) -> bool {
        self.duration_totals
            .get(shift_code)
            .and_then(|m| m.get(machine))
            .is_some_and(|s| s.contains_key(state))
    }

    /// Jam events for a machine within a shift.
    pub fn jams_in_shift(&self, shift_code: &str, machine: &str) -> u64 {
        self.jam_count_by_shift
            .get(shift_code)
            .and_then(|m| m.get(machine))
            .copied()
            .unwrap_or(0)
    }

    /// Jam events for a machine across all shifts.
    pub fn jams(&self, machine: &str) -> u64 {
        self.overall_jam_count.get(machine).copied().unwrap_or(0)
    }

    /// Jam events across all machines.
    pub fn total_jams(&self) -> u64 {
        self.overall_jam_count.values().sum()
    }

    /// Folds `other` into `self`.
    ///
    /// Counts and durations under keys present in both are summed, so the
    /// merge is also correct for overlapping machine sets, though a
    /// worker partition never produces them.
    pub fn merge(&mut self, other: AggregateTables) {
        for (shift, machines) in other.duration_totals {
            let dst = self.duration_totals.entry(shift).or_default();
            for (machine, states) in machines {
                let dst = dst.entry(machine).or_default();
                for (state, secs) in states {
                    *dst.entry(state).or_insert(0.0) += secs;
                }
            }
        }
        for (shift, machines) in other.jam_count_by_shift {
            let dst = self.jam_count_by_shift.entry(shift).or_default();
            for (machine, count) in machines {
                *dst.entry(machine).or_insert(0) += count;
            }
        }
        for (machine, count) in other.overall_jam_count {
            *self.overall_jam_count.entry(machine).or_insert(0) += count;
        }
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.duration_totals.is_empty()
            && self.jam_count_by_shift.is_empty()
            && self.overall_jam_count.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read() {
        let mut t = AggregateTables::new();
        assert!(t.is_empty());
        t.add_duration("A", "M1", "ERROR", 30.0);
        t.add_duration("A", "M1", "ERROR", 12.5);
        assert!((t.duration("A", "M1", "ERROR") - 42.5).abs() < 1e-10);
        assert!(t.has_duration("A", "M1", "ERROR"));
        assert!(!t.has_duration("A", "M1", "AVAILABLE"));
        assert_eq!(t.duration("B", "M1", "ERROR"), 0.0);
    }

    #[test]
    fn test_record_jam_counts_once_overall() {
        let mut t = AggregateTables::new();
        t.record_jam("M1", ["A", "B"]);
        t.record_jam("M1", ["A"]);
        assert_eq!(t.jams_in_shift("A", "M1"), 2);
        assert_eq!(t.jams_in_shift("B", "M1"), 1);
        assert_eq!(t.jams("M1"), 2);
        assert_eq!(t.jams("M2"), 0);
        assert_eq!(t.total_jams(), 2);
    }

    #[test]
    fn test_record_jam_without_shift_codes() {
        let mut t = AggregateTables::new();
        t.record_jam("M1", std::iter::empty::<&str>());
        assert!(t.jam_count_by_shift.is_empty());
        assert_eq!(t.jams("M1"), 1);
    }

    #[test]
    fn test_merge_disjoint_machines() {
        let mut a = AggregateTables::new();
        a.add_duration("A", "M1", "ERROR", 10.0);
        a.record_jam("M1", ["A"]);

        let mut b = AggregateTables::new();
        b.add_duration("A", "M2", "AVAILABLE", 20.0);
        b.record_jam("M2", ["A"]);

        a.merge(b);
        assert_eq!(a.duration("A", "M1", "ERROR"), 10.0);
        assert_eq!(a.duration("A", "M2", "AVAILABLE"), 20.0);
        assert_eq!(a.jams_in_shift("A", "M1"), 1);
        assert_eq!(a.jams_in_shift("A", "M2"), 1);
        assert_eq!(a.total_jams(), 2);
    }

    #[test]
    fn test_merge_into_empty_is_identity() {
        let mut b = AggregateTables::new();
        b.add_duration("A", "M2", "AVAILABLE", 20.25);
        b.record_jam("M2", ["A"]);

        let mut a = AggregateTables::new();
        a.merge(b.clone());
        assert_eq!(a, b);
    }
}
