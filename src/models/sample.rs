//! Machine status samples.
//!
//! A [`Sample`] is one status reading of one machine. Its duration is
//! the gap until that machine's next reading; the last reading of a
//! series has no successor and falls back to a fixed duration.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Default duration (seconds) of the final sample of a series.
pub const DEFAULT_FALLBACK_DURATION_SECS: f64 = 180.0;

/// Per-machine chronological sample streams, keyed by machine id.
pub type MachineStreams = BTreeMap<String, Vec<Sample>>;

/// One status reading of a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Machine identifier.
    pub machine: String,
    /// Reading time (naive, no timezone).
    pub timestamp: NaiveDateTime,
    /// Reported state (e.g. "ERROR", "AVAILABLE").
    pub state: String,
    /// Day of week of `timestamp`.
    pub weekday: Weekday,
    /// Seconds until the machine's next reading.
    pub duration_secs: f64,
}

impl Sample {
    /// Creates a sample; the weekday is taken from the timestamp.
    pub fn new(
        machine: impl Into<String>,
        timestamp: NaiveDateTime,
        state: impl Into<String>,
        duration_secs: f64,
    ) -> Self {
        Self {
            machine: machine.into(),
            timestamp,
            state: state.into(),
            weekday: timestamp.weekday(),
            duration_secs,
        }
    }

    /// Builds a series from chronological `(timestamp, state)` readings.
    ///
    /// Each duration is the gap to the next reading in seconds; the last
    /// reading gets `fallback_secs`.
    pub fn series<S: Into<String>>(
        machine: &str,
        readings: impl IntoIterator<Item = (NaiveDateTime, S)>,
        fallback_secs: f64,
    ) -> Vec<Sample> {
        let readings: Vec<(NaiveDateTime, String)> = readings
            .into_iter()
            .map(|(ts, state)| (ts, state.into()))
            .collect();

        let mut samples = Vec::with_capacity(readings.len());
        for (i, (ts, state)) in readings.iter().enumerate() {
            let duration = match readings.get(i + 1) {
                Some((next, _)) => {
                    let gap = *next - *ts;
                    gap.num_microseconds().map_or_else(
                        || gap.num_milliseconds() as f64 / 1_000.0,
                        |us| us as f64 / 1_000_000.0,
                    )
                }
                None => fallback_secs,
            };
            samples.push(Sample::new(machine, *ts, state.clone(), duration));
        }
        samples
    }
}

/// A sample labeled with the schedule windows active at its timestamp.
///
/// Invariant: `is_crossover` is true iff `shift_codes` is empty and
/// `is_break` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSample {
    /// The underlying reading.
    pub sample: Sample,
    /// Every shift code whose window contains the timestamp.
    pub shift_codes: BTreeSet<String>,
    /// At least one break window contains the timestamp.
    pub is_break: bool,
    /// No shift or break window contains the timestamp.
    pub is_crossover: bool,
}

impl AnnotatedSample {
    /// Labels a sample, deriving the crossover flag.
    pub fn new(sample: Sample, shift_codes: BTreeSet<String>, is_break: bool) -> Self {
        let is_crossover = shift_codes.is_empty() && !is_break;
        Self {
            sample,
            shift_codes,
            is_break,
            is_crossover,
        }
    }

    /// Whether this sample interrupts jam accounting (break or crossover).
    #[inline]
    pub fn interrupts(&self) -> bool {
        self.is_break || self.is_crossover
    }
}

/// Earliest and latest timestamp across all streams.
pub fn datetime_range(streams: &MachineStreams) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut timestamps = streams.values().flatten().map(|s| s.timestamp);
    let first = timestamps.next()?;
    Some(timestamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
}
