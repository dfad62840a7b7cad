//! Jam aggregation across machines.
//!
//! Each machine's stream is reduced sequentially by its own
//! [`MachineState`]. Machines are independent, so they can be spread over
//! a rayon pool; each machine fills a private [`AggregateTables`] and the
//! partial tables are merged by key union.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::state::{JamRules, MachineState};
use super::tables::AggregateTables;
use crate::models::AnnotatedSample;

/// One machine's annotated, chronological stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedStream {
    /// Machine identifier.
    pub machine: String,
    /// Samples in chronological order.
    pub samples: Vec<AnnotatedSample>,
}

impl AnnotatedStream {
    /// Creates a stream.
    pub fn new(machine: impl Into<String>, samples: Vec<AnnotatedSample>) -> Self {
        Self {
            machine: machine.into(),
            samples,
        }
    }
}

/// Reduces annotated streams into output tables.
///
/// # Example
///
/// ```
/// use shift_tally::aggregation::{AnnotatedStream, JamAggregator};
///
/// let tables = JamAggregator::new().aggregate(&[AnnotatedStream::new("M1", vec![])]);
/// assert!(tables.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct JamAggregator {
    rules: JamRules,
}

impl JamAggregator {
    /// Creates an aggregator with default rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the classification rules.
    pub fn with_rules(mut self, rules: JamRules) -> Self {
        self.rules = rules;
        self
    }

    /// Current rules.
    pub fn rules(&self) -> &JamRules {
        &self.rules
    }

    /// Reduces one machine's stream into `tables`.
    pub fn reduce_machine(&self, stream: &AnnotatedStream, tables: &mut AggregateTables) {
        let mut state = MachineState::new(&stream.machine);
        for sample in &stream.samples {
            state.observe(sample, &self.rules, tables);
        }
        let dropped = state.finish();
        debug!(
            machine = %stream.machine,
            samples = stream.samples.len(),
            dropped,
            "machine reduced"
        );
    }

    /// Reduces all streams on the calling thread.
    pub fn aggregate(&self, streams: &[AnnotatedStream]) -> AggregateTables {
        let mut tables = AggregateTables::new();
        for stream in streams {
            self.reduce_machine(stream, &mut tables);
        }
        tables
    }

    /// Reduces streams on a pool of up to `workers` threads.
    ///
    /// Each machine is reduced into its own tables and the partial tables
    /// are merged by key union. The result is identical to
    /// [`aggregate`](Self::aggregate) provided machine ids are distinct
    /// across streams.
    pub fn aggregate_parallel(
        &self,
        streams: &[AnnotatedStream],
        workers: usize,
    ) -> AggregateTables {
        let workers = workers.clamp(1, streams.len().max(1));
        if workers == 1 {
            return self.aggregate(streams);
        }

        let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "failed to start worker pool, aggregating sequentially");
                return self.aggregate(streams);
            }
        };
        info!(machines = streams.len(), workers, "aggregating in parallel");

        pool.install(|| {
            streams
                .par_iter()
                .map(|stream| {
                    let mut tables = AggregateTables::new();
                    self.reduce_machine(stream, &mut tables);
                    tables
                })
                .reduce(AggregateTables::new, |mut acc, part| {
                    acc.merge(part);
                    acc
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn random_stream(machine: &str, rng: &mut StdRng, len: usize) -> AnnotatedStream {
        let shifts = ["A", "B", "C"];
        let mut ts = base();
        let samples = (0..len)
            .map(|_| {
                let secs = rng.random_range(1..2400) as f64 + 0.25;
                let state = match rng.random_range(0..4) {
                    0 | 1 => "ERROR",
                    2 => "AVAILABLE",
                    _ => "FULL",
                };
                let codes: BTreeSet<String> = shifts
                    .iter()
                    .filter(|_| rng.random_bool(0.4))
                    .map(|c| c.to_string())
                    .collect();
                let is_break = rng.random_bool(0.05);
                let s = Sample::new(machine, ts, state, secs);
                ts += Duration::milliseconds((secs * 1000.0) as i64);
                AnnotatedSample::new(s, codes, is_break)
            })
            .collect();
        AnnotatedStream::new(machine, samples)
    }

    fn random_streams(seed: u64, machines: usize) -> Vec<AnnotatedStream> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..machines)
            .map(|i| random_stream(&format!("M{i:02}"), &mut rng, 200))
            .collect()
    }

    #[test]
    fn test_machines_are_independent() {
        let streams = random_streams(7, 3);
        let agg = JamAggregator::new();
        let all = agg.aggregate(&streams);

        for stream in &streams {
            let alone = agg.aggregate(std::slice::from_ref(stream));
            assert_eq!(all.jams(&stream.machine), alone.jams(&stream.machine));
            for (shift, machines) in &alone.duration_totals {
                for (state, secs) in &machines[&stream.machine] {
                    assert_eq!(all.duration(shift, &stream.machine, state), *secs);
                }
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let streams = random_streams(42, 9);
        let agg = JamAggregator::new();
        let sequential = agg.aggregate(&streams);
        for workers in [2, 3, 4, 16] {
            let parallel = agg.aggregate_parallel(&streams, workers);
            assert_eq!(parallel, sequential, "workers = {workers}");
        }
    }

    #[test]
    fn test_rerun_is_identical() {
        let streams = random_streams(3, 4);
        let agg = JamAggregator::new();
        assert_eq!(agg.aggregate(&streams), agg.aggregate(&streams));
    }

    fn shift_jam_sum(tables: &AggregateTables, machine: &str) -> u64 {
        tables
            .jam_count_by_shift
            .values()
            .filter_map(|machines| machines.get(machine))
            .sum()
    }

    #[test]
    fn test_overall_jams_bounded_by_shift_sum() {
        let streams = random_streams(11, 5);
        let tables = JamAggregator::new().aggregate(&streams);
        assert!(tables.total_jams() > 0);
        for (machine, &overall) in &tables.overall_jam_count {
            assert!(overall <= shift_jam_sum(&tables, machine), "machine {machine}");
        }
    }

    #[test]
    fn test_overall_jams_equal_shift_sum_for_single_code_jams() {
        let sample = |state: &str, code: &str| {
            AnnotatedSample::new(
                Sample::new("M1", base(), state, 60.0),
                BTreeSet::from([code.to_string()]),
                false,
            )
        };
        let stream = AnnotatedStream::new(
            "M1",
            vec![
                sample("ERROR", "A"),
                sample("AVAILABLE", "A"),
                sample("ERROR", "B"),
                sample("ERROR", "B"),
                sample("AVAILABLE", "B"),
                sample("ERROR", "A"),
                sample("FULL", "B"),
            ],
        );
        let tables = JamAggregator::new().aggregate(&[stream]);
        assert_eq!(tables.jams("M1"), 3);
        assert_eq!(tables.jams_in_shift("A", "M1"), 2);
        assert_eq!(tables.jams_in_shift("B", "M1"), 1);
        assert_eq!(shift_jam_sum(&tables, "M1"), tables.jams("M1"));
    }

    #[test]
    fn test_conservation_without_errors() {
        let mut rng = StdRng::seed_from_u64(5);
        let samples: Vec<AnnotatedSample> = (0..50)
            .map(|i| {
                let secs = rng.random_range(1.0..500.0);
                let n = 1 + i % 3;
                let codes: BTreeSet<String> =
                    ["A", "B", "C"][..n].iter().map(|c| c.to_string()).collect();
                AnnotatedSample::new(Sample::new("M1", base(), "AVAILABLE", secs), codes, false)
            })
            .collect();
        let expected: f64 = samples.iter().map(|a| a.sample.duration_secs).sum();

        let tables = JamAggregator::new().aggregate(&[AnnotatedStream::new("M1", samples)]);
        let total: f64 = ["A", "B", "C"]
            .iter()
            .map(|c| tables.duration(c, "M1", "AVAILABLE"))
            .sum();
        assert!((total - expected).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_with_no_streams() {
        let tables = JamAggregator::new().aggregate_parallel(&[], 8);
        assert!(tables.is_empty());
    }
}
