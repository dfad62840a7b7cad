//! End-to-end run: schedule rows + sample streams → output tables.
//!
//! # Stages
//!
//! 1. Validate sample streams (optional).
//! 2. Build the [`ScheduleIndex`] from schedule rows.
//! 3. Annotate every sample with its shift codes and break/crossover flags.
//! 4. Reduce each machine's annotated stream into the output tables.
//!
//! Any error aborts the run; partial results are never returned.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregation::{AggregateTables, AnnotatedStream, JamAggregator, JamKpi};
use crate::annotation::Annotator;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::models::{datetime_range, MachineStreams, ScheduleIndex, ScheduleRow};
use crate::validation::validate_streams;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    /// Duration totals and jam counts.
    pub tables: AggregateTables,
    /// Earliest and latest sample timestamp; `None` without samples.
    pub datetime_range: Option<(NaiveDateTime, NaiveDateTime)>,
}

/// Runs the annotation and aggregation stages.
///
/// # Example
///
/// ```
/// use shift_tally::models::{MachineStreams, Sample, ScheduleRow};
/// use shift_tally::pipeline::Pipeline;
/// use chrono::NaiveDate;
///
/// let rows = vec![ScheduleRow::new("A", "Monday 06:00", "Monday 14:00")];
/// let t0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let samples = Sample::series(
///     "M1",
///     vec![
///         (t0, "ERROR"),
///         (t0 + chrono::Duration::minutes(10), "AVAILABLE"),
///     ],
///     180.0,
/// );
/// let streams = MachineStreams::from([("M1".to_string(), samples)]);
///
/// let output = Pipeline::default().run(&rows, &streams).unwrap();
/// assert_eq!(output.tables.jams("M1"), 1);
/// assert_eq!(output.tables.duration("A", "M1", "ERROR"), 600.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs all stages.
    ///
    /// # Errors
    /// [`Error::Validation`] if validation is enabled and a stream is
    /// malformed; [`Error::Schedule`] if a schedule row cannot be parsed.
    pub fn run(&self, rows: &[ScheduleRow], streams: &MachineStreams) -> Result<RunOutput> {
        if self.config.validate {
            validate_streams(streams).map_err(Error::Validation)?;
        }

        let index = ScheduleIndex::build(rows)?;
        info!(
            rows = rows.len(),
            labels = index.label_count(),
            windows = index.window_count(),
            "schedule index built"
        );

        let annotated = annotate_streams(&index, streams);
        let crossovers = annotated
            .iter()
            .flat_map(|s| &s.samples)
            .filter(|a| a.is_crossover)
            .count();
        info!(
            machines = annotated.len(),
            samples = annotated.iter().map(|s| s.samples.len()).sum::<usize>(),
            crossovers,
            "samples annotated"
        );

        let aggregator = JamAggregator::new().with_rules(self.config.jam_rules());
        let tables = aggregator.aggregate_parallel(&annotated, self.config.workers);
        info!(
            total_jams = tables.total_jams(),
            shifts = tables.duration_totals.len(),
            "aggregation complete"
        );

        Ok(RunOutput {
            tables,
            datetime_range: datetime_range(streams),
        })
    }

    /// Builds the jam report for a run's output.
    pub fn report(&self, output: &RunOutput) -> JamKpi {
        JamKpi::calculate(&output.tables, &self.config.error_state, output.datetime_range)
    }
}

/// Annotates every machine's stream, preserving machine and sample order.
pub fn annotate_streams(index: &ScheduleIndex, streams: &MachineStreams) -> Vec<AnnotatedStream> {
    let annotator = Annotator::new(index);
    streams
        .iter()
        .map(|(machine, samples)| {
            debug!(machine = %machine, samples = samples.len(), "annotating");
            AnnotatedStream::new(machine.clone(), annotator.annotate_series(samples))
        })
        .collect()
}
