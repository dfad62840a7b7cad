//! Jam aggregation and reporting.
//!
//! Reduces annotated sample streams into per-shift, per-machine,
//! per-state duration totals and jam counts.
//!
//! # Jam Definition
//!
//! A jam is one contiguous run of error samples, not interrupted by a
//! break or shift crossover, whose total duration is below the noise
//! threshold (default one hour). A run is closed by the next non-error
//! sample; a break or crossover drops it and suppresses the error run
//! that immediately follows.
//!
//! # Duration Attribution
//!
//! A sample's duration is split evenly across all shift codes active at
//! its timestamp. Samples without shift codes are not attributed.

mod engine;
mod kpi;
mod state;
mod tables;

pub use engine::{AnnotatedStream, JamAggregator};
pub use kpi::{JamKpi, MachineJamShare, MachineShiftSummary, ShiftSummary};
pub use state::{
    BufferedError, ErrorRun, JamRules, MachineState, Mode, DEFAULT_ERROR_STATE,
    DEFAULT_NOISE_THRESHOLD_SECS,
};
pub use tables::{AggregateTables, DurationTotals, JamCountByShift, OverallJamCount};
