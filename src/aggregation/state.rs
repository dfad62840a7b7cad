//! Per-machine jam state machine.
//!
//! # States
//!
//! | Mode | Meaning |
//! |------|---------|
//! | `Normal` | No error run in progress |
//! | `Buffering` | Collecting a run of consecutive error samples |
//! | `Skipping` | A break/crossover was seen; the next error run is ignored |
//!
//! # Transitions
//!
//! | Input | Normal | Buffering | Skipping |
//! |-------|--------|-----------|----------|
//! | break / crossover | → Skipping | drop run → Skipping | Skipping |
//! | error sample | → Buffering | append | ignore |
//! | other sample | attribute | flush, attribute → Normal | attribute → Normal |
//!
//! A flushed run totaling at least the noise threshold is discarded
//! without any attribution. A shorter run is one jam event.
//!
//! A run still buffered when the stream ends is dropped: only a later
//! non-error sample can close it.

use std::collections::BTreeSet;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tables::AggregateTables;
use crate::models::AnnotatedSample;

/// Default error state name.
pub const DEFAULT_ERROR_STATE: &str = "ERROR";

/// Default noise threshold: runs of one hour or more are not jams.
pub const DEFAULT_NOISE_THRESHOLD_SECS: f64 = 3600.0;

/// Classification parameters shared by all machines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JamRules {
    /// State name that marks an error sample.
    pub error_state: String,
    /// Runs with total duration `>=` this are discarded as noise.
    pub noise_threshold_secs: f64,
}

impl Default for JamRules {
    fn default() -> Self {
        Self {
            error_state: DEFAULT_ERROR_STATE.to_string(),
            noise_threshold_secs: DEFAULT_NOISE_THRESHOLD_SECS,
        }
    }
}

impl JamRules {
    /// Whether `state` is the error state.
    #[inline]
    pub fn is_error(&self, state: &str) -> bool {
        state == self.error_state
    }
}

/// One buffered error sample.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedError {
    /// Recorded state (always the error state).
    pub state: String,
    /// Weekday of the sample.
    pub weekday: Weekday,
    /// Sample duration (s).
    pub duration_secs: f64,
    /// Shift codes active at the sample.
    pub shift_codes: BTreeSet<String>,
}

/// A run of consecutive error samples awaiting a flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorRun {
    /// Buffered samples in arrival order.
    pub entries: Vec<BufferedError>,
    /// Sum of buffered durations (s).
    pub duration_secs: f64,
}

impl ErrorRun {
    fn push(&mut self, entry: BufferedError) {
        self.duration_secs += entry.duration_secs;
        self.entries.push(entry);
    }
}

/// Machine mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Mode {
    /// No run in progress.
    #[default]
    Normal,
    /// Collecting an error run.
    Buffering(ErrorRun),
    /// Ignoring errors until a non-error sample arrives.
    Skipping,
}

/// Result of closing an error run.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FlushOutcome {
    /// No run was buffered.
    Empty,
    /// The run was counted as one jam.
    Jam {
        /// Samples in the run.
        samples: usize,
        /// Run length (s).
        duration_secs: f64,
    },
    /// The run reached the noise threshold and was discarded.
    Noise {
        /// Samples in the run.
        samples: usize,
        /// Run length (s).
        duration_secs: f64,
    },
}

/// State of one machine's reduction.
///
/// Owned by whichever worker processes the machine; created on its first
/// sample and consumed by [`MachineState::finish`].
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    machine: String,
    mode: Mode,
}

impl MachineState {
    /// Creates the initial (`Normal`) state for a machine.
    pub fn new(machine: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            mode: Mode::Normal,
        }
    }

    /// Machine identifier.
    pub fn machine(&self) -> &str {
        &self.machine
    }

    /// Current mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Feeds the next sample of this machine, writing any attribution
    /// into `tables`.
    pub fn observe(
        &mut self,
        sample: &AnnotatedSample,
        rules: &JamRules,
        tables: &mut AggregateTables,
    ) {
        if sample.interrupts() {
            if let Mode::Buffering(run) = &self.mode {
                debug!(
                    machine = %self.machine,
                    samples = run.entries.len(),
                    at = %sample.sample.timestamp,
                    "error run interrupted by break or shift crossover"
                );
            }
            self.mode = Mode::Skipping;
            return;
        }

        if rules.is_error(&sample.sample.state) {
            let entry = BufferedError {
                state: sample.sample.state.clone(),
                weekday: sample.sample.weekday,
                duration_secs: sample.sample.duration_secs,
                shift_codes: sample.shift_codes.clone(),
            };
            if self.mode == Mode::Normal {
                self.mode = Mode::Buffering(ErrorRun::default());
            }
            if let Mode::Buffering(run) = &mut self.mode {
                run.push(entry);
            }
            return;
        }

        match self.flush(rules, tables) {
            FlushOutcome::Empty => {}
            FlushOutcome::Jam {
                samples,
                duration_secs,
            } => debug!(
                machine = %self.machine,
                at = %sample.sample.timestamp,
                samples,
                duration_secs,
                "jam recorded"
            ),
            FlushOutcome::Noise {
                samples,
                duration_secs,
            } => debug!(
                machine = %self.machine,
                at = %sample.sample.timestamp,
                samples,
                duration_secs,
                "error run discarded as noise"
            ),
        }

        split_into(
            tables,
            &self.machine,
            &sample.sample.state,
            sample.sample.duration_secs,
            &sample.shift_codes,
        );
    }

    /// Closes the buffered run (if any) and returns to `Normal`.
    fn flush(&mut self, rules: &JamRules, tables: &mut AggregateTables) -> FlushOutcome {
        let run = match std::mem::take(&mut self.mode) {
            Mode::Buffering(run) => run,
            Mode::Normal | Mode::Skipping => return FlushOutcome::Empty,
        };

        let samples = run.entries.len();
        if run.duration_secs >= rules.noise_threshold_secs {
            return FlushOutcome::Noise {
                samples,
                duration_secs: run.duration_secs,
            };
        }

        let touched: BTreeSet<&str> = run
            .entries
            .iter()
            .flat_map(|e| e.shift_codes.iter().map(String::as_str))
            .collect();
        tables.record_jam(&self.machine, touched);

        for entry in &run.entries {
            split_into(
                tables,
                &self.machine,
                &entry.state,
                entry.duration_secs,
                &entry.shift_codes,
            );
        }

        FlushOutcome::Jam {
            samples,
            duration_secs: run.duration_secs,
        }
    }

    /// Ends the machine's stream. Returns the number of buffered error
    /// samples dropped because no non-error sample closed their run.
    pub fn finish(self) -> usize {
        match self.mode {
            Mode::Buffering(run) => {
                debug!(
                    machine = %self.machine,
                    samples = run.entries.len(),
                    duration_secs = run.duration_secs,
                    "trailing error run dropped at end of stream"
                );
                run.entries.len()
            }
            Mode::Normal | Mode::Skipping => 0,
        }
    }
}

/// Splits `secs` evenly across `shift_codes`. No codes: no attribution.
fn split_into(
    tables: &mut AggregateTables,
    machine: &str,
    state: &str,
    secs: f64,
    shift_codes: &BTreeSet<String>,
) {
    if shift_codes.is_empty() {
        return;
    }
    let share = secs / shift_codes.len() as f64;
    for code in shift_codes {
        tables.add_duration(code, machine, state, share);
    }
}
