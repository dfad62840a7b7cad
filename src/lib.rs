//! Shift-aware machine state accounting.
//!
//! Labels machine status samples with the shift and break windows active
//! at their timestamps, then reduces each machine's labeled stream into
//! per-shift duration totals and jam counts.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Sample`, `AnnotatedSample`, `TimeWindow`,
//!   `WeekPoint`, `ScheduleRow`, `ScheduleIndex`, `Label`
//! - **`annotation`**: Per-sample shift/break/crossover labeling
//! - **`aggregation`**: Per-machine jam state machine, output tables, KPIs
//! - **`pipeline`**: Validate → index → annotate → aggregate
//! - **`validation`**: Sample stream integrity checks
//! - **`ingest`**: CSV loading of schedules and machine readings
//! - **`config`**: Run parameters
//!
//! # Architecture
//!
//! Annotation is a pure function of one sample. Aggregation is a
//! sequential reduction within a machine and fully independent across
//! machines, so machines can be reduced on separate threads and their
//! tables merged by union.

pub mod aggregation;
pub mod annotation;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod validation;

pub use error::{Error, Result};
