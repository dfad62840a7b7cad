//! Error types.
//!
//! Schedule and weekday errors indicate malformed input data. They are
//! raised at the point of first detection and never retried. The
//! aggregation stage has no error type: it cannot fail.

use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationError;

/// Crate-level result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A weekday name outside the seven recognized days.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown weekday '{0}'")]
pub struct UnknownWeekdayError(pub String);

/// Failure to turn a schedule row into time windows.
///
/// `row` is the 1-based data row number (header excluded).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleParseError {
    /// The shift code cell is blank.
    #[error("row {row}: missing shift code")]
    MissingShiftCode { row: usize },

    /// A shift start/end cell is blank.
    #[error("row {row}: missing time in column '{column}'")]
    MissingTime { row: usize, column: String },

    /// Time text is not of the form `<Weekday> <HH:MM>`.
    #[error("row {row}: cannot parse time '{value}' in column '{column}'")]
    InvalidTime {
        row: usize,
        column: String,
        value: String,
    },

    /// The weekday part of a time cell is not a known day.
    #[error("row {row}: column '{column}': {source}")]
    UnknownWeekday {
        row: usize,
        column: String,
        #[source]
        source: UnknownWeekdayError,
    },

    /// An "n/a" endpoint where a concrete weekday is required.
    #[error("row {row}: unbounded endpoint ('n/a') in column '{column}' has no weekday to match against")]
    UnboundedEndpoint { row: usize, column: String },
}

/// Failure while loading CSV input.
#[derive(Error, Debug)]
pub enum IngestError {
    /// File could not be opened.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required header is absent.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// A machine header appears more than once.
    #[error("duplicate machine column '{0}'")]
    DuplicateColumn(String),

    /// A timestamp cell matched none of the accepted formats.
    #[error("row {row}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },
}

/// Failure while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not match the configuration schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Any failure of a pipeline run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schedule(#[from] ScheduleParseError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sample streams failed integrity checks.
    #[error("{} invalid sample stream issue(s); first: {}", .0.len(), first_message(.0))]
    Validation(Vec<ValidationError>),
}

fn first_message(errors: &[ValidationError]) -> &str {
    errors.first().map(|e| e.message.as_str()).unwrap_or("")
}
