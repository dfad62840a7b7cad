//! Input validation for sample streams.
//!
//! The aggregation relies on each machine's samples arriving in
//! chronological order with usable durations. Detects:
//! - Samples filed under the wrong machine key
//! - Timestamps going backwards within a machine
//! - Negative or non-finite durations

use crate::models::MachineStreams;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Machine the issue was found in.
    pub machine: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A sample's machine differs from the stream it is in.
    MachineMismatch,
    /// A sample is earlier than its predecessor.
    OutOfOrder,
    /// A duration is negative, NaN or infinite.
    InvalidDuration,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, machine: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            machine: machine.to_string(),
            message: message.into(),
        }
    }
}

/// Validates per-machine sample streams.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_streams(streams: &MachineStreams) -> ValidationResult {
    let mut errors = Vec::new();

    for (machine, samples) in streams {
        for (i, sample) in samples.iter().enumerate() {
            if &sample.machine != machine {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MachineMismatch,
                    machine,
                    format!(
                        "Sample {i} of stream '{machine}' belongs to machine '{}'",
                        sample.machine
                    ),
                ));
            }

            if !sample.duration_secs.is_finite() || sample.duration_secs < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidDuration,
                    machine,
                    format!(
                        "Machine '{machine}' sample at {} has invalid duration {}",
                        sample.timestamp, sample.duration_secs
                    ),
                ));
            }

            if let Some(prev) = i.checked_sub(1).map(|p| &samples[p]) {
                if sample.timestamp < prev.timestamp {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::OutOfOrder,
                        machine,
                        format!(
                            "Machine '{machine}' sample at {} precedes previous sample at {}",
                            sample.timestamp, prev.timestamp
                        ),
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
