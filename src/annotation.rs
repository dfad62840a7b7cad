//! Schedule annotation of samples.
//!
//! For each sample, every window of every label in the
//! [`ScheduleIndex`] is tested against the sample's weekday and clock
//! time. Matching shift labels contribute their code; any matching break
//! label sets the break flag once. A sample matching nothing is a shift
//! crossover.
//!
//! Annotation is a pure per-sample function; samples are independent.
//!
//! # Complexity
//! O(w) per sample where w = total windows in the index.

use std::collections::BTreeSet;

use tracing::trace;

use crate::models::{AnnotatedSample, Label, Sample, ScheduleIndex};

/// Labels samples against a schedule index.
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'a> {
    index: &'a ScheduleIndex,
}

impl<'a> Annotator<'a> {
    /// Creates an annotator over `index`.
    pub fn new(index: &'a ScheduleIndex) -> Self {
        Self { index }
    }

    /// Labels one sample.
    pub fn annotate(&self, sample: &Sample) -> AnnotatedSample {
        let time = sample.timestamp.time();
        let mut shift_codes = BTreeSet::new();
        let mut is_break = false;

        for (label, windows) in self.index.iter() {
            let hit = windows.iter().any(|w| w.matches(sample.weekday, time));
            if !hit {
                continue;
            }
            match label {
                Label::Shift(code) => {
                    shift_codes.insert(code.clone());
                }
                Label::Breaks(_) => is_break = true,
            }
        }

        let annotated = AnnotatedSample::new(sample.clone(), shift_codes, is_break);
        if annotated.is_crossover {
            trace!(
                machine = %sample.machine,
                timestamp = %sample.timestamp,
                "sample outside every shift and break window"
            );
        }
        annotated
    }

    /// Labels a whole series, preserving order.
    pub fn annotate_series(&self, samples: &[Sample]) -> Vec<AnnotatedSample> {
        samples.iter().map(|s| self.annotate(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleRow;
    use chrono::{NaiveDate, NaiveDateTime};

    // 2024-01-01 was a Monday.
    fn monday(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn sample_index() -> ScheduleIndex {
        ScheduleIndex::build(&[
            ScheduleRow::new("A", "Monday 06:00", "Monday 14:00")
                .with_break(Some("Monday 09:00"), Some("Monday 09:15"))
                .with_break(Some("Monday 09:10"), Some("Monday 09:30")),
            ScheduleRow::new("B", "Monday 13:00", "Monday 22:00"),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_shift() {
        let index = sample_index();
        let sample = Sample::new("M1", monday(8, 0), "AVAILABLE", 60.0);
        let a = Annotator::new(&index).annotate(&sample);
        assert_eq!(a.shift_codes, BTreeSet::from(["A".to_string()]));
        assert!(!a.is_break);
        assert!(!a.is_crossover);
    }

    #[test]
    fn test_overlapping_shifts() {
        let index = sample_index();
        let sample = Sample::new("M1", monday(13, 30), "AVAILABLE", 60.0);
        let a = Annotator::new(&index).annotate(&sample);
        assert_eq!(
            a.shift_codes,
            BTreeSet::from(["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_break_flag_with_shift() {
        let index = sample_index();
        // Inside two overlapping break windows and shift A.
        let a = Annotator::new(&index).annotate(&Sample::new("M1", monday(9, 12), "ERROR", 60.0));
        assert!(a.is_break);
        assert!(a.shift_codes.contains("A"));
        assert!(!a.is_crossover);
    }

    #[test]
    fn test_crossover() {
        let index = sample_index();
        let sample = Sample::new("M1", monday(23, 0), "AVAILABLE", 60.0);
        let a = Annotator::new(&index).annotate(&sample);
        assert!(a.shift_codes.is_empty());
        assert!(!a.is_break);
        assert!(a.is_crossover);
    }

    #[test]
    fn test_empty_index_marks_everything_crossover() {
        let index = ScheduleIndex::default();
        let samples = vec![
            Sample::new("M1", monday(8, 0), "AVAILABLE", 60.0),
            Sample::new("M1", monday(8, 1), "ERROR", 60.0),
        ];
        let annotated = Annotator::new(&index).annotate_series(&samples);
        assert_eq!(annotated.len(), 2);
        assert!(annotated.iter().all(|a| a.is_crossover));
        assert_eq!(annotated[1].sample, samples[1]);
    }
}
