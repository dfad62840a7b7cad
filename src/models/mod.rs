//! Domain models for shift-aware machine accounting.
//!
//! # Domain Mappings
//!
//! | shift-tally | Plant floor |
//! |-------------|-------------|
//! | Sample | One status reading from a machine's PLC/historian |
//! | ScheduleRow | One line of the shift plan |
//! | TimeWindow | A recurring shift or break period |
//! | Label | Shift code, or that shift's break group |

mod calendar;
mod sample;
mod schedule;

pub use calendar::{parse_weekday, weekday_name, TimeWindow, WeekPoint};
pub use sample::{
    datetime_range, AnnotatedSample, MachineStreams, Sample, DEFAULT_FALLBACK_DURATION_SECS,
};
pub use schedule::{
    Label, ScheduleIndex, ScheduleRow, SHIFT_CODE_COLUMN, SHIFT_END_COLUMN, SHIFT_START_COLUMN,
};
