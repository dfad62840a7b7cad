//! Shift schedule model.
//!
//! A schedule is a table of rows, one per shift definition, each with a
//! shift window and any number of break/lunch windows. [`ScheduleIndex`]
//! turns those rows into labeled [`TimeWindow`] lists that the
//! annotator matches samples against.
//!
//! # Labels
//! Every shift code owns two labels: the shift itself and its break
//! group. A shift code may appear on several rows (e.g. one per
//! weekday); all of its windows accumulate under the same labels.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::calendar::{EndpointParseError, TimeWindow, WeekPoint};
use crate::error::ScheduleParseError;

/// Column headers of the schedule table.
pub const SHIFT_CODE_COLUMN: &str = "Shift Code";
/// Shift start column header.
pub const SHIFT_START_COLUMN: &str = "Shift Start Time";
/// Shift end column header.
pub const SHIFT_END_COLUMN: &str = "Shift End Time";

/// One raw schedule row, as produced by the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Shift code.
    pub shift_code: String,
    /// Shift start, `"<Weekday> HH:MM"` or `"n/a"`.
    pub shift_start: String,
    /// Shift end, `"<Weekday> HH:MM"` or `"n/a"`.
    pub shift_end: String,
    /// Break/lunch cells in column order: start, end, start, end, ...
    /// `None` = empty cell.
    pub break_cells: Vec<Option<String>>,
    /// Headers of `break_cells`, used in error messages.
    pub break_columns: Vec<String>,
}

impl ScheduleRow {
    /// Creates a row with no breaks.
    pub fn new(
        shift_code: impl Into<String>,
        shift_start: impl Into<String>,
        shift_end: impl Into<String>,
    ) -> Self {
        Self {
            shift_code: shift_code.into(),
            shift_start: shift_start.into(),
            shift_end: shift_end.into(),
            break_cells: Vec::new(),
            break_columns: Vec::new(),
        }
    }

    /// Appends a break start/end pair. Either side may be absent.
    pub fn with_break(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        let n = self.break_cells.len() / 2 + 1;
        self.break_cells.push(start.map(str::to_string));
        self.break_cells.push(end.map(str::to_string));
        self.break_columns.push(format!("Break {n} Start"));
        self.break_columns.push(format!("Break {n} End"));
        self
    }

    fn break_column(&self, idx: usize) -> String {
        self.break_columns
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("break column {}", idx + 1))
    }
}

/// A schedule label: a shift, or the break group of a shift.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Windows during which the shift is active.
    Shift(String),
    /// Break and lunch windows of the shift.
    Breaks(String),
}

impl Label {
    /// The shift code this label belongs to.
    pub fn shift_code(&self) -> &str {
        match self {
            Label::Shift(code) | Label::Breaks(code) => code,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Shift(code) => write!(f, "{code}"),
            Label::Breaks(code) => write!(f, "{code} breaks"),
        }
    }
}

/// Label → windows mapping built from schedule rows. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleIndex {
    windows: BTreeMap<Label, Vec<TimeWindow>>,
}

impl ScheduleIndex {
    /// Builds the index from schedule rows.
    ///
    /// Break cells pair positionally (start, end). A pair with either cell
    /// empty or `"n/a"` is skipped; an odd trailing cell is ignored.
    ///
    /// # Errors
    /// A blank shift code, missing or unparseable shift time, unknown
    /// weekday, or an `"n/a"` shift start/end.
    pub fn build(rows: &[ScheduleRow]) -> Result<Self, ScheduleParseError> {
        let mut windows: BTreeMap<Label, Vec<TimeWindow>> = BTreeMap::new();

        for (i, row) in rows.iter().enumerate() {
            let row_no = i + 1;
            let code = row.shift_code.trim();
            if code.is_empty() {
                return Err(ScheduleParseError::MissingShiftCode { row: row_no });
            }

            let start = required_point(row_no, SHIFT_START_COLUMN, &row.shift_start)?;
            let end = required_point(row_no, SHIFT_END_COLUMN, &row.shift_end)?;
            windows
                .entry(Label::Shift(code.to_string()))
                .or_default()
                .push(TimeWindow::new(start, end));

            let breaks = windows.entry(Label::Breaks(code.to_string())).or_default();
            for (pair_idx, pair) in row.break_cells.chunks_exact(2).enumerate() {
                let (Some(b_start), Some(b_end)) = (break_cell(&pair[0]), break_cell(&pair[1]))
                else {
                    continue;
                };
                let start_col = row.break_column(pair_idx * 2);
                let end_col = row.break_column(pair_idx * 2 + 1);
                let start = required_point(row_no, &start_col, b_start)?;
                let end = required_point(row_no, &end_col, b_end)?;
                breaks.push(TimeWindow::new(start, end));
            }
        }

        Ok(Self { windows })
    }

    /// Iterates labels and their windows in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&Label, &[TimeWindow])> {
        self.windows.iter().map(|(l, w)| (l, w.as_slice()))
    }

    /// Windows for a label.
    pub fn windows(&self, label: &Label) -> &[TimeWindow] {
        self.windows.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All shift codes, sorted.
    pub fn shift_codes(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().filter_map(|l| match l {
            Label::Shift(code) => Some(code.as_str()),
            Label::Breaks(_) => None,
        })
    }

    /// Number of labels.
    pub fn label_count(&self) -> usize {
        self.windows.len()
    }

    /// Total number of windows across all labels.
    pub fn window_count(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }

    /// Whether the index has no labels.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// A break cell's text, or `None` when the cell is empty or `"n/a"`.
fn break_cell(cell: &Option<String>) -> Option<&str> {
    cell.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("n/a"))
}

/// Parses a cell that must hold a concrete week point.
fn required_point(row: usize, column: &str, text: &str) -> Result<WeekPoint, ScheduleParseError> {
    if text.trim().is_empty() {
        return Err(ScheduleParseError::MissingTime {
            row,
            column: column.to_string(),
        });
    }
    match WeekPoint::parse_endpoint(text) {
        Ok(Some(point)) => Ok(point),
        Ok(None) => Err(ScheduleParseError::UnboundedEndpoint {
            row,
            column: column.to_string(),
        }),
        Err(EndpointParseError::Malformed) => Err(ScheduleParseError::InvalidTime {
            row,
            column: column.to_string(),
            value: text.to_string(),
        }),
        Err(EndpointParseError::Weekday(source)) => Err(ScheduleParseError::UnknownWeekday {
            row,
            column: column.to_string(),
            source,
        }),
    }
}
