//! CSV loading of schedules and machine readings.
//!
//! # Schedule table
//!
//! | Shift Code | Shift Start Time | Shift End Time | Break 1 Start | Break 1 End | Lunch Start | ... |
//! |------------|------------------|----------------|---------------|-------------|-------------|-----|
//! | A | Monday 06:00 | Monday 14:00 | Monday 09:00 | Monday 09:15 | | |
//!
//! Every column whose header contains "Break" or "Lunch" is a break cell;
//! cells pair positionally in header order.
//!
//! # Machine table
//!
//! A `Time` column plus one column per machine holding its state. Empty
//! cells mean "no reading" for that machine at that time. Machine headers
//! must be unique.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::IngestError;
use crate::models::{
    MachineStreams, Sample, ScheduleRow, SHIFT_CODE_COLUMN, SHIFT_END_COLUMN, SHIFT_START_COLUMN,
};

/// Timestamp column of the machine table.
pub const TIME_COLUMN: &str = "Time";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Reads schedule rows from CSV.
pub fn read_schedule_rows<R: Read>(reader: R) -> Result<Vec<ScheduleRow>, IngestError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
    };
    let code_idx = column(SHIFT_CODE_COLUMN)?;
    let start_idx = column(SHIFT_START_COLUMN)?;
    let end_idx = column(SHIFT_END_COLUMN)?;

    let break_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            let h = h.to_ascii_lowercase();
            h.contains("break") || h.contains("lunch")
        })
        .map(|(i, _)| i)
        .collect();
    let break_columns: Vec<String> = break_idx.iter().map(|&i| headers[i].to_string()).collect();

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").to_string();
        rows.push(ScheduleRow {
            shift_code: cell(code_idx),
            shift_start: cell(start_idx),
            shift_end: cell(end_idx),
            break_cells: break_idx
                .iter()
                .map(|&i| record.get(i).filter(|v| !v.is_empty()).map(str::to_string))
                .collect(),
            break_columns: break_columns.clone(),
        });
    }

    debug!(rows = rows.len(), break_columns = break_columns.len(), "schedule CSV read");
    Ok(rows)
}

/// Reads the wide machine table into per-machine streams.
///
/// Each machine's durations are the gaps between its own readings; its
/// last reading gets `fallback_secs`.
pub fn read_machine_samples<R: Read>(
    reader: R,
    fallback_secs: f64,
) -> Result<MachineStreams, IngestError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv.headers()?.clone();

    let time_idx = headers
        .iter()
        .position(|h| h == TIME_COLUMN)
        .ok_or_else(|| IngestError::MissingColumn(TIME_COLUMN.to_string()))?;

    let machines: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|&(i, h)| i != time_idx && !h.is_empty())
        .map(|(i, h)| (i, h.to_string()))
        .collect();
    let mut seen = BTreeSet::new();
    if let Some((_, dup)) = machines.iter().find(|(_, m)| !seen.insert(m.as_str())) {
        return Err(IngestError::DuplicateColumn(dup.clone()));
    }

    let mut readings: BTreeMap<String, Vec<(NaiveDateTime, String)>> = machines
        .iter()
        .map(|(_, m)| (m.clone(), Vec::new()))
        .collect();

    for (row, record) in csv.records().enumerate() {
        let record = record?;
        let raw = record.get(time_idx).unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        let ts = parse_timestamp(raw).ok_or_else(|| IngestError::InvalidTimestamp {
            row: row + 1,
            value: raw.to_string(),
        })?;

        for (idx, machine) in &machines {
            if let Some(state) = record.get(*idx).filter(|v| !v.is_empty()) {
                if let Some(series) = readings.get_mut(machine) {
                    series.push((ts, state.to_string()));
                }
            }
        }
    }

    let streams: MachineStreams = readings
        .into_iter()
        .map(|(machine, series)| {
            let samples = Sample::series(&machine, series, fallback_secs);
            (machine, samples)
        })
        .collect();

    debug!(machines = streams.len(), "machine CSV read");
    Ok(streams)
}

/// Opens and reads a schedule CSV file.
pub fn load_schedule_csv(path: impl AsRef<Path>) -> Result<Vec<ScheduleRow>, IngestError> {
    read_schedule_rows(open(path.as_ref())?)
}

/// Opens and reads a machine CSV file.
pub fn load_machine_csv(
    path: impl AsRef<Path>,
    fallback_secs: f64,
) -> Result<MachineStreams, IngestError> {
    read_machine_samples(open(path.as_ref())?, fallback_secs)
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a timestamp in any accepted format.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
}
