//! Jam performance indicators.
//!
//! Derives the display figures from the output tables of a run.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total jams | Sum of jam events over all machines |
//! | Jam share | Machine jams / total jams × 100 |
//! | Avg jam time | ERROR seconds in shift / jams in shift / 60 (minutes) |
//! | State hours | State seconds in shift / 3600 |

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::tables::AggregateTables;

/// A machine's part of all jam events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineJamShare {
    /// Machine identifier.
    pub machine: String,
    /// Jam events across all shifts.
    pub jams: u64,
    /// Percentage of all jam events (0.0..=100.0).
    pub share_pct: f64,
}

/// One machine within one shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineShiftSummary {
    /// Machine identifier.
    pub machine: String,
    /// Jam events touching this shift.
    pub jams: u64,
    /// Average jam length (minutes); 0.0 without jams.
    pub avg_jam_minutes: f64,
    /// Hours per state.
    pub state_hours: BTreeMap<String, f64>,
}

/// All machines within one shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftSummary {
    /// Shift code.
    pub shift_code: String,
    /// Machines with recorded time in this shift, sorted.
    pub machines: Vec<MachineShiftSummary>,
}

/// Jam report for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JamKpi {
    /// First and last sample timestamp.
    pub datetime_range: Option<(NaiveDateTime, NaiveDateTime)>,
    /// Jam events across all machines.
    pub total_jams: u64,
    /// Per-machine jam counts and shares, sorted by machine.
    pub machine_shares: Vec<MachineJamShare>,
    /// Per-shift breakdown, sorted by shift code.
    pub shifts: Vec<ShiftSummary>,
}

impl JamKpi {
    /// Computes the report.
    ///
    /// # Arguments
    /// * `tables` - Output of the aggregation.
    /// * `error_state` - State whose seconds count as jam time.
    /// * `datetime_range` - Passed through for display.
    pub fn calculate(
        tables: &AggregateTables,
        error_state: &str,
        datetime_range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> Self {
        let total_jams = tables.total_jams();

        let machine_shares = tables
            .overall_jam_count
            .iter()
            .map(|(machine, &jams)| MachineJamShare {
                machine: machine.clone(),
                jams,
                share_pct: if total_jams > 0 {
                    jams as f64 / total_jams as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        let shifts = tables
            .duration_totals
            .iter()
            .map(|(shift_code, machines)| ShiftSummary {
                shift_code: shift_code.clone(),
                machines: machines
                    .iter()
                    .map(|(machine, states)| {
                        let jams = tables.jams_in_shift(shift_code, machine);
                        let error_secs = states.get(error_state).copied().unwrap_or(0.0);
                        let avg_jam_minutes = if jams > 0 {
                            error_secs / jams as f64 / 60.0
                        } else {
                            0.0
                        };
                        MachineShiftSummary {
                            machine: machine.clone(),
                            jams,
                            avg_jam_minutes,
                            state_hours: states
                                .iter()
                                .map(|(state, secs)| (state.clone(), secs / 3600.0))
                                .collect(),
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            datetime_range,
            total_jams,
            machine_shares,
            shifts,
        }
    }

    /// Share entry for a machine.
    pub fn share(&self, machine: &str) -> Option<&MachineJamShare> {
        self.machine_shares.iter().find(|s| s.machine == machine)
    }

    /// Summary of one machine within one shift.
    pub fn shift_machine(&self, shift_code: &str, machine: &str) -> Option<&MachineShiftSummary> {
        self.shifts
            .iter()
            .find(|s| s.shift_code == shift_code)
            .and_then(|s| s.machines.iter().find(|m| m.machine == machine))
    }
}

impl fmt::Display for JamKpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((start, end)) = self.datetime_range {
            writeln!(f, "DateTime Range: {start} | {end}")?;
        }

        writeln!(f, "Overall Machine Jams")?;
        for share in &self.machine_shares {
            writeln!(
                f,
                "  {}: {} jam(s) ({:.2}%)",
                share.machine, share.jams, share.share_pct
            )?;
        }
        writeln!(f, "  Total Jams: {}", self.total_jams)?;

        for shift in &self.shifts {
            writeln!(f, "{}", shift.shift_code)?;
            for m in &shift.machines {
                writeln!(
                    f,
                    "  {} ({} jams, avg jam {:.2} mins)",
                    m.machine, m.jams, m.avg_jam_minutes
                )?;
                for (state, hours) in &m.state_hours {
                    writeln!(f, "    {state}: {hours:.2} hrs")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tables() -> AggregateTables {
        let mut t = AggregateTables::new();
        t.add_duration("A", "M1", "ERROR", 1200.0);
        t.add_duration("A", "M1", "AVAILABLE", 5400.0);
        t.add_duration("B", "M1", "AVAILABLE", 3600.0);
        t.add_duration("A", "M2", "ERROR", 300.0);
        t.record_jam("M1", ["A"]);
        t.record_jam("M1", ["A"]);
        t.record_jam("M2", ["A"]);
        t
    }

    #[test]
    fn test_kpi_shares() {
        let kpi = JamKpi::calculate(&sample_tables(), "ERROR", None);
        assert_eq!(kpi.total_jams, 3);
        let m1 = kpi.share("M1").unwrap();
        assert_eq!(m1.jams, 2);
        assert!((m1.share_pct - 200.0 / 3.0).abs() < 1e-9);
        let sum: f64 = kpi.machine_shares.iter().map(|s| s.share_pct).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_kpi_shift_breakdown() {
        let kpi = JamKpi::calculate(&sample_tables(), "ERROR", None);
        let a_m1 = kpi.shift_machine("A", "M1").unwrap();
        assert_eq!(a_m1.jams, 2);
        assert!((a_m1.avg_jam_minutes - 10.0).abs() < 1e-9); // 1200 s / 2 / 60
        assert!((a_m1.state_hours["AVAILABLE"] - 1.5).abs() < 1e-9);

        let b_m1 = kpi.shift_machine("B", "M1").unwrap();
        assert_eq!(b_m1.jams, 0);
        assert_eq!(b_m1.avg_jam_minutes, 0.0);
        assert_eq!(
            kpi.shifts.iter().map(|s| s.shift_code.as_str()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = JamKpi::calculate(&AggregateTables::new(), "ERROR", None);
        assert_eq!(kpi.total_jams, 0);
        assert!(kpi.machine_shares.is_empty());
        assert!(kpi.shifts.is_empty());
        assert_eq!(kpi.to_string(), "Overall Machine Jams\n  Total Jams: 0\n");
    }

    #[test]
    fn test_kpi_display() {
        let kpi = JamKpi::calculate(&sample_tables(), "ERROR", None);
        let text = kpi.to_string();
        assert!(text.contains("  M1: 2 jam(s) (66.67%)"));
        assert!(text.contains("  M1 (2 jams, avg jam 10.00 mins)"));
        assert!(text.contains("    AVAILABLE: 1.50 hrs"));
        assert!(text.contains("  Total Jams: 3"));
    }

    #[test]
    fn test_kpi_serializes() {
        let kpi = JamKpi::calculate(&sample_tables(), "ERROR", None);
        let json = serde_json::to_value(&kpi).unwrap();
        assert_eq!(json["total_jams"], 3);
        assert_eq!(json["shifts"][0]["shift_code"], "A");
    }
}
