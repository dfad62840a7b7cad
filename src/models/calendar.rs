//! Weekly calendar windows.
//!
//! Shift and break windows recur every week. A window is defined by a
//! start and end point, each a weekday plus a clock time. Windows may
//! wrap across the week boundary (e.g. Friday 22:00 → Monday 06:00).
//!
//! # Boundary Semantics
//! Start and end clock times only constrain the first and last calendar
//! day of the window. Any day strictly between them matches at every
//! clock time. Both boundaries are inclusive.

use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::UnknownWeekdayError;

/// Parses a weekday name ("Monday", "monday", "Mon", ...).
pub fn parse_weekday(text: &str) -> Result<Weekday, UnknownWeekdayError> {
    text.trim()
        .parse::<Weekday>()
        .map_err(|_| UnknownWeekdayError(text.trim().to_string()))
}

/// Full English name of a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A point in the recurring week: weekday + clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekPoint {
    /// Day of week.
    pub day: Weekday,
    /// Clock time on that day.
    pub time: NaiveTime,
}

/// Reasons endpoint text can fail to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EndpointParseError {
    /// Not of the form `<Weekday> <HH:MM>`.
    Malformed,
    /// The day name is not a weekday.
    Weekday(UnknownWeekdayError),
}

impl WeekPoint {
    /// Creates a week point.
    pub fn new(day: Weekday, time: NaiveTime) -> Self {
        Self { day, time }
    }

    /// Creates a week point from an hour and minute.
    ///
    /// Returns `None` for an out-of-range clock time.
    pub fn at(day: Weekday, hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { day, time })
    }

    /// Parses endpoint text `"<Weekday> <HH:MM>"`.
    ///
    /// The literal `"n/a"` (any case) is the unbounded endpoint and
    /// yields `Ok(None)`.
    pub(crate) fn parse_endpoint(text: &str) -> Result<Option<Self>, EndpointParseError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("n/a") {
            return Ok(None);
        }

        let mut parts = text.split_whitespace();
        let (Some(day), Some(clock), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EndpointParseError::Malformed);
        };

        let day = parse_weekday(day).map_err(EndpointParseError::Weekday)?;
        let time =
            NaiveTime::parse_from_str(clock, "%H:%M").map_err(|_| EndpointParseError::Malformed)?;
        Ok(Some(Self { day, time }))
    }
}

impl fmt::Display for WeekPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", weekday_name(self.day), self.time.format("%H:%M"))
    }
}

/// A recurring weekly window [start, end], both ends inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Window start.
    pub start: WeekPoint,
    /// Window end.
    pub end: WeekPoint,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: WeekPoint, end: WeekPoint) -> Self {
        Self { start, end }
    }

    /// Whether the window's end day falls before its start day, i.e. it
    /// runs into the following week.
    #[inline]
    pub fn wraps_week(&self) -> bool {
        self.end.day.num_days_from_monday() < self.start.day.num_days_from_monday()
    }

    /// Whether `(weekday, time)` falls within this window.
    ///
    /// # Algorithm
    /// Weekdays map to 0..=6 (Monday = 0). A wrapping window has 7 added
    /// to its end ordinal; a point whose ordinal is below the start has 7
    /// added to its own. The point is a day-level match iff
    /// `start <= current <= end`. Then:
    /// - start, current and end on the same day: `start_time <= t <= end_time`
    /// - on the start day only: `t >= start_time`
    /// - on the end day only: `t <= end_time`
    /// - strictly between: always
    pub fn matches(&self, weekday: Weekday, time: NaiveTime) -> bool {
        let start = self.start.day.num_days_from_monday();
        let mut end = self.end.day.num_days_from_monday();
        let mut current = weekday.num_days_from_monday();

        if end < start {
            end += 7;
        }
        if current < start {
            current += 7;
        }

        if !(start <= current && current <= end) {
            return false;
        }

        match (current == start, current == end) {
            (true, true) => self.start.time <= time && time <= self.end.time,
            (true, false) => time >= self.start.time,
            (false, true) => time <= self.end.time,
            (false, false) => true,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window(sd: Weekday, sh: u32, sm: u32, ed: Weekday, eh: u32, em: u32) -> TimeWindow {
        TimeWindow::new(
            WeekPoint::at(sd, sh, sm).unwrap(),
            WeekPoint::at(ed, eh, em).unwrap(),
        )
    }

    #[test]
    fn test_same_day_window() {
        let w = window(Weekday::Tue, 6, 0, Weekday::Tue, 14, 0);
        assert!(w.matches(Weekday::Tue, t(6, 0))); // inclusive start
        assert!(w.matches(Weekday::Tue, t(10, 30)));
        assert!(w.matches(Weekday::Tue, t(14, 0))); // inclusive end
        assert!(!w.matches(Weekday::Tue, t(5, 59)));
        assert!(!w.matches(Weekday::Tue, t(14, 1)));
        assert!(!w.matches(Weekday::Wed, t(10, 0)));
        assert!(!w.matches(Weekday::Mon, t(10, 0)));
    }

    #[test]
    fn test_same_day_matches_only_that_day() {
        let w = window(Weekday::Thu, 0, 0, Weekday::Thu, 23, 59);
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            assert!(!w.matches(day, t(12, 0)), "{day:?} should not match");
        }
        assert!(w.matches(Weekday::Thu, t(12, 0)));
    }

    #[test]
    fn test_weekend_wrap() {
        let w = window(Weekday::Fri, 22, 0, Weekday::Mon, 6, 0);
        assert!(w.wraps_week());
        assert!(w.matches(Weekday::Sat, t(12, 0)));
        assert!(w.matches(Weekday::Sun, t(0, 0)));
        assert!(w.matches(Weekday::Mon, t(5, 59)));
        assert!(w.matches(Weekday::Fri, t(22, 0)));
        assert!(!w.matches(Weekday::Mon, t(6, 1)));
        assert!(!w.matches(Weekday::Thu, t(23, 0)));
        assert!(!w.matches(Weekday::Fri, t(21, 59)));
        assert!(!w.matches(Weekday::Tue, t(3, 0)));
    }

    #[test]
    fn test_overnight_window() {
        let w = window(Weekday::Mon, 22, 0, Weekday::Tue, 6, 0);
        assert!(!w.wraps_week());
        assert!(w.matches(Weekday::Mon, t(23, 0)));
        assert!(w.matches(Weekday::Tue, t(2, 0)));
        assert!(!w.matches(Weekday::Mon, t(21, 0)));
        assert!(!w.matches(Weekday::Tue, t(7, 0)));
    }

    #[test]
    fn test_middle_days_unconditional() {
        let w = window(Weekday::Mon, 23, 0, Weekday::Thu, 1, 0);
        assert!(w.matches(Weekday::Tue, t(0, 0)));
        assert!(w.matches(Weekday::Wed, t(23, 59)));
    }

    #[test]
    fn test_inverted_same_day_never_matches() {
        // Same weekday with start after end is not treated as a wrap.
        let w = window(Weekday::Wed, 22, 0, Weekday::Wed, 6, 0);
        assert!(!w.matches(Weekday::Wed, t(23, 0)));
        assert!(!w.matches(Weekday::Wed, t(5, 0)));
        assert!(!w.matches(Weekday::Thu, t(1, 0)));
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("Monday"), Ok(Weekday::Mon));
        assert_eq!(parse_weekday(" sunday "), Ok(Weekday::Sun));
        assert_eq!(parse_weekday("Fri"), Ok(Weekday::Fri));
        assert_eq!(
            parse_weekday("Caturday"),
            Err(UnknownWeekdayError("Caturday".into()))
        );
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            WeekPoint::parse_endpoint("Monday 06:30"),
            Ok(WeekPoint::at(Weekday::Mon, 6, 30))
        );
        assert_eq!(
            WeekPoint::parse_endpoint("  Friday   7:05 "),
            Ok(WeekPoint::at(Weekday::Fri, 7, 5))
        );
        assert_eq!(WeekPoint::parse_endpoint("n/a"), Ok(None));
        assert_eq!(WeekPoint::parse_endpoint("N/A"), Ok(None));
        assert_eq!(
            WeekPoint::parse_endpoint("Monday"),
            Err(EndpointParseError::Malformed)
        );
        assert_eq!(
            WeekPoint::parse_endpoint("Monday 25:00"),
            Err(EndpointParseError::Malformed)
        );
        assert_eq!(
            WeekPoint::parse_endpoint("Monday 06:00 extra"),
            Err(EndpointParseError::Malformed)
        );
        assert!(matches!(
            WeekPoint::parse_endpoint("Someday 06:00"),
            Err(EndpointParseError::Weekday(_))
        ));
    }

    #[test]
    fn test_display() {
        let w = window(Weekday::Fri, 22, 0, Weekday::Mon, 6, 0);
        assert_eq!(w.to_string(), "Friday 22:00 → Monday 06:00");
    }
}
