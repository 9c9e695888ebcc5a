// libs/doctor-cell/src/services/schedule.rs
//
// Doctor schedules are stored as one string of comma-separated entries:
//
//     MONDAY - 09:00AM TO 05:00PM, WEDNESDAY - 10:00AM TO 02:00PM

use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::models::{AvailabilityEntry, DayOfWeek, TimeOfDay, WeeklyAvailability};

const ENTRY_SEPARATOR: char = ',';
const DAY_SEPARATOR: &str = " - ";
const RANGE_SEPARATOR: &str = " TO ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleParseError {
    #[error("missing ' - ' between day and time range")]
    MissingDaySeparator,

    #[error("missing ' TO ' between start and end time")]
    MissingRangeSeparator,

    #[error("unknown day '{0}'")]
    UnknownDay(String),

    #[error("malformed time '{0}'")]
    MalformedTime(String),

    #[error("start {start} is not before end {end}")]
    EmptyRange { start: String, end: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub raw: String,
    pub reason: ScheduleParseError,
}

impl fmt::Display for RejectedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.raw, self.reason)
    }
}

/// Entries that parsed, plus the ones that didn't and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSchedule {
    pub availability: WeeklyAvailability,
    pub rejected: Vec<RejectedEntry>,
}

impl ParsedSchedule {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parse a raw schedule string. Never fails as a whole: malformed entries are
/// reported in `rejected` and logged, well-formed ones are kept in input order.
pub fn parse(raw: &str) -> ParsedSchedule {
    let mut parsed = ParsedSchedule::default();

    for segment in raw.split(ENTRY_SEPARATOR) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        match parse_entry(segment) {
            Ok(entry) => parsed.availability.entries.push(entry),
            Err(reason) => {
                warn!("Skipping schedule entry '{}': {}", segment, reason);
                parsed.rejected.push(RejectedEntry {
                    raw: segment.to_string(),
                    reason,
                });
            }
        }
    }

    parsed
}

/// Parse a single `DAY - START TO END` entry.
pub fn parse_entry(segment: &str) -> Result<AvailabilityEntry, ScheduleParseError> {
    let (day, range) = segment
        .split_once(DAY_SEPARATOR)
        .ok_or(ScheduleParseError::MissingDaySeparator)?;

    let day: DayOfWeek = day
        .trim()
        .parse()
        .map_err(|_| ScheduleParseError::UnknownDay(day.trim().to_string()))?;

    let (start, end) = range
        .split_once(RANGE_SEPARATOR)
        .ok_or(ScheduleParseError::MissingRangeSeparator)?;

    let start = parse_time(start)?;
    let end = parse_time(end)?;

    AvailabilityEntry::new(day, start, end).ok_or_else(|| ScheduleParseError::EmptyRange {
        start: start.schedule_format(),
        end: end.schedule_format(),
    })
}

fn parse_time(raw: &str) -> Result<TimeOfDay, ScheduleParseError> {
    raw.trim()
        .parse()
        .map_err(|_| ScheduleParseError::MalformedTime(raw.trim().to_string()))
}

pub fn format_entry(entry: &AvailabilityEntry) -> String {
    entry.to_string()
}

/// Canonical form of a whole schedule; `parse(format_schedule(a))` yields `a`.
pub fn format_schedule(availability: &WeeklyAvailability) -> String {
    availability
        .entries
        .iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append one entry to a stored schedule string the way the admin form does.
pub fn append_entry(existing: &str, entry: &AvailabilityEntry) -> String {
    let existing = existing.trim().trim_end_matches(ENTRY_SEPARATOR).trim_end();
    if existing.is_empty() {
        format_entry(entry)
    } else {
        format!("{}, {}", existing, format_entry(entry))
    }
}
