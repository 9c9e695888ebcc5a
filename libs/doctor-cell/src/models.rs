// libs/doctor-cell/src/models.rs
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveTime, Timelike, Weekday};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;

// ==============================================================================
// TIME OF DAY
// ==============================================================================

pub const MINUTES_PER_DAY: u16 = 24 * 60;

static TWELVE_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})\s*([AaPp][Mm])$").expect("valid 12-hour pattern")
});

static TWENTY_FOUR_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::00)?$").expect("valid 24-hour pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("unrecognised time '{0}', expected hh:mm AM/PM or HH:MM")]
    Unrecognised(String),

    #[error("time '{0}' is out of range")]
    OutOfRange(String),
}

/// Wall-clock time with minute resolution, held as minutes since midnight.
///
/// There are two text forms. [`TimeOfDay::schedule_format`] (`09:00AM`) is what
/// the serialized doctor schedule uses. `Display` (`09:00 AM`) is the display
/// form used for slots and for the `time` column of bookings, so capacity
/// lookups and inserts always agree on the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const NOON: TimeOfDay = TimeOfDay(720);

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(TimeOfDay(minutes))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(TimeOfDay((hour * 60 + minute) as u16))
    }

    /// Seconds are dropped.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        TimeOfDay((time.hour() * 60 + time.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u32 {
        u32::from(self.0 / 60)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.0 % 60)
    }

    pub fn is_on_grid(self, step_minutes: u16) -> bool {
        step_minutes != 0 && self.0 % step_minutes == 0
    }

    /// `09:00AM`, the form stored in doctor schedules.
    pub fn schedule_format(self) -> String {
        let (hour, meridian) = self.twelve_hour();
        format!("{:02}:{:02}{}", hour, self.minute(), meridian)
    }

    fn twelve_hour(self) -> (u32, &'static str) {
        let meridian = if self.0 < Self::NOON.0 { "AM" } else { "PM" };
        let hour = match self.hour() % 12 {
            0 => 12,
            h => h,
        };
        (hour, meridian)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hour, meridian) = self.twelve_hour();
        write!(f, "{:02}:{:02} {}", hour, self.minute(), meridian)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let out_of_range = || TimeParseError::OutOfRange(raw.to_string());

        if let Some(caps) = TWELVE_HOUR.captures(raw) {
            let hour: u32 = caps[1].parse().map_err(|_| out_of_range())?;
            let minute: u32 = caps[2].parse().map_err(|_| out_of_range())?;
            if !(1..=12).contains(&hour) {
                return Err(out_of_range());
            }
            let pm = caps[3].eq_ignore_ascii_case("PM");
            let hour = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            };
            return TimeOfDay::from_hm(hour, minute).ok_or_else(out_of_range);
        }

        if let Some(caps) = TWENTY_FOUR_HOUR.captures(raw) {
            let hour: u32 = caps[1].parse().map_err(|_| out_of_range())?;
            let minute: u32 = caps[2].parse().map_err(|_| out_of_range())?;
            return TimeOfDay::from_hm(hour, minute).ok_or_else(out_of_range);
        }

        Err(TimeParseError::Unrecognised(raw.to_string()))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// DAY OF WEEK
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown day '{0}'")]
pub struct UnknownDay(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "SUNDAY",
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-sensitive: only the canonical uppercase names are accepted.
impl FromStr for DayOfWeek {
    type Err = UnknownDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or_else(|| UnknownDay(s.to_string()))
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }
}

// ==============================================================================
// WEEKLY AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub day: DayOfWeek,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl AvailabilityEntry {
    /// `None` unless `start < end`.
    pub fn new(day: DayOfWeek, start: TimeOfDay, end: TimeOfDay) -> Option<Self> {
        (start < end).then_some(Self { day, start, end })
    }

    /// Half-open: `start` is bookable, `end` is not.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.start <= time && time < self.end
    }
}

/// `MONDAY - 09:00AM TO 05:00PM`
impl fmt::Display for AvailabilityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} TO {}",
            self.day,
            self.start.schedule_format(),
            self.end.schedule_format()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyAvailability {
    pub entries: Vec<AvailabilityEntry>,
}

impl WeeklyAvailability {
    pub fn new(entries: Vec<AvailabilityEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for(&self, day: DayOfWeek) -> impl Iterator<Item = &AvailabilityEntry> + '_ {
        self.entries.iter().filter(move |entry| entry.day == day)
    }

    pub fn offers(&self, day: DayOfWeek) -> bool {
        self.entries_for(day).next().is_some()
    }
}

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

/// Doctor record as read from the directory. `schedule` is the raw admin-edited string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
    pub consult_fee: f64,
    #[serde(default)]
    pub schedule: String,
}

#[derive(Debug, Serialize)]
pub struct DaySlots {
    pub day: DayOfWeek,
    pub slots: Vec<TimeOfDay>,
}

#[derive(Debug, Serialize)]
pub struct RejectedEntryView {
    pub entry: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorScheduleResponse {
    pub doctor_id: Uuid,
    pub name: String,
    pub specialization: String,
    pub schedule: String,
    pub entries: WeeklyAvailability,
    pub rejected_entries: Vec<RejectedEntryView>,
    pub slots: Vec<DaySlots>,
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Doctor directory unavailable: {0}")]
    Unavailable(String),
}

impl From<SupabaseError> for DoctorError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::NotFound(_) => DoctorError::NotFound,
            SupabaseError::Transport(e) => DoctorError::Unavailable(e.to_string()),
            other => DoctorError::DatabaseError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> TimeOfDay {
        raw.parse().unwrap()
    }

    #[test]
    fn test_twelve_hour_edges() {
        assert_eq!(t("12:00AM").minutes(), 0);
        assert_eq!(t("12:30 am").minutes(), 30);
        assert_eq!(t("12:00PM").minutes(), 720);
        assert_eq!(t("9:00AM").minutes(), 540);
        assert_eq!(t("11:59 PM").minutes(), 1439);
    }

    #[test]
    fn test_twenty_four_hour_input() {
        assert_eq!(t("09:00").minutes(), 540);
        assert_eq!(t("17:30:00").minutes(), 1050);
        assert_eq!(t("0:00"), TimeOfDay::MIDNIGHT);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!("13:00PM".parse::<TimeOfDay>(), Err(TimeParseError::OutOfRange(_))));
        assert!(matches!("24:00".parse::<TimeOfDay>(), Err(TimeParseError::OutOfRange(_))));
        assert!(matches!("09:60".parse::<TimeOfDay>(), Err(TimeParseError::OutOfRange(_))));
        assert!(matches!("noon".parse::<TimeOfDay>(), Err(TimeParseError::Unrecognised(_))));
        assert!(matches!("09:00:15".parse::<TimeOfDay>(), Err(TimeParseError::Unrecognised(_))));
        assert!(matches!("0:00AM".parse::<TimeOfDay>(), Err(TimeParseError::OutOfRange(_))));
    }

    #[test]
    fn test_both_text_forms() {
        let time = t("17:00");
        assert_eq!(time.to_string(), "05:00 PM");
        assert_eq!(time.schedule_format(), "05:00PM");
        assert_eq!(TimeOfDay::MIDNIGHT.to_string(), "12:00 AM");
        assert_eq!(TimeOfDay::NOON.schedule_format(), "12:00PM");
    }

    #[test]
    fn test_every_minute_survives_display_round_trip() {
        for minutes in 0..MINUTES_PER_DAY {
            let time = TimeOfDay::from_minutes(minutes).unwrap();
            assert_eq!(t(&time.to_string()), time);
            assert_eq!(t(&time.schedule_format()), time);
        }
    }

    #[test]
    fn test_day_names_are_case_sensitive() {
        assert_eq!("MONDAY".parse::<DayOfWeek>().unwrap(), DayOfWeek::Monday);
        assert!("Monday".parse::<DayOfWeek>().is_err());
        assert_eq!(DayOfWeek::from(Weekday::Sun), DayOfWeek::Sunday);
    }

    #[test]
    fn test_entry_is_half_open() {
        let entry = AvailabilityEntry::new(DayOfWeek::Monday, t("09:00"), t("17:00")).unwrap();
        assert!(entry.contains(t("09:00")));
        assert!(entry.contains(t("16:59")));
        assert!(!entry.contains(t("17:00")));
        assert!(AvailabilityEntry::new(DayOfWeek::Monday, t("17:00"), t("09:00")).is_none());
    }

    #[test]
    fn test_time_serializes_as_display_form() {
        assert_eq!(serde_json::to_string(&t("14:30")).unwrap(), "\"02:30 PM\"");
        let parsed: TimeOfDay = serde_json::from_str("\"14:30\"").unwrap();
        assert_eq!(parsed, t("02:30 PM"));
    }
}
