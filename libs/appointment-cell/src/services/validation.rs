// libs/appointment-cell/src/services/validation.rs
use chrono::{Datelike, NaiveDateTime};
use tracing::debug;

use doctor_cell::models::{DayOfWeek, TimeOfDay, WeeklyAvailability};
use doctor_cell::services::SLOT_MINUTES;

use crate::models::{SlotCandidate, ValidatedSlot, ValidationError};

/// Pure admissibility checks for a requested slot. No I/O; `now` is supplied
/// by the caller so the clock stays at the edge.
#[derive(Debug, Clone, Copy)]
pub struct SlotValidator {
    slot_minutes: u16,
}

impl Default for SlotValidator {
    fn default() -> Self {
        Self {
            slot_minutes: SLOT_MINUTES,
        }
    }
}

impl SlotValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks run in a fixed order and stop at the first failure:
    /// day offered, not in the past, inside a range, on the grid.
    pub fn validate(
        &self,
        candidate: &SlotCandidate,
        availability: &WeeklyAvailability,
        now: NaiveDateTime,
    ) -> Result<ValidatedSlot, ValidationError> {
        let day = DayOfWeek::from(candidate.date.weekday());

        if !availability.offers(day) {
            debug!("Rejecting {}: doctor does not work on {}", candidate.date, day);
            return Err(ValidationError::DayNotAvailable { day });
        }

        let today = now.date();
        if candidate.date < today {
            return Err(ValidationError::TimeInPast);
        }
        if candidate.date == today && candidate.time <= TimeOfDay::from_naive_time(now.time()) {
            debug!("Rejecting {} {}: already passed", candidate.date, candidate.time);
            return Err(ValidationError::TimeInPast);
        }

        let entry = availability
            .entries_for(day)
            .find(|entry| entry.contains(candidate.time))
            .copied()
            .ok_or(ValidationError::OutsideSchedule { day })?;

        if !candidate.time.is_on_grid(self.slot_minutes) {
            return Err(ValidationError::OffGrid {
                slot_minutes: self.slot_minutes,
            });
        }

        Ok(ValidatedSlot {
            candidate: *candidate,
            day,
            entry,
        })
    }
}
