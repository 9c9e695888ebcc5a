// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::{AvailabilityEntry, DayOfWeek, TimeOfDay};

// ==============================================================================
// SLOT MODELS
// ==============================================================================

/// A requested (doctor, date, time) before any checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCandidate {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: TimeOfDay,
}

/// A candidate that passed every admissibility check, with the day and the
/// availability entry that admitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedSlot {
    pub candidate: SlotCandidate,
    pub day: DayOfWeek,
    pub entry: AvailabilityEntry,
}

impl ValidatedSlot {
    pub fn doctor_id(&self) -> Uuid {
        self.candidate.doctor_id
    }

    pub fn date(&self) -> NaiveDate {
        self.candidate.date
    }

    pub fn time(&self) -> TimeOfDay {
        self.candidate.time
    }
}

// ==============================================================================
// BOOKING MODELS
// ==============================================================================

/// Row of the `appointments` table. `time` is stored in display form (`09:00 AM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Unpaid,
    Paid,
}

/// Row of the `bills` table; one per booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultFeeRecord {
    pub appointment_id: Uuid,
    pub amount: f64,
    pub status: BillStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointment: Booking,
    pub bill: ConsultFeeRecord,
}

/// What the committer hands to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub consult_fee: f64,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SlotRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    /// `09:00 AM`, `9:00am` or `09:00`.
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotCheckResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub day: DayOfWeek,
    pub time: TimeOfDay,
    pub booked: u32,
    pub remaining: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSlot {
    pub time: TimeOfDay,
    pub booked: u32,
    pub remaining: u32,
    pub bookable: bool,
    /// Why the slot can't be booked, when it can't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityBoard {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub day: DayOfWeek,
    pub capacity: u32,
    pub slots: Vec<BoardSlot>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Admissibility failures, in the order the validator checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Doctor is not available on {day}")]
    DayNotAvailable { day: DayOfWeek },

    #[error("Selected time has already passed")]
    TimeInPast,

    #[error("Selected time is outside the doctor's schedule on {day}")]
    OutsideSchedule { day: DayOfWeek },

    #[error("Appointments start every {slot_minutes} minutes")]
    OffGrid { slot_minutes: u16 },
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Time slot is fully booked")]
    SlotFull,

    #[error("Appointment already exists")]
    DuplicateBooking,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Booking store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Caller's role may not perform the operation.
    #[error("{0}")]
    Forbidden(String),
}
