// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use doctor_cell::models::TimeOfDay;
use shared_config::DEFAULT_SLOT_CAPACITY;

use crate::models::{BillStatus, Booking, BookingConfirmation, ConsultFeeRecord, NewBooking};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("booking for this patient and slot already exists")]
    UniqueViolation,

    #[error("slot is at capacity")]
    CapacityExceeded,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Database(String),
}

/// Persistence port for bookings and their bills.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings already holding `(doctor_id, date, time)`.
    async fn count_bookings(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: TimeOfDay,
    ) -> Result<u32, StoreError>;

    /// Atomically, under a per-slot lock: refuse a patient already holding the
    /// slot, then refuse at the store's own capacity, then insert the booking and
    /// its unpaid bill. Either both rows exist afterwards or neither.
    async fn commit_booking(&self, booking: NewBooking) -> Result<BookingConfirmation, StoreError>;

    async fn bookings_for_patient(&self, patient_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    async fn bookings_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, StoreError>;
}

#[derive(Default)]
struct Tables {
    appointments: Vec<Booking>,
    bills: HashMap<Uuid, ConsultFeeRecord>,
}

/// Store kept in process memory. One mutex covers both tables, so the
/// count-check-insert in `commit_booking` is serialized like the database function.
pub struct InMemoryBookingStore {
    tables: Mutex<Tables>,
    capacity: u32,
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SLOT_CAPACITY)
    }
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            capacity,
        }
    }

    pub async fn booking_count(&self) -> usize {
        self.tables.lock().await.appointments.len()
    }

    pub async fn bill_for(&self, appointment_id: Uuid) -> Option<ConsultFeeRecord> {
        self.tables.lock().await.bills.get(&appointment_id).cloned()
    }

    pub async fn bill_count(&self) -> usize {
        self.tables.lock().await.bills.len()
    }
}

fn sorted(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by_key(|booking| (booking.date, booking.time));
    bookings
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn count_bookings(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: TimeOfDay,
    ) -> Result<u32, StoreError> {
        let tables = self.tables.lock().await;
        let count = tables
            .appointments
            .iter()
            .filter(|b| b.doctor_id == doctor_id && b.date == date && b.time == time)
            .count();
        Ok(count as u32)
    }

    async fn commit_booking(&self, booking: NewBooking) -> Result<BookingConfirmation, StoreError> {
        let mut tables = self.tables.lock().await;

        let same_slot: Vec<&Booking> = tables
            .appointments
            .iter()
            .filter(|b| b.doctor_id == booking.doctor_id && b.date == booking.date && b.time == booking.time)
            .collect();

        // Duplicate wins over a full slot
        if same_slot.iter().any(|b| b.patient_id == booking.patient_id) {
            return Err(StoreError::UniqueViolation);
        }
        if same_slot.len() as u32 >= self.capacity {
            return Err(StoreError::CapacityExceeded);
        }

        let appointment = Booking {
            id: Uuid::new_v4(),
            doctor_id: booking.doctor_id,
            patient_id: booking.patient_id,
            date: booking.date,
            time: booking.time,
            created_at: Some(Utc::now()),
        };
        let bill = ConsultFeeRecord {
            appointment_id: appointment.id,
            amount: booking.consult_fee,
            status: BillStatus::Unpaid,
        };

        tables.appointments.push(appointment.clone());
        tables.bills.insert(appointment.id, bill.clone());

        Ok(BookingConfirmation { appointment, bill })
    }

    async fn bookings_for_patient(&self, patient_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(sorted(
            tables
                .appointments
                .iter()
                .filter(|b| b.patient_id == patient_id)
                .cloned()
                .collect(),
        ))
    }

    async fn bookings_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(sorted(
            tables
                .appointments
                .iter()
                .filter(|b| b.doctor_id == doctor_id && date.map_or(true, |d| b.date == d))
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn new_booking(doctor_id: Uuid, patient_id: Uuid) -> NewBooking {
        NewBooking {
            doctor_id,
            patient_id,
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            time: "09:00 AM".parse().unwrap(),
            consult_fee: 500.0,
        }
    }

    #[tokio::test]
    async fn test_patient_in_full_slot_gets_unique_violation() {
        let store = InMemoryBookingStore::with_capacity(3);
        let doctor_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();

        store.commit_booking(new_booking(doctor_id, patient_id)).await.unwrap();
        for _ in 0..2 {
            store.commit_booking(new_booking(doctor_id, Uuid::new_v4())).await.unwrap();
        }

        assert_matches!(
            store.commit_booking(new_booking(doctor_id, patient_id)).await,
            Err(StoreError::UniqueViolation)
        );
        assert_matches!(
            store.commit_booking(new_booking(doctor_id, Uuid::new_v4())).await,
            Err(StoreError::CapacityExceeded)
        );
        assert_eq!(store.booking_count().await, 3);
    }

    #[tokio::test]
    async fn test_capacity_is_fixed_at_construction() {
        let store = InMemoryBookingStore::with_capacity(1);
        let doctor_id = Uuid::new_v4();

        store.commit_booking(new_booking(doctor_id, Uuid::new_v4())).await.unwrap();
        assert_matches!(
            store.commit_booking(new_booking(doctor_id, Uuid::new_v4())).await,
            Err(StoreError::CapacityExceeded)
        );
    }
}
