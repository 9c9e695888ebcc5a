// libs/appointment-cell/src/services/capacity.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::TimeOfDay;

use crate::models::AppointmentError;
use crate::services::store::{BookingStore, StoreError};

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation => AppointmentError::DuplicateBooking,
            StoreError::CapacityExceeded => AppointmentError::SlotFull,
            StoreError::Unavailable(msg) => AppointmentError::StoreUnavailable(msg),
            StoreError::Database(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

/// Seats per (doctor, date, time). Counts here are a pre-check only; the
/// store's `commit_booking` enforces the cap.
#[derive(Clone)]
pub struct CapacityService {
    store: Arc<dyn BookingStore>,
    capacity: u32,
}

impl CapacityService {
    pub fn new(store: Arc<dyn BookingStore>, capacity: u32) -> Self {
        Self { store, capacity }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub async fn count_existing(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: TimeOfDay,
    ) -> Result<u32, AppointmentError> {
        Ok(self.store.count_bookings(doctor_id, date, time).await?)
    }

    pub async fn has_capacity(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: TimeOfDay,
    ) -> Result<bool, AppointmentError> {
        let count = self.count_existing(doctor_id, date, time).await?;
        Ok(count < self.capacity)
    }

    /// Remaining seats, or `SlotFull` when none are left.
    pub async fn ensure_capacity(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: TimeOfDay,
    ) -> Result<u32, AppointmentError> {
        let count = self.count_existing(doctor_id, date, time).await?;
        if count >= self.capacity {
            debug!("Slot {} {} {} is full ({}/{})", doctor_id, date, time, count, self.capacity);
            return Err(AppointmentError::SlotFull);
        }
        Ok(self.capacity - count)
    }
}
