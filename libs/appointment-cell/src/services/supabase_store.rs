// libs/appointment-cell/src/services/supabase_store.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};
use doctor_cell::models::TimeOfDay;

use crate::models::{Booking, BookingConfirmation, NewBooking};
use crate::services::store::{BookingStore, StoreError};

/// Message raised by the `book_appointment` function when the slot is at capacity.
const SLOT_FULL_MESSAGE: &str = "slot_full";

impl From<SupabaseError> for StoreError {
    fn from(err: SupabaseError) -> Self {
        if err.is_unique_violation() {
            return StoreError::UniqueViolation;
        }
        if err.raised_message() == Some(SLOT_FULL_MESSAGE) {
            return StoreError::CapacityExceeded;
        }
        if err.is_transport() {
            return StoreError::Unavailable(err.to_string());
        }
        StoreError::Database(err.to_string())
    }
}

/// `BookingStore` backed by the Supabase `appointments` and `bills` tables.
/// Requests run with the caller's token so row policies apply.
pub struct SupabaseBookingStore {
    supabase: SupabaseClient,
    auth_token: String,
}

impl SupabaseBookingStore {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: auth_token.to_string(),
        }
    }

    async fn fetch_bookings(&self, path: &str) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(&self.auth_token),
            None,
        ).await?;

        let mut bookings = rows
            .into_iter()
            .map(serde_json::from_value::<Booking>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Database(format!("Failed to parse appointment: {}", e)))?;

        // `time` is text in display form, so ordering happens here rather than in SQL
        bookings.sort_by_key(|booking| (booking.date, booking.time));
        Ok(bookings)
    }
}

fn time_filter(time: TimeOfDay) -> String {
    time.to_string().replace(' ', "%20")
}

#[async_trait]
impl BookingStore for SupabaseBookingStore {
    async fn count_bookings(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: TimeOfDay,
    ) -> Result<u32, StoreError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&time=eq.{}&select=id",
            doctor_id,
            date,
            time_filter(time)
        );

        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await?;

        debug!("{} existing bookings for {} {} {}", rows.len(), doctor_id, date, time);
        Ok(rows.len() as u32)
    }

    /// Only the slot is sent. The database function takes the patient from the
    /// caller's JWT, the fee from the doctor row and the cap from its own settings.
    async fn commit_booking(&self, booking: NewBooking) -> Result<BookingConfirmation, StoreError> {
        let args = json!({
            "p_doctor_id": booking.doctor_id,
            "p_date": booking.date,
            "p_time": booking.time.to_string(),
        });

        let confirmation: BookingConfirmation = self
            .supabase
            .rpc("book_appointment", Some(&self.auth_token), args)
            .await
            .map_err(|e| {
                if e.is_transport() {
                    warn!("book_appointment did not complete, outcome unknown: {}", e);
                }
                StoreError::from(e)
            })?;

        Ok(confirmation)
    }

    async fn bookings_for_patient(&self, patient_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let path = format!("/rest/v1/appointments?patient_id=eq.{}", patient_id);
        self.fetch_bookings(&path).await
    }

    async fn bookings_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut path = format!("/rest/v1/appointments?doctor_id=eq.{}", doctor_id);
        if let Some(date) = date {
            path.push_str(&format!("&date=eq.{}", date));
        }
        self.fetch_bookings(&path).await
    }
}
