// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::session::SessionContext;
use doctor_cell::models::{DayOfWeek, Doctor, DoctorError, TimeOfDay, WeeklyAvailability};
use doctor_cell::services::{slots, DoctorService};

use crate::models::{
    AppointmentError, AvailabilityBoard, BoardSlot, Booking, BookingConfirmation, NewBooking,
    SlotCandidate, SlotCheckResponse, SlotRequest, ValidatedSlot,
};
use crate::services::capacity::CapacityService;
use crate::services::store::{BookingStore, StoreError};
use crate::services::supabase_store::SupabaseBookingStore;
use crate::services::validation::SlotValidator;

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::Unavailable(msg) => AppointmentError::StoreUnavailable(msg),
            DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

/// Turn the wire request into a candidate; the time accepts any supported text form.
pub fn parse_candidate(request: &SlotRequest) -> Result<SlotCandidate, AppointmentError> {
    let time: TimeOfDay = request
        .time
        .parse()
        .map_err(|e| AppointmentError::InvalidTime(format!("{}", e)))?;

    Ok(SlotCandidate {
        doctor_id: request.doctor_id,
        date: request.date,
        time,
    })
}

pub struct AppointmentBookingService {
    store: Arc<dyn BookingStore>,
    capacity: CapacityService,
    validator: SlotValidator,
    doctor_service: DoctorService,
}

impl AppointmentBookingService {
    /// Service backed by Supabase, acting with the caller's token.
    pub fn new(config: &AppConfig, session: &SessionContext) -> Self {
        let store: Arc<dyn BookingStore> =
            Arc::new(SupabaseBookingStore::new(config, &session.auth_token));
        Self::with_store(config, store)
    }

    pub fn with_store(config: &AppConfig, store: Arc<dyn BookingStore>) -> Self {
        Self {
            capacity: CapacityService::new(Arc::clone(&store), config.slot_capacity),
            store,
            validator: SlotValidator::new(),
            doctor_service: DoctorService::new(config),
        }
    }

    async fn load_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<(Doctor, WeeklyAvailability), AppointmentError> {
        let (doctor, parsed) = self
            .doctor_service
            .get_doctor_schedule(doctor_id, auth_token)
            .await?;
        Ok((doctor, parsed.availability))
    }

    /// Validate a slot and report how many seats are left, without booking.
    pub async fn check_slot(
        &self,
        candidate: &SlotCandidate,
        auth_token: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<SlotCheckResponse, AppointmentError> {
        let (_, availability) = self.load_doctor(candidate.doctor_id, auth_token).await?;
        let slot = self.validator.validate(candidate, &availability, now)?;
        let remaining = self
            .capacity
            .ensure_capacity(slot.doctor_id(), slot.date(), slot.time())
            .await?;

        Ok(SlotCheckResponse {
            doctor_id: slot.doctor_id(),
            date: slot.date(),
            day: slot.day,
            time: slot.time(),
            booked: self.capacity.capacity() - remaining,
            remaining,
            capacity: self.capacity.capacity(),
        })
    }

    /// Every slot of the date's weekday with its occupancy and whether it can be booked now.
    pub async fn availability_board(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<AvailabilityBoard, AppointmentError> {
        let (_, availability) = self.load_doctor(doctor_id, auth_token).await?;
        let day = DayOfWeek::from(date.weekday());
        let capacity = self.capacity.capacity();

        let mut booked: HashMap<TimeOfDay, u32> = HashMap::new();
        for booking in self.store.bookings_for_doctor(doctor_id, Some(date)).await? {
            *booked.entry(booking.time).or_default() += 1;
        }

        let slots = slots::slots_on(&availability, day)
            .into_iter()
            .map(|time| {
                let count = booked.get(&time).copied().unwrap_or(0);
                let remaining = capacity.saturating_sub(count);
                let candidate = SlotCandidate { doctor_id, date, time };
                let reason = match self.validator.validate(&candidate, &availability, now) {
                    Err(e) => Some(e.to_string()),
                    Ok(_) if remaining == 0 => Some(AppointmentError::SlotFull.to_string()),
                    Ok(_) => None,
                };
                BoardSlot {
                    time,
                    booked: count,
                    remaining,
                    bookable: reason.is_none(),
                    reason,
                }
            })
            .collect();

        Ok(AvailabilityBoard {
            doctor_id,
            date,
            day,
            capacity,
            slots,
        })
    }

    /// Book `candidate` for the calling patient: fetch the doctor, validate,
    /// pre-check capacity, then commit.
    pub async fn book_appointment(
        &self,
        session: &SessionContext,
        candidate: &SlotCandidate,
        now: NaiveDateTime,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let patient_id = session
            .patient_id()
            .map_err(|e| AppointmentError::Forbidden(e.message().to_string()))?;

        let (doctor, availability) = self
            .load_doctor(candidate.doctor_id, Some(&session.auth_token))
            .await?;

        self.book_with_doctor(&doctor, &availability, patient_id, candidate, now)
            .await
    }

    /// Booking flow once the doctor is known.
    pub async fn book_with_doctor(
        &self,
        doctor: &Doctor,
        availability: &WeeklyAvailability,
        patient_id: Uuid,
        candidate: &SlotCandidate,
        now: NaiveDateTime,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let slot = self.validator.validate(candidate, availability, now)?;

        // Advisory only; the commit re-checks under a lock
        let remaining = self
            .capacity
            .ensure_capacity(slot.doctor_id(), slot.date(), slot.time())
            .await?;
        debug!("{} seats left before commit", remaining);

        self.commit(&slot, patient_id, doctor.consult_fee).await
    }

    /// Single transactional write of the booking and its unpaid bill.
    #[instrument(
        skip(self, slot),
        fields(doctor_id = %slot.doctor_id(), date = %slot.date(), time = %slot.time())
    )]
    pub async fn commit(
        &self,
        slot: &ValidatedSlot,
        patient_id: Uuid,
        consult_fee: f64,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let new_booking = NewBooking {
            doctor_id: slot.doctor_id(),
            patient_id,
            date: slot.date(),
            time: slot.time(),
            consult_fee,
        };

        match self.store.commit_booking(new_booking).await {
            Ok(confirmation) => {
                info!("Booked appointment {}", confirmation.appointment.id);
                Ok(confirmation)
            }
            Err(StoreError::UniqueViolation) => {
                debug!("Patient {} already holds this slot", patient_id);
                Err(AppointmentError::DuplicateBooking)
            }
            Err(StoreError::CapacityExceeded) => {
                debug!("Slot filled before commit");
                Err(AppointmentError::SlotFull)
            }
            Err(e) => {
                warn!("Booking commit failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn patient_bookings(&self, patient_id: Uuid) -> Result<Vec<Booking>, AppointmentError> {
        Ok(self.store.bookings_for_patient(patient_id).await?)
    }

    pub async fn doctor_bookings(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, AppointmentError> {
        Ok(self.store.bookings_for_doctor(doctor_id, date).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use doctor_cell::services::schedule;

    use crate::services::store::MockBookingStore;

    fn config() -> AppConfig {
        AppConfig {
            supabase_url: "http://127.0.0.1:1".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            slot_capacity: 3,
            server_port: 0,
        }
    }

    fn doctor() -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            name: "Dr. Rao".to_string(),
            specialization: "General Medicine".to_string(),
            consult_fee: 500.0,
            schedule: "MONDAY - 09:00AM TO 05:00PM".to_string(),
        }
    }

    // Wednesday 2030-01-02 08:00
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 2).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    fn monday_nine(doctor: &Doctor) -> SlotCandidate {
        SlotCandidate {
            doctor_id: doctor.id,
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            time: "09:00 AM".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_unique_violation_surfaces_as_duplicate() {
        let mut store = MockBookingStore::new();
        store.expect_count_bookings().returning(|_, _, _| Ok(1));
        store
            .expect_commit_booking()
            .times(1)
            .returning(|_| Err(StoreError::UniqueViolation));

        let service = AppointmentBookingService::with_store(&config(), Arc::new(store));
        let doctor = doctor();
        let availability = schedule::parse(&doctor.schedule).availability;

        let result = service
            .book_with_doctor(&doctor, &availability, Uuid::new_v4(), &monday_nine(&doctor), now())
            .await;

        assert_matches!(result, Err(AppointmentError::DuplicateBooking));
    }

    #[tokio::test]
    async fn test_commit_passes_patient_fee_and_time_to_store() {
        let doctor = doctor();
        let patient_id = Uuid::new_v4();
        let expected_doctor = doctor.id;

        let mut store = MockBookingStore::new();
        store.expect_count_bookings().returning(|_, _, _| Ok(0));
        store
            .expect_commit_booking()
            .withf(move |booking| {
                booking.doctor_id == expected_doctor
                    && booking.patient_id == patient_id
                    && booking.time.to_string() == "09:00 AM"
                    && booking.consult_fee == 500.0
            })
            .times(1)
            .returning(|_| Err(StoreError::CapacityExceeded));

        let service = AppointmentBookingService::with_store(&config(), Arc::new(store));
        let availability = schedule::parse(&doctor.schedule).availability;

        let result = service
            .book_with_doctor(&doctor, &availability, patient_id, &monday_nine(&doctor), now())
            .await;

        assert_matches!(result, Err(AppointmentError::SlotFull));
    }

    #[tokio::test]
    async fn test_invalid_slot_never_reaches_store() {
        let mut store = MockBookingStore::new();
        store.expect_count_bookings().never();
        store.expect_commit_booking().never();

        let service = AppointmentBookingService::with_store(&config(), Arc::new(store));
        let doctor = doctor();
        let availability = schedule::parse(&doctor.schedule).availability;
        let mut candidate = monday_nine(&doctor);
        candidate.time = "05:00 PM".parse().unwrap();

        let result = service
            .book_with_doctor(&doctor, &availability, Uuid::new_v4(), &candidate, now())
            .await;

        assert_matches!(result, Err(AppointmentError::Validation(_)));
    }

    #[test]
    fn test_parse_candidate_rejects_bad_time() {
        let request = SlotRequest {
            doctor_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            time: "quarter past nine".to_string(),
        };
        assert_matches!(parse_candidate(&request), Err(AppointmentError::InvalidTime(_)));
    }
}
