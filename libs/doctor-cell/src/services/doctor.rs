// libs/doctor-cell/src/services/doctor.rs
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorError};
use crate::services::schedule::{self, ParsedSchedule};

const DOCTOR_COLUMNS: &str = "id,name,specialization,consult_fee,schedule";

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Get doctor by ID. Without a token the anon key is used, which the
    /// directory's row policies allow for reads.
    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}&select={}", doctor_id, DOCTOR_COLUMNS);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let row = result.into_iter().next().ok_or(DoctorError::NotFound)?;
        let doctor: Doctor = serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    /// Doctor plus the parsed form of their schedule.
    pub async fn get_doctor_schedule(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<(Doctor, ParsedSchedule), DoctorError> {
        let doctor = self.get_doctor(doctor_id, auth_token).await?;
        let parsed = schedule::parse(&doctor.schedule);

        if !parsed.is_clean() {
            warn!(
                "Doctor {} has {} unparseable schedule entries",
                doctor.id,
                parsed.rejected.len()
            );
        }

        Ok((doctor, parsed))
    }
}
