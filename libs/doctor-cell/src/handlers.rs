use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{DayOfWeek, DoctorError, DoctorScheduleResponse, RejectedEntryView};
use crate::services::{schedule, slots, DoctorService};

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<NaiveDate>,
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::Unavailable(msg) => AppError::ExternalService(msg),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<DoctorScheduleResponse>, AppError> {
    let doctor_service = DoctorService::new(&state);
    let (doctor, parsed) = doctor_service.get_doctor_schedule(doctor_id, None).await?;

    let rejected_entries = parsed
        .rejected
        .iter()
        .map(|rejected| RejectedEntryView {
            entry: rejected.raw.clone(),
            reason: rejected.reason.to_string(),
        })
        .collect();

    Ok(Json(DoctorScheduleResponse {
        doctor_id: doctor.id,
        name: doctor.name,
        specialization: doctor.specialization,
        schedule: schedule::format_schedule(&parsed.availability),
        slots: slots::weekly_slots(&parsed.availability),
        entries: parsed.availability,
        rejected_entries,
    }))
}

/// Bookable start times. With `?date=` only that weekday's slots are returned.
#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);
    let (doctor, parsed) = doctor_service.get_doctor_schedule(doctor_id, None).await?;

    let body = match query.date {
        Some(date) => {
            let day = DayOfWeek::from(date.weekday());
            json!({
                "doctor_id": doctor.id,
                "date": date,
                "day": day,
                "slots": slots::slots_on(&parsed.availability, day),
            })
        }
        None => json!({
            "doctor_id": doctor.id,
            "slots": slots::weekly_slots(&parsed.availability),
        }),
    };

    Ok(Json(body))
}
