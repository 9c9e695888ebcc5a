// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::session::SessionContext;

use crate::models::{
    AppointmentError, AvailabilityBoard, BookingConfirmation, SlotCheckResponse, SlotRequest,
};
use crate::services::{parse_candidate, AppointmentBookingService};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DoctorAppointmentsQuery {
    pub date: Option<NaiveDate>,
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::Validation(_) => AppError::ValidationError(message),
            AppointmentError::InvalidTime(_) => AppError::BadRequest(message),
            AppointmentError::SlotFull | AppointmentError::DuplicateBooking => {
                AppError::Conflict(message)
            }
            AppointmentError::DoctorNotFound => AppError::NotFound(message),
            AppointmentError::StoreUnavailable(_) => AppError::ExternalService(message),
            AppointmentError::DatabaseError(_) => AppError::Database(message),
            AppointmentError::Forbidden(_) => AppError::Forbidden(message),
        }
    }
}

fn clinic_now() -> NaiveDateTime {
    Local::now().naive_local()
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// "Check Availability": validate the slot and report remaining seats.
#[axum::debug_handler]
pub async fn check_slot(
    State(state): State<Arc<AppConfig>>,
    session: SessionContext,
    Json(request): Json<SlotRequest>,
) -> Result<Json<SlotCheckResponse>, AppError> {
    let candidate = parse_candidate(&request)?;
    let service = AppointmentBookingService::new(&state, &session);

    let response = service
        .check_slot(&candidate, Some(&session.auth_token), clinic_now())
        .await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    session: SessionContext,
    Json(request): Json<SlotRequest>,
) -> Result<(StatusCode, Json<BookingConfirmation>), AppError> {
    let candidate = parse_candidate(&request)?;
    let service = AppointmentBookingService::new(&state, &session);

    let confirmation = service
        .book_appointment(&session, &candidate, clinic_now())
        .await?;

    Ok((StatusCode::CREATED, Json(confirmation)))
}

#[axum::debug_handler]
pub async fn get_availability_board(
    State(state): State<Arc<AppConfig>>,
    session: SessionContext,
    Query(query): Query<BoardQuery>,
) -> Result<Json<AvailabilityBoard>, AppError> {
    let service = AppointmentBookingService::new(&state, &session);

    let board = service
        .availability_board(query.doctor_id, query.date, Some(&session.auth_token), clinic_now())
        .await?;

    Ok(Json(board))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<Arc<AppConfig>>,
    session: SessionContext,
) -> Result<Json<Value>, AppError> {
    let patient_id = session.patient_id()?;
    let service = AppointmentBookingService::new(&state, &session);

    let appointments = service.patient_bookings(patient_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    session: SessionContext,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DoctorAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    session.ensure_can_view_doctor(doctor_id)?;
    let service = AppointmentBookingService::new(&state, &session);

    let appointments = service.doctor_bookings(doctor_id, query.date).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len()
    })))
}
