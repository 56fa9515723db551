// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AppointmentSearchQuery, BookAppointmentRequest, CalendarScope, CancelAppointmentRequest,
    ConflictCandidate, RescheduleAppointmentRequest, UpdateAppointmentRequest,
};
use crate::router::AppointmentState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub exclude_appointment_id: Option<Uuid>,
}

impl ConflictCheckQuery {
    fn scope(&self) -> Result<CalendarScope, AppError> {
        match (self.doctor_id, self.patient_id) {
            (Some(doctor_id), None) => Ok(CalendarScope::Doctor(doctor_id)),
            (None, Some(patient_id)) => Ok(CalendarScope::Patient(patient_id)),
            _ => Err(AppError::BadRequest(
                "Provide exactly one of doctor_id or patient_id".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub doctor_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state.booking.book_appointment(request, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "message": "Appointment created successfully",
        "appointment": appointment
    }))))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let page = state.booking.search_appointments(query).await?;

    Ok(Json(json!({
        "appointments": page.items,
        "pagination": page.pagination
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking
        .update_appointment(appointment_id, request, Utc::now())
        .await?;

    Ok(Json(json!({
        "message": "Appointment updated successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking
        .reschedule_appointment(appointment_id, request, Utc::now())
        .await?;

    Ok(Json(json!({
        "message": "Appointment rescheduled successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking
        .cancel_appointment(appointment_id, request.reason, Utc::now())
        .await?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.booking.delete_appointment(appointment_id).await?;

    Ok(Json(json!({
        "message": "Appointment deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let mut candidate = ConflictCandidate::new(query.scope()?, query.start_time, query.duration_minutes);
    if let Some(exclude_id) = query.exclude_appointment_id {
        candidate = candidate.excluding(exclude_id);
    }

    let response = state.booking.check_conflicts(candidate).await?;
    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn get_calendar(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let calendar = state.booking
        .calendar(query.doctor_id, query.start_date, query.end_date, Utc::now().date_naive())
        .await?;

    Ok(Json(json!(calendar)))
}
