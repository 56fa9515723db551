// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;

use shared_config::AppConfig;
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::pagination::PageRequest;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub consultation_fee: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Exclusive end of the booked interval, clamped to the last representable instant.
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at
            .checked_add_signed(Duration::minutes(self.duration_minutes as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
    #[serde(rename = "no-show", alias = "no_show")]
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no-show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    #[default]
    Regular,
    #[serde(alias = "follow_up", alias = "followup")]
    FollowUp,
    Emergency,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Regular => write!(f, "regular"),
            AppointmentType::FollowUp => write!(f, "follow-up"),
            AppointmentType::Emergency => write!(f, "emergency"),
        }
    }
}

// ==============================================================================
// CALENDAR SCOPES
// ==============================================================================

/// Owner of a calendar whose scheduled appointments must not overlap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CalendarScope {
    Doctor(Uuid),
    Patient(Uuid),
}

impl CalendarScope {
    pub fn owns(&self, appointment: &Appointment) -> bool {
        match self {
            CalendarScope::Doctor(id) => appointment.doctor_id == *id,
            CalendarScope::Patient(id) => appointment.patient_id == *id,
        }
    }
}

impl fmt::Display for CalendarScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarScope::Doctor(id) => write!(f, "doctor:{}", id),
            CalendarScope::Patient(id) => write!(f, "patient:{}", id),
        }
    }
}

/// Which calendars a write must keep conflict-free.
#[derive(Debug, Clone, Copy)]
pub struct ConflictPolicy {
    pub enforce_patient_calendar: bool,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self { enforce_patient_calendar: true }
    }
}

impl ConflictPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { enforce_patient_calendar: config.enforce_patient_calendar }
    }

    /// Scopes touched by an appointment, in lock order.
    pub fn scopes_for(&self, doctor_id: Uuid, patient_id: Uuid) -> Vec<CalendarScope> {
        let mut scopes = vec![CalendarScope::Doctor(doctor_id)];
        if self.enforce_patient_calendar {
            scopes.push(CalendarScope::Patient(patient_id));
        }
        scopes.sort();
        scopes
    }
}

/// A proposed interval for one scope. `id` is set when an existing
/// appointment is being moved so it does not collide with itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConflictCandidate {
    pub id: Option<Uuid>,
    pub scope: CalendarScope,
    pub start: DateTime<Utc>,
    pub duration_minutes: i32,
}

impl ConflictCandidate {
    pub fn new(scope: CalendarScope, start: DateTime<Utc>, duration_minutes: i32) -> Self {
        Self { id: None, scope, start, duration_minutes }
    }

    pub fn excluding(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_signed(Duration::minutes(self.duration_minutes as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub appointment_type: Option<AppointmentType>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub consultation_fee: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub appointment_type: Option<AppointmentType>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub consultation_fee: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
    pub new_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl AppointmentSearchQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest { page: self.page, per_page: self.per_page }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        let day = appointment.scheduled_at.date_naive();

        self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
            && self.from_date.map_or(true, |from| day >= from)
            && self.to_date.map_or(true, |to| day <= to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
}

impl From<&Appointment> for CalendarEntry {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            patient_id: appointment.patient_id,
            start_time: appointment.scheduled_at,
            end_time: appointment.ends_at(),
            status: appointment.status,
            appointment_type: appointment.appointment_type,
            reason: appointment.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Appointments keyed by `YYYY-MM-DD`, each day ordered by start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarResponse {
    pub calendar: BTreeMap<String, Vec<CalendarEntry>>,
    pub range: DateRange,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Cannot schedule appointments in the past")]
    PastScheduling,

    #[error("This time slot conflicts with an existing appointment")]
    SchedulingConflict,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Timed out waiting for the scheduling lock on {0}")]
    LockTimeout(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DatabaseError> for AppointmentError {
    fn from(error: DatabaseError) -> Self {
        match error {
            // Raised by the overlap exclusion constraint when two writers race.
            DatabaseError::Conflict(_) => AppointmentError::SchedulingConflict,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound => AppError::NotFound(error.to_string()),
            AppointmentError::InvalidTimeRange(_)
            | AppointmentError::InvalidDateRange(_)
            | AppointmentError::PastScheduling
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::ValidationError(_) => AppError::ValidationError(error.to_string()),
            AppointmentError::SchedulingConflict => AppError::Conflict(error.to_string()),
            AppointmentError::LockTimeout(_) => AppError::ServiceUnavailable(error.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
