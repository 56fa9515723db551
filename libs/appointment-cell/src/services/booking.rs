// libs/appointment-cell/src/services/booking.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::pagination::Page;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, CalendarEntry, CalendarResponse, ConflictCandidate,
    ConflictCheckResponse, ConflictPolicy, DateRange, RescheduleAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::consistency::{SchedulingLocks, ScopeGuards};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::validation::{slot_end, validate_date_range, validate_future_date};
use crate::store::AppointmentStore;

/// The appointment write path. Every write that touches the calendar runs
/// validate -> lock scopes -> conflict check -> persist, with the scope
/// locks held until the store call returns.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    conflicts: ConflictDetectionService,
    locks: SchedulingLocks,
    lifecycle: AppointmentLifecycleService,
    policy: ConflictPolicy,
    default_duration_minutes: i32,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, config: &AppConfig) -> Self {
        Self {
            conflicts: ConflictDetectionService::new(store.clone()),
            store,
            locks: SchedulingLocks::new(StdDuration::from_millis(config.scheduling_lock_timeout_ms)),
            lifecycle: AppointmentLifecycleService::new(),
            policy: ConflictPolicy::from_config(config),
            default_duration_minutes: config.default_appointment_duration_minutes,
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Create a new scheduled appointment.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, patient_id = %request.patient_id))]
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let duration_minutes = request.duration_minutes.unwrap_or(self.default_duration_minutes);
        Self::validate_slot(request.scheduled_at, duration_minutes, now)?;

        let scopes = self.policy.scopes_for(request.doctor_id, request.patient_id);
        let _guards = self.locks.acquire(&scopes).await?;

        let candidates: Vec<ConflictCandidate> = scopes
            .iter()
            .map(|scope| ConflictCandidate::new(*scope, request.scheduled_at, duration_minutes))
            .collect();
        self.conflicts.ensure_free(&candidates).await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            scheduled_at: request.scheduled_at,
            duration_minutes,
            status: AppointmentStatus::Scheduled,
            appointment_type: request.appointment_type.unwrap_or_default(),
            reason: request.reason,
            notes: request.notes,
            consultation_fee: request.consultation_fee,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.insert(appointment).await?;
        info!("Appointment {} booked at {} for {} minutes",
              created.id, created.scheduled_at, created.duration_minutes);

        Ok(created)
    }

    /// Move a scheduled appointment. The past-date rule applies to every
    /// write of the start time, not only creation.
    #[instrument(skip(self, request))]
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let (_guards, mut appointment) = self.lock_appointment(appointment_id).await?;
        self.lifecycle.ensure_reschedulable(appointment.status)?;

        let duration_minutes = request.new_duration_minutes.unwrap_or(appointment.duration_minutes);
        Self::validate_slot(request.new_start_time, duration_minutes, now)?;

        let candidates: Vec<ConflictCandidate> = self
            .policy
            .scopes_for(appointment.doctor_id, appointment.patient_id)
            .into_iter()
            .map(|scope| {
                ConflictCandidate::new(scope, request.new_start_time, duration_minutes)
                    .excluding(appointment.id)
            })
            .collect();
        self.conflicts.ensure_free(&candidates).await?;

        appointment.scheduled_at = request.new_start_time;
        appointment.duration_minutes = duration_minutes;
        appointment.updated_at = now;

        let updated = self.store.update(appointment).await?;
        info!("Appointment {} rescheduled to {}", updated.id, updated.scheduled_at);

        Ok(updated)
    }

    /// Update descriptive fields and, optionally, the status.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let (_guards, mut appointment) = self.lock_appointment(appointment_id).await?;

        if let Some(status) = request.status {
            self.lifecycle.validate_status_transition(appointment.status, status)?;
            appointment.status = status;
        }
        if let Some(appointment_type) = request.appointment_type {
            appointment.appointment_type = appointment_type;
        }
        if let Some(reason) = request.reason {
            appointment.reason = Some(reason);
        }
        if let Some(notes) = request.notes {
            appointment.notes = Some(notes);
        }
        if let Some(fee) = request.consultation_fee {
            if fee < 0.0 {
                return Err(AppointmentError::ValidationError(
                    "Consultation fee cannot be negative".to_string(),
                ));
            }
            appointment.consultation_fee = Some(fee);
        }
        appointment.updated_at = now;

        self.store.update(appointment).await
    }

    /// Move a scheduled appointment to a terminal status.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let (_guards, mut appointment) = self.lock_appointment(appointment_id).await?;
        self.lifecycle.validate_status_transition(appointment.status, status)?;

        appointment.status = status;
        appointment.updated_at = now;

        let updated = self.store.update(appointment).await?;
        info!("Appointment {} is now {}", updated.id, updated.status);
        Ok(updated)
    }

    /// Cancelling frees the slot for new bookings immediately.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let (_guards, mut appointment) = self.lock_appointment(appointment_id).await?;
        self.lifecycle.validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = now;
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            let line = format!("Cancelled: {}", reason.trim());
            appointment.notes = Some(match appointment.notes.take() {
                Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
                _ => line,
            });
        }

        let updated = self.store.update(appointment).await?;
        info!("Appointment {} cancelled", updated.id);
        Ok(updated)
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let (_guards, appointment) = self.lock_appointment(appointment_id).await?;
        self.store.delete(appointment.id).await?;
        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.get(appointment_id).await
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<Page<Appointment>, AppointmentError> {
        validate_date_range(query.from_date, query.to_date)?;

        let matches = self.store.search(&query).await?;
        debug!("Appointment search matched {} rows", matches.len());

        Ok(Page::from_vec(matches, query.page_request()))
    }

    /// A doctor's appointments grouped by day. Defaults to the week
    /// (Monday..Sunday) containing `today`.
    pub async fn calendar(
        &self,
        doctor_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<CalendarResponse, AppointmentError> {
        let start = start_date.unwrap_or_else(|| {
            today - Duration::days(today.weekday().num_days_from_monday() as i64)
        });
        let end = match end_date {
            Some(end) => end,
            None => start.checked_add_signed(Duration::days(6)).ok_or_else(|| {
                AppointmentError::InvalidDateRange(format!("No full week starts on {}", start))
            })?,
        };
        validate_date_range(Some(start), Some(end))?;

        let query = AppointmentSearchQuery {
            doctor_id: Some(doctor_id),
            from_date: Some(start),
            to_date: Some(end),
            ..AppointmentSearchQuery::default()
        };

        let mut calendar: BTreeMap<String, Vec<CalendarEntry>> = BTreeMap::new();
        for appointment in self.store.search(&query).await? {
            calendar
                .entry(appointment.scheduled_at.date_naive().format("%Y-%m-%d").to_string())
                .or_default()
                .push(CalendarEntry::from(&appointment));
        }

        Ok(CalendarResponse {
            calendar,
            range: DateRange { start, end },
        })
    }

    /// Read-only check; takes no locks, so the answer can be stale by the
    /// time a booking is attempted.
    pub async fn check_conflicts(
        &self,
        candidate: ConflictCandidate,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        slot_end(candidate.start, candidate.duration_minutes)?;
        self.conflicts.check_conflicts(&candidate).await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    fn validate_slot(
        start: DateTime<Utc>,
        duration_minutes: i32,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        slot_end(start, duration_minutes)?;
        validate_future_date(start, now)
    }

    /// Lock the appointment's calendars, then re-read it so the caller works
    /// on the state no other writer can change until the guards drop.
    async fn lock_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<(ScopeGuards, Appointment), AppointmentError> {
        let existing = self.store.get(appointment_id).await?;
        let scopes = self.policy.scopes_for(existing.doctor_id, existing.patient_id);

        let guards = self.locks.acquire(&scopes).await?;
        let current = self.store.get(appointment_id).await?;

        Ok((guards, current))
    }
}
