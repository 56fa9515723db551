// libs/appointment-cell/src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery, CalendarScope};
use crate::store::AppointmentStore;

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: impl IntoIterator<Item = Appointment>) -> Self {
        let appointments = appointments
            .into_iter()
            .map(|appointment| (appointment.id, appointment))
            .collect();

        Self { appointments: RwLock::new(appointments) }
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<Appointment> {
        let mut all: Vec<Appointment> = self.appointments.read().await.values().cloned().collect();
        all.sort_by_key(|appointment| (appointment.scheduled_at, appointment.id));
        all
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn scheduled_in_window(
        &self,
        scope: CalendarScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;

        let mut matches: Vec<Appointment> = appointments
            .values()
            .filter(|apt| scope.owns(apt) && apt.is_scheduled())
            .filter(|apt| Some(apt.id) != exclude_id)
            .filter(|apt| apt.scheduled_at < end && apt.ends_at() > start)
            .cloned()
            .collect();
        matches.sort_by_key(|apt| apt.scheduled_at);

        debug!("{} scheduled appointments for {} in window", matches.len(), scope);
        Ok(matches)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let mut matches: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|apt| query.matches(apt))
            .cloned()
            .collect();
        matches.sort_by_key(|apt| (apt.scheduled_at, apt.id));
        Ok(matches)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::DatabaseError(format!(
                "Appointment {} already exists",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(&appointment.id) {
            Some(existing) => {
                *existing = appointment.clone();
                Ok(appointment)
            }
            None => Err(AppointmentError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.appointments
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AppointmentError::NotFound)
    }
}
