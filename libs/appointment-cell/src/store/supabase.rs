// libs/appointment-cell/src/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery, CalendarScope};
use crate::store::AppointmentStore;

const TABLE_PATH: &str = "/rest/v1/appointments";

/// PostgREST-backed store. Rows carry a derived `ends_at` column so the
/// overlap window can be expressed as two indexed comparisons; the table is
/// expected to have an exclusion constraint over
/// `(doctor_id, tstzrange(scheduled_at, ends_at)) WHERE status = 'scheduled'`,
/// whose violations surface here as [`AppointmentError::SchedulingConflict`].
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn timestamp(instant: DateTime<Utc>) -> String {
        urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)).into_owned()
    }

    fn day_start(day: NaiveDate) -> DateTime<Utc> {
        day.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    fn scope_filter(scope: CalendarScope) -> String {
        match scope {
            CalendarScope::Doctor(id) => format!("doctor_id=eq.{}", id),
            CalendarScope::Patient(id) => format!("patient_id=eq.{}", id),
        }
    }

    fn to_row(appointment: &Appointment) -> Result<Value, AppointmentError> {
        let mut row = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to encode appointment: {}", e)))?;

        if let Value::Object(fields) = &mut row {
            fields.insert(
                "ends_at".to_string(),
                Value::String(appointment.ends_at().to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            );
        }
        Ok(row)
    }

    async fn fetch(&self, query_parts: Vec<String>) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("{}?{}&order=scheduled_at.asc", TABLE_PATH, query_parts.join("&"));

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    fn first_row(rows: Vec<Appointment>) -> Result<Appointment, AppointmentError> {
        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    #[instrument(skip(self))]
    async fn scheduled_in_window(
        &self,
        scope: CalendarScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![
            Self::scope_filter(scope),
            "status=eq.scheduled".to_string(),
            format!("scheduled_at=lt.{}", Self::timestamp(end)),
            format!("ends_at=gt.{}", Self::timestamp(start)),
        ];

        if let Some(exclude_id) = exclude_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        self.fetch(query_parts).await
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let rows = self.fetch(vec![format!("id=eq.{}", id)]).await?;
        Self::first_row(rows)
    }

    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec!["select=*".to_string()];

        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = query.from_date {
            query_parts.push(format!("scheduled_at=gte.{}", Self::timestamp(Self::day_start(from))));
        }
        // The last representable day has no upper bound to send.
        if let Some(next_day) = query
            .to_date
            .and_then(|to| Self::day_start(to).checked_add_signed(Duration::days(1)))
        {
            query_parts.push(format!("scheduled_at=lt.{}", Self::timestamp(next_day)));
        }

        debug!("Searching appointments with {} filters", query_parts.len() - 1);
        self.fetch(query_parts).await
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let row = Self::to_row(&appointment)?;

        let rows: Vec<Appointment> = self.supabase
            .request(Method::POST, TABLE_PATH, Some(row))
            .await?;

        let created = rows.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Appointment creation returned no rows".to_string())
        })?;

        info!("Appointment {} persisted", created.id);
        Ok(created)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE_PATH, appointment.id);
        let row = Self::to_row(&appointment)?;

        let rows: Vec<Appointment> = self.supabase
            .request(Method::PATCH, &path, Some(row))
            .await?;

        Self::first_row(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("{}?id=eq.{}", TABLE_PATH, id);

        let rows: Vec<Value> = self.supabase
            .request(Method::DELETE, &path, None)
            .await?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(())
    }
}
