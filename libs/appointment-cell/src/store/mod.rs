// libs/appointment-cell/src/store/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery, CalendarScope};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

/// Persistence seam for the appointment write path.
///
/// Implementations only need to be as precise as an indexed range query:
/// `scheduled_in_window` may return extra rows, the conflict checker
/// re-applies the exact predicate.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Scheduled appointments of `scope` that could intersect `[start, end)`.
    async fn scheduled_in_window(
        &self,
        scope: CalendarScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError>;

    /// Every appointment matching the filters, ordered by start time.
    async fn search(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError>;

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError>;
}
