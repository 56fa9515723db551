// Appointment Cell - scheduling write path and conflict detection
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::{
    Appointment,
    AppointmentError,
    AppointmentStatus,
    AppointmentType,
    CalendarScope,
    ConflictCandidate,
};

pub use router::{appointment_routes, AppointmentState};

pub mod api {
    pub use crate::services::booking::AppointmentBookingService;
    pub use crate::services::conflict::{find_conflicts, has_conflict, intervals_overlap, ConflictDetectionService};
    pub use crate::services::consistency::SchedulingLocks;
    pub use crate::services::lifecycle::AppointmentLifecycleService;
    pub use crate::store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
}
