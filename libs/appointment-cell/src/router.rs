// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::booking::AppointmentBookingService;
use crate::store::AppointmentStore;

/// Shared by every appointment handler. The booking service owns the scope
/// locks, so one instance must serve the whole process.
pub struct AppointmentState {
    pub booking: AppointmentBookingService,
}

impl AppointmentState {
    pub fn new(config: &AppConfig, store: Arc<dyn AppointmentStore>) -> Self {
        Self { booking: AppointmentBookingService::new(store, config) }
    }
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/appointments", post(handlers::book_appointment).get(handlers::search_appointments))
        .route("/appointments/conflicts/check", get(handlers::check_appointment_conflicts))
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/appointments/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/calendar", get(handlers::get_calendar))
        .with_state(state)
}
