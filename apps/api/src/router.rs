use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tracing::info;

use appointment_cell::api::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use appointment_cell::{appointment_routes, AppointmentState};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

/// Appointments live in Supabase when it is configured, otherwise in memory.
pub fn select_store(config: &AppConfig) -> Arc<dyn AppointmentStore> {
    if config.is_database_configured() {
        info!("Using Supabase appointment store at {}", config.supabase_url);
        Arc::new(SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(config))))
    } else {
        info!("Using in-memory appointment store");
        Arc::new(InMemoryAppointmentStore::new())
    }
}

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let store = select_store(&config);
    let appointments = Arc::new(AppointmentState::new(&config, store));

    Router::new()
        .route("/", get(|| async { "Clinic Scheduling API is running!" }))
        .nest("/api", appointment_routes(appointments))
}
