use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub scheduling_lock_timeout_ms: u64,
    pub enforce_patient_calendar: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-key".to_string(),
            scheduling_lock_timeout_ms: 2_000,
            enforce_patient_calendar: true,
        }
    }
}

impl TestConfig {
    pub fn with_database_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    /// Config with no database, so the api falls back to the in-memory store.
    pub fn in_memory() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            scheduling_lock_timeout_ms: self.scheduling_lock_timeout_ms,
            enforce_patient_calendar: self.enforce_patient_calendar,
            ..AppConfig::default()
        }
    }
}

/// Fixed instants for scheduling tests, anchored well in the future so the
/// past-date rule never trips by accident.
pub struct TestClock;

impl TestClock {
    /// 2030-06-03T00:00:00Z, a Monday.
    pub fn base_day() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2030-06-03T00:00:00Z")
            .map(|dt| dt.with_timezone(&Utc))
            .expect("valid fixed timestamp")
    }

    pub fn at(hour: i64, minute: i64) -> DateTime<Utc> {
        Self::base_day() + Duration::hours(hour) + Duration::minutes(minute)
    }

    /// A "now" that sits before every `at(..)` instant.
    pub fn now() -> DateTime<Utc> {
        Self::base_day() - Duration::days(1)
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn appointment_response(
        doctor_id: &str,
        patient_id: &str,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i64,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "scheduled_at": scheduled_at.to_rfc3339(),
            "ends_at": (scheduled_at + Duration::minutes(duration_minutes)).to_rfc3339(),
            "duration_minutes": duration_minutes,
            "status": status,
            "appointment_type": "regular",
            "reason": "Routine checkup",
            "notes": null,
            "consultation_fee": 50.0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn exclusion_violation() -> serde_json::Value {
        json!({
            "code": "23P01",
            "details": null,
            "hint": null,
            "message": "conflicting key value violates exclusion constraint \"appointments_no_overlap\""
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
