use std::env;
use std::net::SocketAddr;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub bind_addr: SocketAddr,
    pub scheduling_lock_timeout_ms: u64,
    pub enforce_patient_calendar: bool,
    pub default_appointment_duration_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            scheduling_lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            enforce_patient_calendar: true,
            default_appointment_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, requests will use the anon key");
                    String::new()
                }),
            bind_addr: parse_or_default("BIND_ADDR", DEFAULT_BIND_ADDR.to_string())
                .parse()
                .unwrap_or_else(|e| {
                    warn!("BIND_ADDR is not a socket address ({}), using {}", e, DEFAULT_BIND_ADDR);
                    SocketAddr::from(([0, 0, 0, 0], 3000))
                }),
            scheduling_lock_timeout_ms: parse_or_default(
                "SCHEDULING_LOCK_TIMEOUT_MS",
                DEFAULT_LOCK_TIMEOUT_MS,
            ),
            enforce_patient_calendar: parse_or_default("ENFORCE_PATIENT_CALENDAR", true),
            default_appointment_duration_minutes: parse_or_default(
                "DEFAULT_APPOINTMENT_DURATION_MINUTES",
                DEFAULT_DURATION_MINUTES,
            ),
        };

        if !config.is_database_configured() {
            warn!("Database not configured - appointments will be kept in memory");
        }

        config
    }

    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    /// Key sent as the bearer token for server-side PostgREST calls.
    pub fn database_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
