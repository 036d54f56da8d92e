use std::env;

use crate::error::AppError;
use crate::models::pricing::PricingSchema;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub backend_url: String,
    pub backend_anon_key: String,
    pub backend_service_key: Option<String>,
    pub session_cookie: String,
    pub bookings_page_limit: usize,
    pub notify_enabled: bool,
    pub notify_poll_secs: u64,
    pub notify_window: usize,
    pub push_function: String,
    pub dashboard_cache_secs: u64,
    pub pricing_schema: PricingSchema,
    pub local_utc_offset_minutes: i32,
    pub alert_buffer_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                Ok("compact") | Err(_) => LogFormat::Compact,
                Ok(other) => {
                    return Err(AppError::Internal(format!(
                        "invalid LOG_FORMAT: {other}, expected compact/json"
                    )));
                }
            },
            backend_url: required("BACKEND_URL")?
                .trim_end_matches('/')
                .to_string(),
            backend_anon_key: required("BACKEND_ANON_KEY")?,
            backend_service_key: env::var("BACKEND_SERVICE_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            session_cookie: env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| "cab_admin_session".to_string()),
            bookings_page_limit: parse_or_default("BOOKINGS_PAGE_LIMIT", 100)?,
            notify_enabled: parse_or_default("NOTIFY_ENABLED", true)?,
            notify_poll_secs: parse_or_default("NOTIFY_POLL_SECS", 15)?,
            notify_window: parse_or_default("NOTIFY_WINDOW", 10)?,
            push_function: env::var("PUSH_FUNCTION")
                .unwrap_or_else(|_| "send-booking-notification".to_string()),
            dashboard_cache_secs: parse_or_default("DASHBOARD_CACHE_SECS", 30)?,
            pricing_schema: parse_or_default("PRICING_SCHEMA", PricingSchema::Categorical)?,
            local_utc_offset_minutes: utc_offset(parse_or_default(
                "LOCAL_UTC_OFFSET_MINUTES",
                330,
            )?)?,
            alert_buffer_size: parse_or_default("ALERT_BUFFER_SIZE", 256)?,
        })
    }

    /// Settings suitable for tests and local tooling; no environment access.
    pub fn for_backend(backend_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            backend_url: backend_url.into(),
            backend_anon_key: anon_key.into(),
            backend_service_key: None,
            session_cookie: "cab_admin_session".to_string(),
            bookings_page_limit: 100,
            notify_enabled: false,
            notify_poll_secs: 15,
            notify_window: 10,
            push_function: "send-booking-notification".to_string(),
            dashboard_cache_secs: 30,
            pricing_schema: PricingSchema::Categorical,
            local_utc_offset_minutes: 330,
            alert_buffer_size: 256,
        }
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Internal(format!("missing required {key}")))
}

/// Offsets must stay within one day either side of UTC.
fn utc_offset(minutes: i32) -> Result<i32, AppError> {
    if (-1439..=1439).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(AppError::Internal(format!(
            "invalid LOCAL_UTC_OFFSET_MINUTES: {minutes}, expected -1439..=1439"
        )))
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::utc_offset;

    #[test]
    fn offsets_beyond_a_day_are_rejected() {
        assert_eq!(utc_offset(330).unwrap(), 330);
        assert_eq!(utc_offset(-480).unwrap(), -480);
        assert!(utc_offset(1440).is_err());
        assert!(utc_offset(i32::MAX).is_err());
    }
}
