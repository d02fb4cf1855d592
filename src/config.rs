use std::env;

use chrono::NaiveTime;

use crate::models::business_hours::parse_time;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub slot_granularity_minutes: i64,
    pub default_open: NaiveTime,
    pub default_close: NaiveTime,
    /// Empty means notifications are only logged.
    pub notify_webhook_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "slotwise.db".to_string()),
            slot_granularity_minutes: env::var("SLOT_GRANULARITY_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|m: &i64| *m > 0)
                .unwrap_or(30),
            default_open: time_var("DEFAULT_OPEN", 9),
            default_close: time_var("DEFAULT_CLOSE", 17),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").unwrap_or_default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "slotwise.db".to_string(),
            slot_granularity_minutes: 30,
            default_open: hour(9),
            default_close: hour(17),
            notify_webhook_url: String::new(),
        }
    }
}

fn time_var(key: &str, fallback_hour: u32) -> NaiveTime {
    match env::var(key) {
        Ok(v) => parse_time(&v).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "ignoring invalid time, using default");
            hour(fallback_hour)
        }),
        Err(_) => hour(fallback_hour),
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}
