//! # API Configuration Module
//!
//! Loads the SlotBook server configuration from environment variables,
//! providing defaults where appropriate.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string; the in-memory store is used when unset
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `BOOKING_MAX_ATTEMPTS`: Optimistic retries before a write reports Busy (default: 8)
//! - `BOOKING_RETRY_BACKOFF_MS`: Backoff step between retries (default: 5)
//! - `STORE_LOCK_WAIT_MS`: Bound on store lock waits (default: 500)
//! - `DEFAULT_SLOT_MINUTES`: Slot length when a request omits it (default: 15)
//! - `SCHEDULE_DELETE_POLICY`: `cascade` or `require-empty` (default: cascade)

use eyre::{Result, WrapErr, eyre};
use slotbook_core::{
    models::schedule::{DEFAULT_SLOT_MINUTES, DeletePolicy},
    services::{RetryPolicy, ScheduleSettings},
};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Configuration for the SlotBook API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use slotbook_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}", config.server_addr());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL connection string; `None` selects the in-memory store
    pub database_url: Option<String>,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    pub booking_max_attempts: u32,
    pub booking_retry_backoff_ms: u64,
    pub store_lock_wait_ms: u64,
    pub default_slot_minutes: i32,
    pub delete_policy: DeletePolicy,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("{}", e))
            .wrap_err_with(|| format!("Invalid {} value: {:?}", key, raw)),
        None => Ok(default),
    }
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric setting cannot be parsed, if
    /// `BOOKING_MAX_ATTEMPTS` or `DEFAULT_SLOT_MINUTES` is not positive, or
    /// if `SCHEDULE_DELETE_POLICY` is not a known policy.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Network settings
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "API_PORT", 3000u16)?;

        // Database settings
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        // Logging settings
        let log_level = match lookup("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Performance settings
        let request_timeout = parse_or(&lookup, "API_REQUEST_TIMEOUT_SECONDS", 30u64)?;

        // Booking settings
        let booking_max_attempts = parse_or(&lookup, "BOOKING_MAX_ATTEMPTS", 8u32)?;
        if booking_max_attempts == 0 {
            return Err(eyre!("BOOKING_MAX_ATTEMPTS must be at least 1"));
        }
        let booking_retry_backoff_ms = parse_or(&lookup, "BOOKING_RETRY_BACKOFF_MS", 5u64)?;
        let store_lock_wait_ms = parse_or(&lookup, "STORE_LOCK_WAIT_MS", 500u64)?;
        let default_slot_minutes =
            parse_or(&lookup, "DEFAULT_SLOT_MINUTES", DEFAULT_SLOT_MINUTES)?;
        if default_slot_minutes <= 0 {
            return Err(eyre!("DEFAULT_SLOT_MINUTES must be positive"));
        }
        let delete_policy = parse_or(&lookup, "SCHEDULE_DELETE_POLICY", DeletePolicy::Cascade)?;

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            booking_max_attempts,
            booking_retry_backoff_ms,
            store_lock_wait_ms,
            default_slot_minutes,
            delete_policy,
        })
    }

    /// Returns the server address as a string (e.g., "127.0.0.1:8080")
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.booking_max_attempts,
            backoff: Duration::from_millis(self.booking_retry_backoff_ms),
        }
    }

    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            default_slot_minutes: self.default_slot_minutes,
            delete_policy: self.delete_policy,
            retry: self.retry_policy(),
        }
    }

    /// Upper bound on waiting for a store lock or database row lock.
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.store_lock_wait_ms)
    }
}
