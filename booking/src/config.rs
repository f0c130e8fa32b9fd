//! Configuration management for the booking engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::rate_limiter::{LimitClass, RateLimitPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Throttling policies
    pub rate_limit: RateLimitConfig,
    /// Intake policy
    pub admission: AdmissionConfig,
    /// Logging
    pub telemetry: TelemetryConfig,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Reservation submissions
    pub reservation: RateLimitPolicy,
    /// Generic form posts
    pub form_submit: RateLimitPolicy,
    /// Outgoing email requests
    pub email_send: RateLimitPolicy,
    /// Read-style API calls
    pub api_call: RateLimitPolicy,
    /// How long an identity stays blocked after exceeding a policy, in seconds
    pub block_secs: u64,
    /// How often idle identities are pruned, in seconds
    pub gc_interval_secs: u64,
}

impl RateLimitConfig {
    /// Policy for a limit class
    #[must_use]
    pub const fn policy(&self, class: LimitClass) -> RateLimitPolicy {
        match class {
            LimitClass::Reservation => self.reservation,
            LimitClass::FormSubmit => self.form_submit,
            LimitClass::EmailSend => self.email_send,
            LimitClass::ApiCall => self.api_call,
        }
    }

    /// Block duration
    #[must_use]
    pub const fn block_duration(&self) -> Duration {
        Duration::from_secs(self.block_secs)
    }

    /// GC interval
    #[must_use]
    pub const fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            reservation: LimitClass::Reservation.default_policy(),
            form_submit: LimitClass::FormSubmit.default_policy(),
            email_send: LimitClass::EmailSend.default_policy(),
            api_call: LimitClass::ApiCall.default_policy(),
            block_secs: 300,
            gc_interval_secs: 300,
        }
    }
}

/// Intake policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Register overflow demand on the waitlist (otherwise refuse with `CapacityExceeded`)
    pub enable_waitlist: bool,
    /// Largest party a single reservation may hold
    pub max_persons_per_reservation: Option<u32>,
    /// Utilization at which availability is reported as limited
    pub soft_capacity_warning_percent: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enable_waitlist: true,
            max_persons_per_reservation: None,
            soft_capacity_warning_percent: 80,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error or an `EnvFilter` directive)
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            rate_limit: RateLimitConfig {
                reservation: policy_from_env("RATE_LIMIT_RESERVATION", defaults.reservation),
                form_submit: policy_from_env("RATE_LIMIT_FORM_SUBMIT", defaults.form_submit),
                email_send: policy_from_env("RATE_LIMIT_EMAIL_SEND", defaults.email_send),
                api_call: policy_from_env("RATE_LIMIT_API_CALL", defaults.api_call),
                block_secs: env::var("RATE_LIMIT_BLOCK_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.block_secs),
                gc_interval_secs: env::var("RATE_LIMIT_GC_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.gc_interval_secs),
            },
            admission: AdmissionConfig {
                enable_waitlist: env::var("BOOKING_ENABLE_WAITLIST")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
                max_persons_per_reservation: env::var("BOOKING_MAX_PERSONS_PER_RESERVATION")
                    .ok()
                    .and_then(|s| s.parse().ok()),
                soft_capacity_warning_percent: env::var("BOOKING_SOFT_CAPACITY_WARNING_PERCENT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(80),
            },
            telemetry: TelemetryConfig {
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            },
        }
    }
}

fn policy_from_env(prefix: &str, default: RateLimitPolicy) -> RateLimitPolicy {
    RateLimitPolicy {
        max_attempts: env::var(format!("{prefix}_MAX"))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default.max_attempts),
        window_secs: env::var(format!("{prefix}_WINDOW_SECS"))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default.window_secs),
    }
}
