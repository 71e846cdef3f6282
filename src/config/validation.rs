//! Configuration and settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce the probe settings invariants before a snapshot is accepted
//! - Validate value ranges (thresholds > 0, ports valid, bounded retries)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: value → Result<(), Vec<ValidationError>>
//! - Runs before config or settings are accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::probe::ProbeSettings;

/// Most attempts a single probe request may make.
pub const MAX_RETRY_COUNT: u32 = 10;

/// Longest pause allowed between attempts, in milliseconds.
pub const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{faster} ({faster_ms} ms) must be below {slower} ({slower_ms} ms)")]
    NotIncreasing {
        faster: &'static str,
        faster_ms: u64,
        slower: &'static str,
        slower_ms: u64,
    },

    #[error("{field} is {value}, maximum is {max}")]
    TooLarge { field: &'static str, value: u64, max: u64 },

    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,

    #[error("server {0:?} has an empty host")]
    EmptyServerHost(String),
}

/// Check the probe settings invariants.
pub fn validate_settings(settings: &ProbeSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let tiers = [
        ("tier4", settings.tier4),
        ("tier3", settings.tier3),
        ("tier2", settings.tier2),
        ("tier1", settings.tier1),
    ];
    for (field, value) in tiers {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }
    for pair in tiers.windows(2) {
        let (faster, faster_ms) = pair[0];
        let (slower, slower_ms) = pair[1];
        if faster_ms >= slower_ms {
            errors.push(ValidationError::NotIncreasing {
                faster,
                faster_ms,
                slower,
                slower_ms,
            });
        }
    }

    if settings.tcp_port == 0 {
        errors.push(ValidationError::NotPositive { field: "tcpPort" });
    }

    if settings.retry_count == 0 {
        errors.push(ValidationError::NotPositive { field: "retryCount" });
    } else if settings.retry_count > MAX_RETRY_COUNT {
        errors.push(ValidationError::TooLarge {
            field: "retryCount",
            value: settings.retry_count as u64,
            max: MAX_RETRY_COUNT as u64,
        });
    }

    if settings.retry_delay_ms > MAX_RETRY_DELAY_MS {
        errors.push(ValidationError::TooLarge {
            field: "retryDelayMs",
            value: settings.retry_delay_ms,
            max: MAX_RETRY_DELAY_MS,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the whole configuration, including the default probe settings.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BindAddress(config.observability.metrics_address.clone()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive {
            field: "timeouts.request_secs",
        });
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }

    for server in &config.servers {
        if server.host.trim().is_empty() {
            errors.push(ValidationError::EmptyServerHost(server.name.clone()));
        }
    }

    if let Err(settings_errors) = validate_settings(&config.probe) {
        errors.extend(settings_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
