//! Probe settings snapshot.
//!
//! A `ProbeSettings` value is immutable once built. The store hands out
//! `Arc<ProbeSettings>` snapshots and replaces them wholesale; nothing in the
//! probing path ever mutates one in place.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::retry::RetryPolicy;

/// Transport used for a reachability attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// ICMP echo request.
    #[default]
    Icmp,
    /// TCP connect to the configured port.
    Tcp,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Icmp => "icmp",
            ProbeMethod::Tcp => "tcp",
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mode string is neither `icmp` nor `tcp`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown probe mode {0:?} (expected \"icmp\" or \"tcp\")")]
pub struct UnknownMethod(pub String);

impl FromStr for ProbeMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icmp" => Ok(ProbeMethod::Icmp),
            "tcp" => Ok(ProbeMethod::Tcp),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// Ascending latency bounds in milliseconds, fastest tier first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    pub tier4: u64,
    pub tier3: u64,
    pub tier2: u64,
    pub tier1: u64,
}

/// Administrator-controlled probing settings.
///
/// Field names follow the dashboard's JSON document (`tcpPort`, `retryCount`,
/// `retryDelayMs`). The older `level4..level1` and `retryDelay` names, as well
/// as snake_case keys used in TOML files, are accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeSettings {
    #[serde(alias = "level4")]
    pub tier4: u64,

    #[serde(alias = "level3")]
    pub tier3: u64,

    #[serde(alias = "level2")]
    pub tier2: u64,

    #[serde(alias = "level1")]
    pub tier1: u64,

    /// Default transport when a request does not pick one.
    pub mode: ProbeMethod,

    /// Target port for TCP probes.
    #[serde(alias = "tcp_port")]
    pub tcp_port: u16,

    /// Total attempts per probe, including the first.
    #[serde(alias = "retry_count")]
    pub retry_count: u32,

    /// Fixed pause between a failed attempt and the next one.
    #[serde(alias = "retryDelay", alias = "retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            tier4: 50,
            tier3: 100,
            tier2: 200,
            tier1: 500,
            mode: ProbeMethod::Icmp,
            tcp_port: 443,
            retry_count: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl ProbeSettings {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            tier4: self.tier4,
            tier3: self.tier3,
            tier2: self.tier2,
            tier1: self.tier1,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_count,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}
