//! Response bodies and error mapping.
//!
//! # Design Decisions
//! - Every finished probe is a 200, reachable or not
//! - Only request-validation failures produce a 4xx
//! - TCP bodies carry `port` and `method`; ICMP bodies carry neither

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::probe::{LatencyTier, ProbeError, ProbeMethod, ProbeOutcome};
use crate::store::SettingsError;

/// JSON body of a probe response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResponse {
    pub alive: bool,

    /// Round-trip time in whole milliseconds, only when alive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,

    pub host: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ProbeMethod>,

    /// Attempt index at which probing stopped.
    pub attempt: u32,

    pub tier: LatencyTier,
}

impl From<ProbeOutcome> for ProbeResponse {
    fn from(outcome: ProbeOutcome) -> Self {
        let tcp = outcome.method == ProbeMethod::Tcp;
        Self {
            alive: outcome.alive,
            time: outcome.elapsed_ms.filter(|_| outcome.alive),
            host: outcome.host,
            port: if tcp { outcome.port } else { None },
            method: tcp.then_some(ProbeMethod::Tcp),
            attempt: outcome.attempts_used,
            tier: outcome.tier,
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            violations: Vec::new(),
        }
    }
}

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        let status = match self {
            ProbeError::MissingHost | ProbeError::InvalidHost(_) | ProbeError::UnknownMode(_) => {
                StatusCode::BAD_REQUEST
            }
            ProbeError::Interrupted => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

impl IntoResponse for SettingsError {
    fn into_response(self) -> Response {
        match self {
            SettingsError::Invalid(errors) => {
                let body = ErrorBody {
                    error: "invalid settings".to_string(),
                    violations: errors.iter().map(ToString::to_string).collect(),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            other => {
                tracing::error!(error = %other, "Failed to store probe settings");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("failed to store settings")),
                )
                    .into_response()
            }
        }
    }
}
