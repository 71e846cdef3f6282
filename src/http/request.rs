//! Request handling.
//!
//! # Responsibilities
//! - Tag each request with an `x-request-id` (UUID v4 unless the client sent one)
//! - Parse the probe query string
//! - Open one tracing span per request carrying the request ID

use axum::body::Body;
use axum::http::Request;
use serde::Deserialize;
use tracing::Span;

use crate::probe::{ProbeError, ProbeMethod};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Query string of `GET /probe/{host}`.
#[derive(Debug, Default, Deserialize)]
pub struct ProbeQuery {
    /// `icmp` or `tcp`; the configured default when absent or empty.
    pub mode: Option<String>,
}

impl ProbeQuery {
    pub fn method(&self) -> Result<Option<ProbeMethod>, ProbeError> {
        let mode = self.mode.as_deref().map(str::trim).filter(|m| !m.is_empty());
        Ok(mode.map(|m| m.parse::<ProbeMethod>()).transpose()?)
    }
}

/// Span for `TraceLayer`, tagged with the request ID set further out.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_mode() {
        let query = |mode: Option<&str>| ProbeQuery {
            mode: mode.map(String::from),
        };

        assert_eq!(query(None).method(), Ok(None));
        assert_eq!(query(Some("")).method(), Ok(None));
        assert_eq!(query(Some("tcp")).method(), Ok(Some(ProbeMethod::Tcp)));
        assert_eq!(query(Some(" ICMP ")).method(), Ok(Some(ProbeMethod::Icmp)));
        assert!(matches!(query(Some("udp")).method(), Err(ProbeError::UnknownMode(_))));
    }
}
