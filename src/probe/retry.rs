//! Fixed-delay retry orchestration.
//!
//! # State Machine
//! ```text
//! Attempting(n) ── success ──────────────────▶ Succeeded(elapsed, n)
//! Attempting(n) ── failure, n < max ─────────▶ Delaying(n)
//! Delaying(n)   ── after retry delay ────────▶ Attempting(n + 1)
//! Attempting(n) ── failure, n >= max ────────▶ Exhausted(n)
//! ```
//!
//! The delay is the same before every retry. There is no backoff growth and
//! no jitter, and no sleep follows the terminal attempt.

use std::time::Duration;

use tokio::time;

use crate::observability::metrics;
use crate::probe::prober::{AttemptOutcome, Prober, Transport};

/// Attempt budget and fixed pause, taken from one settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next.
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting(u32),
    Delaying(u32),
    Succeeded { elapsed_ms: u64, attempt: u32 },
    Exhausted(u32),
}

impl RetryState {
    pub fn initial() -> Self {
        RetryState::Attempting(1)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded { .. } | RetryState::Exhausted(_))
    }

    /// Transition out of `Attempting(attempt)` once that attempt resolved.
    pub fn after_attempt(attempt: u32, outcome: &AttemptOutcome, policy: &RetryPolicy) -> Self {
        match outcome {
            AttemptOutcome::Success { elapsed_ms } => RetryState::Succeeded {
                elapsed_ms: *elapsed_ms,
                attempt,
            },
            AttemptOutcome::Failure { .. } if attempt >= policy.max_attempts => {
                RetryState::Exhausted(attempt)
            }
            AttemptOutcome::Failure { .. } => RetryState::Delaying(attempt),
        }
    }
}

/// Terminal result of one orchestrated probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryResult {
    /// Round-trip time of the successful attempt, `None` when exhausted.
    pub elapsed_ms: Option<u64>,
    /// Index of the attempt at which the loop stopped.
    pub attempts_used: u32,
}

impl RetryResult {
    pub fn alive(&self) -> bool {
        self.elapsed_ms.is_some()
    }
}

/// Drives sequential attempts of a `Prober` until success or exhaustion.
#[derive(Debug, Clone, Default)]
pub struct RetryOrchestrator<P> {
    prober: P,
}

impl<P: Prober> RetryOrchestrator<P> {
    pub fn new(prober: P) -> Self {
        Self { prober }
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    pub async fn run(&self, host: &str, transport: Transport, policy: RetryPolicy) -> RetryResult {
        let method = transport.method();
        let mut state = RetryState::initial();

        loop {
            state = match state {
                RetryState::Attempting(attempt) => {
                    let outcome = self.prober.attempt(host, transport).await;
                    match &outcome {
                        AttemptOutcome::Success { elapsed_ms } => {
                            tracing::debug!(
                                host = %host,
                                method = %method,
                                attempt,
                                elapsed_ms,
                                "Probe attempt succeeded"
                            );
                        }
                        AttemptOutcome::Failure { reason } => {
                            tracing::debug!(
                                host = %host,
                                method = %method,
                                attempt,
                                reason = %reason,
                                "Probe attempt failed"
                            );
                        }
                    }
                    metrics::record_attempt(method, outcome.is_success());
                    RetryState::after_attempt(attempt, &outcome, &policy)
                }
                RetryState::Delaying(attempt) => {
                    time::sleep(policy.delay).await;
                    RetryState::Attempting(attempt + 1)
                }
                RetryState::Succeeded { elapsed_ms, attempt } => {
                    return RetryResult {
                        elapsed_ms: Some(elapsed_ms),
                        attempts_used: attempt,
                    };
                }
                RetryState::Exhausted(attempt) => {
                    tracing::info!(
                        host = %host,
                        method = %method,
                        attempts = attempt,
                        "Probe exhausted all attempts"
                    );
                    return RetryResult {
                        elapsed_ms: None,
                        attempts_used: attempt,
                    };
                }
            };
        }
    }
}
