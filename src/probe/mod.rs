//! Reachability probing subsystem.
//!
//! # Data Flow
//! ```text
//! ProbeService::probe(host, mode?)
//!     → validate host
//!     → SettingsStore::snapshot() (one Arc for the whole call)
//!     → RetryOrchestrator (fixed count, fixed delay)
//!         → Prober attempt (ICMP echo or TCP connect, 5 s bound)
//!     → classifier (thresholds from the same snapshot)
//!     → ProbeOutcome
//! ```
//!
//! # Design Decisions
//! - Transport failures are data (`AttemptOutcome::Failure`), never errors
//! - Attempts within one probe are strictly sequential
//! - Nothing here holds state across invocations besides the settings store

pub mod classifier;
pub mod prober;
pub mod retry;
pub mod service;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{classify, LatencyTier};
pub use prober::{AttemptOutcome, NetworkProber, Prober, Transport, ATTEMPT_TIMEOUT};
pub use retry::{RetryOrchestrator, RetryPolicy, RetryResult, RetryState};
pub use service::{validate_host, ProbeError, ProbeOutcome, ProbeService};
pub use settings::{ProbeMethod, ProbeSettings, Thresholds, UnknownMethod};
