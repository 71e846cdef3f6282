//! Latency classification.
//!
//! Pure mapping from a measured round-trip time to a tier. Each tier's bound
//! is upper-inclusive: a value equal to a threshold lands in the faster tier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::probe::settings::Thresholds;

/// Latency bucket shown to end users, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyTier {
    Excellent,
    Good,
    Fair,
    Poor,
    Unreachable,
}

impl LatencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LatencyTier::Excellent => "excellent",
            LatencyTier::Good => "good",
            LatencyTier::Fair => "fair",
            LatencyTier::Poor => "poor",
            LatencyTier::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for LatencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a probe result. `None` means the host never answered.
pub fn classify(elapsed_ms: Option<u64>, thresholds: &Thresholds) -> LatencyTier {
    let Some(elapsed) = elapsed_ms else {
        return LatencyTier::Unreachable;
    };

    if elapsed <= thresholds.tier4 {
        LatencyTier::Excellent
    } else if elapsed <= thresholds.tier3 {
        LatencyTier::Good
    } else if elapsed <= thresholds.tier2 {
        LatencyTier::Fair
    } else if elapsed <= thresholds.tier1 {
        LatencyTier::Poor
    } else {
        // Answered, but too slow to be usable.
        LatencyTier::Unreachable
    }
}
