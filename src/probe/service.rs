//! Probe facade invoked once per inbound request.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;
use crate::probe::classifier::{classify, LatencyTier};
use crate::probe::prober::{NetworkProber, Prober, Transport};
use crate::probe::retry::RetryOrchestrator;
use crate::probe::settings::ProbeMethod;
use crate::store::SettingsStore;

/// Longest host name accepted (DNS limit).
const MAX_HOST_LEN: usize = 253;

/// Request-validation failures. Unreachable hosts are never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("host is required")]
    MissingHost,

    #[error("invalid host {0:?}")]
    InvalidHost(String),

    #[error(transparent)]
    UnknownMode(#[from] crate::probe::settings::UnknownMethod),

    #[error("probe task did not complete")]
    Interrupted,
}

/// Result of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    /// Target as supplied by the caller.
    pub host: String,
    pub alive: bool,
    /// Round-trip time of the successful attempt.
    pub elapsed_ms: Option<u64>,
    pub attempts_used: u32,
    pub method: ProbeMethod,
    /// Port used for TCP probes.
    pub port: Option<u16>,
    pub tier: LatencyTier,
}

pub struct ProbeService<P = NetworkProber> {
    store: Arc<SettingsStore>,
    orchestrator: RetryOrchestrator<P>,
}

impl<P: Prober> ProbeService<P> {
    pub fn new(store: Arc<SettingsStore>, prober: P) -> Self {
        Self {
            store,
            orchestrator: RetryOrchestrator::new(prober),
        }
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    pub fn prober(&self) -> &P {
        self.orchestrator.prober()
    }

    /// Probe `host`, using `mode` if given and the configured default otherwise.
    pub async fn probe(
        &self,
        host: &str,
        mode: Option<ProbeMethod>,
    ) -> Result<ProbeOutcome, ProbeError> {
        let target = validate_host(host)?;

        // Every decision below comes from this one snapshot.
        let settings = self.store.snapshot();
        let method = mode.unwrap_or(settings.mode);
        let transport = match method {
            ProbeMethod::Icmp => Transport::Icmp,
            ProbeMethod::Tcp => Transport::Tcp {
                port: settings.tcp_port,
            },
        };

        let result = self
            .orchestrator
            .run(target, transport, settings.retry_policy())
            .await;
        let tier = classify(result.elapsed_ms, &settings.thresholds());

        metrics::record_probe(method, result.alive(), tier, result.elapsed_ms);
        tracing::info!(
            host = %host,
            method = %method,
            alive = result.alive(),
            elapsed_ms = ?result.elapsed_ms,
            attempts = result.attempts_used,
            tier = %tier,
            "Probe finished"
        );

        Ok(ProbeOutcome {
            host: host.to_string(),
            alive: result.alive(),
            elapsed_ms: result.elapsed_ms,
            attempts_used: result.attempts_used,
            method,
            port: transport.port(),
            tier,
        })
    }
}

impl<P: Prober + 'static> ProbeService<P> {
    /// Run the probe on its own task.
    ///
    /// If the caller goes away the attempt still runs to completion and its
    /// sockets or child process are released normally; the result is dropped.
    pub async fn probe_detached(
        self: &Arc<Self>,
        host: String,
        mode: Option<ProbeMethod>,
    ) -> Result<ProbeOutcome, ProbeError> {
        validate_host(&host)?;
        let service = Arc::clone(self);
        let task = tokio::spawn(async move { service.probe(&host, mode).await });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Probe task failed");
                Err(ProbeError::Interrupted)
            }
        }
    }
}

/// Check a caller-supplied host and return the form handed to the prober.
///
/// Bracketed IPv6 literals are unwrapped. A leading `-` is refused so a host
/// can never be taken for a `ping` option.
pub fn validate_host(host: &str) -> Result<&str, ProbeError> {
    if host.trim().is_empty() {
        return Err(ProbeError::MissingHost);
    }

    let target = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_');
    if target.is_empty()
        || target.len() > MAX_HOST_LEN
        || target.starts_with('-')
        || !target.chars().all(allowed)
    {
        return Err(ProbeError::InvalidHost(host.to_string()));
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::prober::AttemptOutcome;
    use crate::probe::testing::{fail, ok, ScriptedProber};
    use crate::probe::ProbeSettings;
    use proptest::prelude::*;

    fn service_with(
        settings: ProbeSettings,
        prober: ScriptedProber,
    ) -> ProbeService<ScriptedProber> {
        let store = Arc::new(SettingsStore::in_memory(settings).unwrap());
        ProbeService::new(store, prober)
    }

    fn fast_settings() -> ProbeSettings {
        ProbeSettings {
            retry_delay_ms: 10,
            ..ProbeSettings::default()
        }
    }

    #[test]
    fn test_host_validation() {
        assert_eq!(validate_host("185.244.21.156"), Ok("185.244.21.156"));
        assert_eq!(validate_host("relay-1.example.com"), Ok("relay-1.example.com"));
        assert_eq!(validate_host("[2001:db8::1]"), Ok("2001:db8::1"));
        assert_eq!(validate_host("2001:db8::1"), Ok("2001:db8::1"));

        assert_eq!(validate_host(""), Err(ProbeError::MissingHost));
        assert_eq!(validate_host("   "), Err(ProbeError::MissingHost));
        assert!(matches!(validate_host("-c 100"), Err(ProbeError::InvalidHost(_))));
        assert!(matches!(validate_host("-f"), Err(ProbeError::InvalidHost(_))));
        assert!(matches!(validate_host("a b"), Err(ProbeError::InvalidHost(_))));
        assert!(matches!(validate_host("host;rm"), Err(ProbeError::InvalidHost(_))));
        assert!(matches!(validate_host("[]"), Err(ProbeError::InvalidHost(_))));
        assert!(matches!(validate_host(&"a".repeat(254)), Err(ProbeError::InvalidHost(_))));
    }

    #[tokio::test]
    async fn test_invalid_host_makes_no_attempt() {
        let service = service_with(fast_settings(), ScriptedProber::new([ok(1)]));
        let err = service.probe("", None).await.unwrap_err();
        assert_eq!(err, ProbeError::MissingHost);
        assert_eq!(service.prober().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_excellent() {
        let service = service_with(fast_settings(), ScriptedProber::new([fail(), ok(40)]));

        let outcome = service.probe("185.244.21.156", None).await.unwrap();

        assert_eq!(
            outcome,
            ProbeOutcome {
                host: "185.244.21.156".into(),
                alive: true,
                elapsed_ms: Some(40),
                attempts_used: 2,
                method: ProbeMethod::Icmp,
                port: None,
                tier: LatencyTier::Excellent,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_an_outcome() {
        let service = service_with(fast_settings(), ScriptedProber::always_failing());

        let outcome = service.probe("relay.example", Some(ProbeMethod::Tcp)).await.unwrap();

        assert!(!outcome.alive);
        assert_eq!(outcome.elapsed_ms, None);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(outcome.tier, LatencyTier::Unreachable);
        assert_eq!(outcome.method, ProbeMethod::Tcp);
        assert_eq!(outcome.port, Some(443));
    }

    #[tokio::test]
    async fn test_mode_override_and_default() {
        let settings = ProbeSettings {
            mode: ProbeMethod::Tcp,
            tcp_port: 8443,
            ..fast_settings()
        };
        let service = service_with(settings, ScriptedProber::new([ok(75), ok(75)]));

        let default = service.probe("relay", None).await.unwrap();
        let icmp = service.probe("relay", Some(ProbeMethod::Icmp)).await.unwrap();

        assert_eq!(default.method, ProbeMethod::Tcp);
        assert_eq!(default.tier, LatencyTier::Good);
        assert_eq!(icmp.method, ProbeMethod::Icmp);
        assert_eq!(icmp.port, None);
        assert_eq!(
            service.prober().transports(),
            vec![Transport::Tcp { port: 8443 }, Transport::Icmp]
        );
    }

    #[tokio::test]
    async fn test_bracketed_host_echoed_as_supplied() {
        let service = service_with(fast_settings(), ScriptedProber::new([ok(5)]));
        let outcome = service.probe("[::1]", None).await.unwrap();
        assert_eq!(outcome.host, "[::1]");
    }

    #[tokio::test]
    async fn test_detached_probe() {
        let service = Arc::new(service_with(fast_settings(), ScriptedProber::new([ok(120)])));
        let outcome = service.probe_detached("relay".into(), None).await.unwrap();
        assert_eq!(outcome.tier, LatencyTier::Fair);

        let err = service.probe_detached(String::new(), None).await.unwrap_err();
        assert_eq!(err, ProbeError::MissingHost);
    }

    /// Replaces the store's settings while its first attempt is in flight.
    struct SwappingProber {
        store: Arc<SettingsStore>,
        replacement: ProbeSettings,
        outcome: AttemptOutcome,
    }

    impl Prober for SwappingProber {
        async fn attempt(&self, _host: &str, _transport: Transport) -> AttemptOutcome {
            self.store.reload(self.replacement.clone()).await.unwrap();
            self.outcome.clone()
        }
    }

    fn swapping_service(
        initial: ProbeSettings,
        replacement: ProbeSettings,
        outcome: AttemptOutcome,
    ) -> ProbeService<SwappingProber> {
        let store = Arc::new(SettingsStore::in_memory(initial).unwrap());
        let prober = SwappingProber {
            store: store.clone(),
            replacement,
            outcome,
        };
        ProbeService::new(store, prober)
    }

    #[tokio::test]
    async fn test_mid_flight_update_does_not_change_thresholds() {
        let slow = ProbeSettings {
            tier4: 200,
            tier3: 400,
            tier2: 600,
            tier1: 800,
            ..fast_settings()
        };
        let service = swapping_service(fast_settings(), slow.clone(), ok(150));

        let outcome = service.probe("relay", None).await.unwrap();

        // 150 ms is fair under the starting thresholds, excellent under the new ones.
        assert_eq!(outcome.tier, LatencyTier::Fair);
        assert_eq!(*service.store().snapshot(), slow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_flight_update_does_not_change_retry_policy() {
        let initial = ProbeSettings {
            retry_count: 2,
            ..fast_settings()
        };
        let replacement = ProbeSettings {
            retry_count: 6,
            tcp_port: 9000,
            ..fast_settings()
        };
        let service = swapping_service(initial, replacement, fail());

        let outcome = service.probe("relay", Some(ProbeMethod::Tcp)).await.unwrap();

        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(outcome.port, Some(443));
    }

    fn ascending() -> impl Strategy<Value = ProbeSettings> {
        (1u64..300, 1u64..300, 1u64..300, 1u64..300).prop_map(|(a, b, c, d)| ProbeSettings {
            tier4: a,
            tier3: a + b,
            tier2: a + b + c,
            tier1: a + b + c + d,
            retry_delay_ms: 0,
            ..ProbeSettings::default()
        })
    }

    proptest! {
        #[test]
        fn prop_tier_comes_from_one_snapshot(
            before in ascending(),
            after in ascending(),
            elapsed in 0u64..1_500,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let service = swapping_service(before.clone(), after, ok(elapsed));

            let outcome = runtime.block_on(service.probe("relay", None)).unwrap();

            prop_assert_eq!(outcome.tier, classify(Some(elapsed), &before.thresholds()));
        }
    }
}
