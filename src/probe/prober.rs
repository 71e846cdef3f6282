//! Single reachability attempts.
//!
//! # Responsibilities
//! - Run exactly one ICMP echo or TCP connect against a host
//! - Bound every attempt by a fixed 5 second deadline
//! - Fold every failure (timeout, refusal, resolution, I/O) into `AttemptOutcome::Failure`
//!
//! # Design Decisions
//! - ICMP goes through the system `ping` binary, so no raw-socket privileges are needed
//! - Child processes and sockets are owned by the attempt future and released on drop

use std::future::Future;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time;

use crate::probe::settings::ProbeMethod;

/// Upper bound for one attempt, for both transports. For ICMP it bounds the
/// whole `ping` child, which also gets it as `-W`.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport plus whatever addressing it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Icmp,
    Tcp { port: u16 },
}

impl Transport {
    pub fn method(&self) -> ProbeMethod {
        match self {
            Transport::Icmp => ProbeMethod::Icmp,
            Transport::Tcp { .. } => ProbeMethod::Tcp,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Transport::Icmp => None,
            Transport::Tcp { port } => Some(*port),
        }
    }
}

/// Result of one attempt. The reason is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { elapsed_ms: u64 },
    Failure { reason: String },
}

impl AttemptOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        AttemptOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }
}

/// Something that can make one bounded reachability attempt.
///
/// Implementations never return an error: every failure becomes
/// `AttemptOutcome::Failure`.
pub trait Prober: Send + Sync {
    fn attempt(
        &self,
        host: &str,
        transport: Transport,
    ) -> impl Future<Output = AttemptOutcome> + Send;
}

/// Prober backed by the host network stack.
#[derive(Debug, Clone)]
pub struct NetworkProber {
    timeout: Duration,
    ping_program: String,
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self {
            timeout: ATTEMPT_TIMEOUT,
            ping_program: "ping".to_string(),
        }
    }
}

impl NetworkProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different `ping` executable (e.g. an absolute path).
    pub fn with_ping_program(mut self, program: impl Into<String>) -> Self {
        self.ping_program = program.into();
        self
    }

    /// One echo request via `ping -n -c 1 -W <secs> <host>`.
    pub async fn icmp(&self, host: &str) -> AttemptOutcome {
        let wait_secs = self.timeout.as_secs().max(1).to_string();
        let mut command = Command::new(&self.ping_program);
        command
            .args(["-n", "-c", "1", "-W", wait_secs.as_str(), host])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return AttemptOutcome::failure(format!(
                    "failed to run {}: {}",
                    self.ping_program, e
                ))
            }
            Err(_) => return AttemptOutcome::failure("timeout"),
        };

        if !output.status.success() {
            return AttemptOutcome::failure("no echo reply");
        }

        match parse_rtt_ms(&String::from_utf8_lossy(&output.stdout)) {
            Some(rtt) => AttemptOutcome::Success {
                elapsed_ms: rtt.round() as u64,
            },
            None => AttemptOutcome::failure("reply without round-trip time"),
        }
    }

    /// One TCP connect, timed from initiation to establishment.
    pub async fn tcp(&self, host: &str, port: u16) -> AttemptOutcome {
        let start = Instant::now();
        match time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                let elapsed = start.elapsed();
                drop(stream);
                AttemptOutcome::Success {
                    elapsed_ms: elapsed.as_millis() as u64,
                }
            }
            Ok(Err(e)) => AttemptOutcome::failure(e.to_string()),
            Err(_) => AttemptOutcome::failure("timeout"),
        }
    }
}

impl Prober for NetworkProber {
    async fn attempt(&self, host: &str, transport: Transport) -> AttemptOutcome {
        match transport {
            Transport::Icmp => self.icmp(host).await,
            Transport::Tcp { port } => self.tcp(host, port).await,
        }
    }
}

/// Extract the round-trip time from `ping` output (`time=14.2 ms`, `time<1 ms`).
pub fn parse_rtt_ms(output: &str) -> Option<f64> {
    static RTT: OnceLock<Regex> = OnceLock::new();
    let re = RTT.get_or_init(|| {
        Regex::new(r"time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").expect("valid rtt pattern")
    });
    re.captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
