//! Relay probe service.
//!
//! Backend for the relay dashboard: end users ask whether each relay endpoint
//! is reachable and how fast it answers, administrators tune the latency
//! tiers and retry policy at runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /probe/{host}?mode=icmp|tcp
//!        │
//!        ▼
//!   ┌──────────┐    ┌──────────────┐    ┌──────────────────┐    ┌────────────┐
//!   │  http    │───▶│ ProbeService │───▶│ RetryOrchestrator│───▶│  Prober    │──▶ relay
//!   │  server  │    └──────┬───────┘    └──────────────────┘    │ icmp / tcp │
//!   └──────────┘           │ snapshot                           └────────────┘
//!        ▲                 ▼
//!   ┌──────────┐    ┌──────────────┐    ┌──────────────────┐
//!   │  admin   │───▶│SettingsStore │◀───│ SettingsWatcher  │◀── settings.json
//!   │  routes  │    │  (ArcSwap)   │    └──────────────────┘
//!   └──────────┘    └──────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use relay_probe::config::watcher::SettingsWatcher;
use relay_probe::config::{load_config, AppConfig};
use relay_probe::lifecycle::{signals, Shutdown};
use relay_probe::observability::{logging, metrics};
use relay_probe::{HttpServer, SettingsStore};

#[derive(Parser)]
#[command(name = "relay-probe", version, about = "Relay reachability probe service")]
struct Args {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "RELAY_PROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(long, env = "RELAY_PROBE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("relay-probe v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        servers = config.servers.len(),
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(match &config.store.path {
        Some(path) => SettingsStore::open(path, config.probe.clone())?,
        None => SettingsStore::in_memory(config.probe.clone())?,
    });

    // The watcher handle has to outlive the server.
    let (_watcher, settings_updates) = match (&config.store.path, config.store.watch) {
        (Some(path), true) => {
            let (watcher, updates) = SettingsWatcher::new(Path::new(path));
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store);
    let server_task = tokio::spawn(server.run(listener, settings_updates, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
