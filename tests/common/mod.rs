//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use relay_probe::config::AppConfig;
use relay_probe::probe::{ProbeMethod, ProbeSettings};
use relay_probe::{HttpServer, SettingsStore, Shutdown};

/// Start the service on an ephemeral loopback port.
#[allow(dead_code)]
pub async fn spawn_server(
    config: AppConfig,
    store: Arc<SettingsStore>,
) -> (SocketAddr, Shutdown, mpsc::UnboundedSender<ProbeSettings>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, store);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    (addr, shutdown, updates_tx)
}

/// Accept and immediately drop every connection.
#[allow(dead_code)]
pub async fn start_tcp_acceptor() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });

    addr
}

/// A loopback port with nothing listening on it.
#[allow(dead_code)]
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// TCP settings with a short retry delay.
#[allow(dead_code)]
pub fn tcp_settings(port: u16) -> ProbeSettings {
    ProbeSettings {
        mode: ProbeMethod::Tcp,
        tcp_port: port,
        retry_count: 3,
        retry_delay_ms: 10,
        ..ProbeSettings::default()
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
