//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, timeout)
//! - Bind server to listener
//! - Apply settings reloaded by the document watcher
//! - Graceful shutdown on the broadcast signal

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{AdminConfig, AppConfig, ServerEntry};
use crate::http::request::{make_request_span, ProbeQuery};
use crate::http::response::ProbeResponse;
use crate::probe::{NetworkProber, ProbeError, ProbeMethod, ProbeService, ProbeSettings};
use crate::store::SettingsStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub probes: Arc<ProbeService<NetworkProber>>,
    pub store: Arc<SettingsStore>,
    pub servers: Arc<Vec<ServerEntry>>,
    pub admin: Arc<AdminConfig>,
}

/// HTTP server for the probe dashboard API.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    store: Arc<SettingsStore>,
}

impl HttpServer {
    /// Create a new HTTP server around an already opened settings store.
    pub fn new(config: AppConfig, store: Arc<SettingsStore>) -> Self {
        let probes = Arc::new(ProbeService::new(store.clone(), NetworkProber::new()));

        let state = AppState {
            probes,
            store: store.clone(),
            servers: Arc::new(config.servers.clone()),
            admin: Arc::new(config.admin.clone()),
        };

        let router = Self::build_router(&config, state);
        Self { router, config, store }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Probe routes sit outside the request timeout: each attempt is
    /// already bounded and a probe must always answer with its outcome.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let probes = Router::new()
            .route("/probe", get(missing_host))
            .route("/probe/{host}", get(probe_handler))
            .route("/api/ping/{host}", get(icmp_handler))
            .route("/api/ping-tcp/{host}", get(tcp_handler))
            .with_state(state.clone());

        let mut bounded = Router::new()
            .route("/api/ping-settings", get(get_ping_settings))
            .route("/api/servers", get(get_servers))
            .route("/health", get(health))
            .with_state(state.clone());

        if config.admin.enabled {
            bounded = bounded.merge(setup_admin_router(state));
        }

        let bounded = bounded.layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )));

        probes.merge(bounded).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut settings_updates: mpsc::UnboundedReceiver<ProbeSettings>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let store = self.store.clone();
        let reloads = tokio::spawn(async move {
            while let Some(settings) = settings_updates.recv().await {
                if let Err(e) = store.reload(settings).await {
                    tracing::error!(error = %e, "Failed to apply reloaded settings");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        reloads.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn probe_handler(
    State(state): State<AppState>,
    Path(host): Path<String>,
    Query(query): Query<ProbeQuery>,
) -> Result<Json<ProbeResponse>, ProbeError> {
    let mode = query.method()?;
    run_probe(&state, host, mode).await
}

/// Legacy dashboard route: ICMP only.
async fn icmp_handler(
    State(state): State<AppState>,
    Path(host): Path<String>,
) -> Result<Json<ProbeResponse>, ProbeError> {
    run_probe(&state, host, Some(ProbeMethod::Icmp)).await
}

/// Legacy dashboard route: TCP only.
async fn tcp_handler(
    State(state): State<AppState>,
    Path(host): Path<String>,
) -> Result<Json<ProbeResponse>, ProbeError> {
    run_probe(&state, host, Some(ProbeMethod::Tcp)).await
}

async fn run_probe(
    state: &AppState,
    host: String,
    mode: Option<ProbeMethod>,
) -> Result<Json<ProbeResponse>, ProbeError> {
    let outcome = state.probes.probe_detached(host, mode).await?;
    Ok(Json(ProbeResponse::from(outcome)))
}

async fn missing_host() -> ProbeError {
    ProbeError::MissingHost
}

async fn get_ping_settings(State(state): State<AppState>) -> Json<ProbeSettings> {
    Json(state.store.snapshot().as_ref().clone())
}

async fn get_servers(State(state): State<AppState>) -> Json<Vec<ServerEntry>> {
    Json(state.servers.as_ref().clone())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
