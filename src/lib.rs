//! Relay reachability probe service library.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod store;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use probe::{ProbeOutcome, ProbeService};
pub use store::SettingsStore;
