//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!
//! Probe settings document (JSON, administrator-owned):
//!     watcher.rs detects change
//!     → store::document re-reads it
//!     → validation.rs validates
//!     → SettingsStore swaps the snapshot atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only probe settings change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AppConfig, ListenerConfig, ObservabilityConfig, ServerEntry, StoreConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, validate_settings, ValidationError};
