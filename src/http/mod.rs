//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, query parsing)
//!     → ProbeService / SettingsStore
//!     → response.rs (outcome and error bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ProbeQuery, X_REQUEST_ID};
pub use response::{ErrorBody, ProbeResponse};
pub use server::{AppState, HttpServer};
