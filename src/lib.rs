//! dualport - serve one web application over HTTP and HTTPS at once.
//!
//! The plaintext listener takes the first free port at or after the requested
//! one; the TLS listener takes the first free port after that. Without an
//! operator-supplied certificate a self-signed identity is generated on first
//! start and reused afterwards.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use http::{BootstrapError, Bootstrapper, Endpoint, Scheme, ServerRuntime};
pub use state::{AppState, RuntimeStatus};
