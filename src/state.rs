//! Shared application state for request handlers.

use std::sync::{Arc, OnceLock};

use crate::config::AppConfig;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Contains the application configuration and the runtime status the
/// bootstrapper publishes once both listeners are bound.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub status: RuntimeStatus,
}

impl AppState {
    /// Creates a new application state from the given configuration and status handle.
    pub fn new(config: AppConfig, status: RuntimeStatus) -> Self {
        Self {
            config: Arc::new(config),
            status,
        }
    }
}

/// External URL of the running server, set once at startup.
///
/// Created by the host, handed to both the router and the bootstrapper.
#[derive(Clone, Debug, Default)]
pub struct RuntimeStatus {
    external_url: Arc<OnceLock<String>>,
}

impl RuntimeStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the external URL. Returns false if one was already recorded.
    pub fn publish(&self, url: String) -> bool {
        self.external_url.set(url).is_ok()
    }

    /// The published URL, `None` until startup completes
    pub fn external_url(&self) -> Option<&str> {
        self.external_url.get().map(String::as_str)
    }
}
