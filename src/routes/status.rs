//! Status endpoint reporting where the server can be reached.

use axum::extract::State;

use crate::config::STATUS_PREFIX;
use crate::state::AppState;

/// Returns `running#<external URL>`.
///
/// The URL part stays empty until the bootstrapper has published it.
pub async fn status(State(state): State<AppState>) -> String {
    format!(
        "{}{}",
        STATUS_PREFIX,
        state.status.external_url().unwrap_or_default()
    )
}
