//! HTTP route handlers.
//!
//! The web-app routes carry a short Cache-Control header; the status route,
//! which doubles as the liveness probe, is never cached. Request tracing is
//! enabled via middleware that generates a unique request ID for each
//! incoming request.

pub mod status;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{CACHE_CONTROL_APP, CACHE_CONTROL_STATUS};
use crate::http::{asset, create_entry_service, APP_ROUTE};
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with all routes and cache headers.
pub fn create_router(state: AppState) -> Router {
    // Web app - entry page plus everything under it
    let app_routes = Router::new()
        .route_service(APP_ROUTE, create_entry_service(&state.config.app))
        .route(&format!("{}/{{*path}}", APP_ROUTE), get(asset))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_APP),
        ));

    let status_routes = Router::new()
        .route("/8i/status", get(status::status))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_STATUS),
        ));

    Router::new()
        .merge(app_routes)
        .merge(status_routes)
        .with_state(state)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::state::RuntimeStatus;

    #[tokio::test]
    async fn test_status_reports_published_url() {
        let runtime_status = RuntimeStatus::new();
        let state = AppState::new(AppConfig::default(), runtime_status.clone());

        let before = status::status(axum::extract::State(state.clone())).await;
        assert_eq!(before, "running#");

        runtime_status.publish("https://127.0.0.1:8190".to_string());
        let after = status::status(axum::extract::State(state)).await;
        assert_eq!(after, "running#https://127.0.0.1:8190");
    }

    #[test]
    fn test_router_builds() {
        let state = AppState::new(AppConfig::default(), RuntimeStatus::new());
        let _router = create_router(state);
    }
}
