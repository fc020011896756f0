//! Web-app file serving.
//!
//! The entry page is served at the app route itself; everything below it is
//! looked up in the web-app directory. `ServeDir` takes care of path
//! sanitizing, content types and range requests.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Uri;
use axum::response::Response;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::WebAppConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Route of the web-app entry page; assets live below it
pub const APP_ROUTE: &str = "/8i/app";

/// Service for the entry page.
pub fn create_entry_service(app: &WebAppConfig) -> ServeFile {
    ServeFile::new(app.entry_page())
}

/// Serve a file from the web-app directory for any path under [`APP_ROUTE`].
pub async fn asset(State(state): State<AppState>, request: Request) -> Result<Response, AppError> {
    let relative = strip_app_prefix(request.uri())?;

    let (mut parts, body) = request.into_parts();
    parts.uri = relative;

    let response = ServeDir::new(&state.config.app.web_dir)
        .try_call(Request::from_parts(parts, body))
        .await?;

    Ok(response.map(Body::new))
}

/// `/8i/app/js/viewer.js?v=2` becomes `/js/viewer.js?v=2`.
fn strip_app_prefix(uri: &Uri) -> Result<Uri, AppError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let relative = path_and_query
        .strip_prefix(APP_ROUTE)
        .ok_or_else(|| AppError::NotFound(uri.path().to_string()))?;

    Uri::try_from(relative).map_err(|e| AppError::Internal(format!("bad asset uri: {}", e)))
}
