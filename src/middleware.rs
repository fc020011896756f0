//! Request ID middleware for correlating logs with requests.
//!
//! Every request gets a UUID v4 and a tracing span carrying the listener's
//! scheme, so plaintext and TLS traffic can be told apart in the logs.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

use crate::http::Scheme;

/// Request ID stored in request extensions.
#[derive(Clone, Debug)]
pub struct RequestId(pub Uuid);

/// Middleware that generates a request ID and wraps the request in a span.
///
/// The scheme is read from the `Scheme` extension each listener attaches.
pub async fn request_id_layer(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let scheme = request
        .extensions()
        .get::<Scheme>()
        .map(Scheme::as_str)
        .unwrap_or("unknown");

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        scheme,
        method = %request.method(),
        path = %request.uri().path(),
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();
    request.extensions_mut().insert(RequestId(request_id));

    async move {
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::debug!(status = response.status().as_u16(), duration_ms, "Request completed");

        response
    }
    .instrument(span)
    .await
}
