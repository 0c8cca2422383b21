//! HTTP middleware of the dashboard API.
//!
//! Layers listed first are outermost: they see the request first and the
//! response last.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use lcadash_core::{ErrorCode, ErrorPayload};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use super::shutdown::ShutdownController;

const REQUEST_ID: &str = "x-request-id";

/// Wraps `router` in the transport middleware stack.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId`: assigns a UUID `X-Request-Id` when the client sent none
/// 2. `Trace`: one span per request
/// 3. `Compression`: gzip for large pages of rows
/// 4. `CORS`: the dashboard frontend is served from another origin
/// 5. `Timeout`: 408 after `request_timeout`
/// 6. `PropagateRequestId`: echoes `X-Request-Id` on the response
pub fn apply_http_layers(router: Router, config: &NetworkConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(build_cors_layer(&config.cors_origins))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            ))
            .layer(PropagateRequestIdLayer::new(request_id)),
    )
}

/// Builds the CORS layer. A `"*"` entry allows any origin; otherwise only
/// the origins that parse as header values are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(REQUEST_ID)])
}

/// Counts API requests as in flight and refuses new ones while draining.
pub async fn track_in_flight(
    State(shutdown): State<Arc<ShutdownController>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(_guard) = shutdown.admit() else {
        let body = ErrorPayload::new(ErrorCode::UpstreamFailure, "server is shutting down");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    };
    next.run(request).await
}
