use std::any::Any;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info, warn};

/// Request logging: one line per request, level by status class. Health
/// probes are not logged.
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis();

    if response.status().is_server_error() {
        error!(method, path, status, duration_ms, "request");
    } else if response.status().is_client_error() {
        warn!(method, path, status, duration_ms, "request");
    } else {
        info!(method, path, status, duration_ms, "request");
    }

    response
}

/// Last-resort handler for a panicking request.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());

    error!(panic = %message, "unhandled error");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "message": message,
        })),
    )
        .into_response()
}
