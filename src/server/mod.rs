pub mod handlers;
pub mod middleware;
pub mod proxy;

use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::relay::Relay;

use self::handlers::AppState;

/// Build the axum router around the relay.
pub fn build_router(relay: Relay) -> Router {
    let state = Arc::new(AppState { relay });

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/query", post(handlers::query))
        .fallback(handlers::not_found)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .with_state(state)
}
