use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::protocol::{timestamp, ErrorResponse, HealthResponse, QueryResponse};
use crate::relay::{extract_query, Relay, RelayError};

/// Shared application state.
pub struct AppState {
    pub relay: Relay,
}

/// Health check handler.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: timestamp(),
        watson_configured: state.relay.is_configured(),
    })
}

/// Static service description.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Watsonx.ai Backend Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "query": "POST /api/query"
        },
        "usage": {
            "query": {
                "method": "POST",
                "url": "/api/query",
                "body": { "query": "Your question here" }
            }
        }
    }))
}

/// Query endpoint: validates the body and relays the query to the backend.
pub async fn query(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection, "rejected query body");
            return error_response(RelayError::Validation);
        }
    };

    let query = match extract_query(&body) {
        Ok(q) => q,
        Err(e) => return error_response(e),
    };

    match state.relay.relay(&query).await {
        Ok(response) => Json(QueryResponse {
            success: true,
            query,
            response,
            timestamp: timestamp(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    write_error(StatusCode::NOT_FOUND, "not found".to_string(), None)
}

/// Translate a relay error into its client-facing JSON response.
fn error_response(err: RelayError) -> Response {
    let status = err.status();
    match err {
        RelayError::Validation | RelayError::Config | RelayError::UpstreamTimeout => {
            write_error(status, err.to_string(), None)
        }
        RelayError::Upstream { ref details, .. } => {
            let details = details.clone();
            write_error(status, err.to_string(), Some(details))
        }
        RelayError::Auth(_) | RelayError::Transport(_) => write_error(
            status,
            "Failed to connect to Watsonx.ai service".to_string(),
            Some(Value::String(err.to_string())),
        ),
    }
}

fn write_error(status: StatusCode, error: String, details: Option<Value>) -> Response {
    (status, Json(ErrorResponse { error, details })).into_response()
}
