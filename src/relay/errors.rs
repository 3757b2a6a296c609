use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::auth::AuthError;

/// Errors raised while relaying a query.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Query parameter is required and must be a string")]
    Validation,

    #[error("Watsonx.ai configuration is missing. Please check environment variables.")]
    Config,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Request timeout - Watsonx.ai took too long to respond")]
    UpstreamTimeout,

    #[error("Watsonx.ai API error: {message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },

    #[error("{0}")]
    Transport(String),
}

impl RelayError {
    /// HTTP status reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Config | Self::Auth(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}
