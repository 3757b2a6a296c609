pub mod errors;

pub use errors::RelayError;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{error, info};

use crate::auth::TokenCache;
use crate::backend::{Backend, Watsonx, WatsonxConfig};
use crate::config::RelayConfig;
use crate::protocol::GenerationResponse;
use crate::server::proxy::build_upstream_url;

/// Returned when the backend answers without any generated text.
pub const NO_RESPONSE: &str = "No response generated from Watsonx.ai";

/// Credential-cached relay: owns the token cache and forwards queries to the backend.
pub struct Relay {
    config: RelayConfig,
    backend: Option<Box<dyn Backend>>,
    tokens: TokenCache,
    http_client: reqwest::Client,
}

impl Relay {
    pub fn new(config: RelayConfig, http_client: reqwest::Client) -> Self {
        let backend = match (&config.api_url, &config.project_id) {
            (Some(base_url), Some(project_id)) => Some(Box::new(Watsonx::new(WatsonxConfig {
                base_url: base_url.clone(),
                project_id: project_id.clone(),
                model_id: config.model_id.clone(),
            })) as Box<dyn Backend>),
            _ => None,
        };

        let tokens = TokenCache::new(
            config.iam_url.clone(),
            http_client.clone(),
            config.iam_timeout,
        );

        Self {
            config,
            backend,
            tokens,
            http_client,
        }
    }

    /// Credential and project are both present.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send `query` to the backend and return the first generated text.
    pub async fn relay(&self, query: &str) -> Result<String, RelayError> {
        if query.is_empty() {
            return Err(RelayError::Validation);
        }

        let (Some(api_key), Some(backend)) =
            (self.config.api_key.as_deref(), self.backend.as_deref())
        else {
            return Err(RelayError::Config);
        };

        let url = build_upstream_url(
            backend.base_url(),
            backend.generation_path(),
            backend.generation_query(),
        )
        .map_err(|e| {
            error!(backend = backend.name(), base_url = backend.base_url(), error = %e, "failed to build upstream URL");
            RelayError::Transport(format!("invalid upstream URL: {e}"))
        })?;

        let token = self.tokens.get_token(api_key).await?;

        let mut headers = http::HeaderMap::new();
        backend
            .authorize_request(&mut headers, &token)
            .map_err(|e| RelayError::Transport(format!("invalid access token: {e}")))?;

        let request = backend.generation_request(query);

        info!(backend = backend.name(), "sending generation request");

        let exchange = async {
            let resp = self
                .http_client
                .post(&url)
                .headers(headers)
                .json(&request)
                .send()
                .await?;
            let status = resp.status();
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) =
            match tokio::time::timeout(self.config.inference_timeout, exchange).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) if e.is_timeout() => {
                    error!(backend = backend.name(), url = %url, "upstream request timed out");
                    return Err(RelayError::UpstreamTimeout);
                }
                Ok(Err(e)) => {
                    error!(backend = backend.name(), url = %url, error = %e, "upstream request failed");
                    return Err(RelayError::Transport(e.to_string()));
                }
                Err(_) => {
                    error!(backend = backend.name(), url = %url, "upstream request timed out");
                    return Err(RelayError::UpstreamTimeout);
                }
            };

        if !status.is_success() {
            let err = upstream_error(status, &body);
            error!(backend = backend.name(), status = status.as_u16(), error = %err, "upstream returned error");
            return Err(err);
        }

        let parsed: GenerationResponse = serde_json::from_slice(&body).map_err(|e| {
            error!(backend = backend.name(), error = %e, "failed to decode upstream response");
            RelayError::Transport(format!("invalid response from Watsonx.ai: {e}"))
        })?;

        info!(backend = backend.name(), "generation response received");

        Ok(parsed
            .first_text()
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}

/// Pull the query text out of a request body: a non-empty string under `query`.
pub fn extract_query(body: &Value) -> Result<String, RelayError> {
    body.get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .ok_or(RelayError::Validation)
}

/// Normalize a non-success upstream answer. The body becomes `details`
/// (raw text when it is not JSON); the message prefers the body's own.
fn upstream_error(status: StatusCode, body: &[u8]) -> RelayError {
    let details: Value = serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));

    let message = details
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| details.pointer("/errors/0/message").and_then(Value::as_str))
        .or_else(|| status.canonical_reason())
        .unwrap_or("unknown error")
        .to_string();

    RelayError::Upstream {
        status: status.as_u16(),
        message,
        details,
    }
}
