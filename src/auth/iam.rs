use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{error, info};

use super::AuthError;
use crate::protocol::IamTokenResponse;

/// Grant type for exchanging an IBM Cloud API key.
const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Subtracted from the declared token lifetime so a token never expires mid-request.
pub const SAFETY_MARGIN: Duration = Duration::from_secs(600);

/// Upper bound on a provider-declared token lifetime.
const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum number of error body bytes kept on a rejected exchange.
const MAX_ERROR_BODY: usize = 1024;

/// Single-slot IAM access token cache.
///
/// The slot holds the token together with its expiry, so a present token always
/// has the deadline computed when it was stored. A refresh overwrites the slot
/// unconditionally. Concurrent callers that find the slot stale each run their
/// own exchange; the lock is never held across the network call.
pub struct TokenCache {
    token_url: String,
    http_client: reqwest::Client,
    timeout: Duration,
    slot: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl TokenCache {
    pub fn new(token_url: String, http_client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            token_url,
            http_client,
            timeout,
            slot: RwLock::new(None),
        }
    }

    /// Return a valid bearer token, exchanging `api_key` for a new one when the
    /// cached token is absent or expired.
    pub async fn get_token(&self, api_key: &str) -> Result<String, AuthError> {
        {
            let slot = self.slot.read().await;
            if let Some(cached) = slot.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        info!(url = %self.token_url, "requesting IAM access token");

        let grant = self.exchange(api_key).await.inspect_err(|e| {
            error!(url = %self.token_url, error = %e, "IAM token exchange failed");
        })?;

        let issued_at = Instant::now();
        let lifetime = Duration::from_secs(grant.expires_in);
        let expires_at = expiry_deadline(issued_at, lifetime);

        *self.slot.write().await = Some(CachedToken {
            access_token: grant.access_token.clone(),
            expires_at,
        });

        info!(expires_in = grant.expires_in, "IAM access token obtained");
        Ok(grant.access_token)
    }

    /// Store a token directly (for testing).
    #[cfg(test)]
    pub async fn insert_token(&self, access_token: String, expires_at: Instant) {
        *self.slot.write().await = Some(CachedToken {
            access_token,
            expires_at,
        });
    }

    /// Expiry of the cached token (for testing).
    #[cfg(test)]
    pub async fn expires_at(&self) -> Option<Instant> {
        self.slot.read().await.as_ref().map(|c| c.expires_at)
    }

    async fn exchange(&self, api_key: &str) -> Result<IamTokenResponse, AuthError> {
        let resp = self
            .http_client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", APIKEY_GRANT_TYPE), ("apikey", api_key)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

/// Deadline after which a token issued at `issued_at` must not be reused.
/// Lifetimes shorter than the safety margin expire immediately; declared
/// lifetimes are capped at `MAX_LIFETIME`.
pub fn expiry_deadline(issued_at: Instant, lifetime: Duration) -> Instant {
    let usable = lifetime.min(MAX_LIFETIME).saturating_sub(SAFETY_MARGIN);
    issued_at.checked_add(usable).unwrap_or(issued_at)
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
