use thiserror::Error;

/// IAM credential exchange errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to authenticate with IBM Cloud IAM: status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to authenticate with IBM Cloud IAM: {0}")]
    Transport(String),

    #[error("failed to authenticate with IBM Cloud IAM: invalid token response: {0}")]
    InvalidResponse(String),
}
