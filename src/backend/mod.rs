pub mod watsonx;

pub use watsonx::{Watsonx, WatsonxConfig};

use crate::protocol::GenerationRequest;

/// Backend trait for hosted text generation services.
pub trait Backend: Send + Sync {
    /// Human-readable name for this backend.
    fn name(&self) -> &str;

    /// Base URL for API requests.
    fn base_url(&self) -> &str;

    /// Path of the text generation endpoint.
    fn generation_path(&self) -> &str;

    /// Query string appended to the generation endpoint.
    fn generation_query(&self) -> &str {
        ""
    }

    /// Add authentication to an outgoing request.
    fn authorize_request(
        &self,
        headers: &mut http::HeaderMap,
        token: &str,
    ) -> Result<(), http::header::InvalidHeaderValue>;

    /// Wrap the query text in the backend's request body.
    fn generation_request(&self, input: &str) -> GenerationRequest;
}
