use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error response returned by the API.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub watson_configured: bool,
}

/// Successful `/api/query` response.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub query: String,
    pub response: String,
    pub timestamp: String,
}

/// watsonx.ai `/ml/v1/text/generation` request body.
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    pub input: String,
    pub parameters: GenerationParameters,
    pub model_id: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub stop_sequences: Vec<String>,
}

/// watsonx.ai text generation response; only the fields the relay reads.
/// `results` is kept loose: null, non-array or malformed entries all mean
/// "no text" rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub results: Option<Value>,
}

impl GenerationResponse {
    /// Text of the first result, if it carries any.
    pub fn first_text(&self) -> Option<String> {
        self.results
            .as_ref()?
            .get(0)?
            .get("generated_text")?
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// IBM Cloud IAM token endpoint response.
#[derive(Debug, Deserialize)]
pub struct IamTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_text_reads_first_result() {
        let resp: GenerationResponse = serde_json::from_value(json!({
            "model_id": "meta-llama/llama-3-1-70b-instruct",
            "results": [
                {"generated_text": "first", "stop_reason": "eos_token"},
                {"generated_text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(resp.first_text().as_deref(), Some("first"));
    }

    #[test]
    fn test_first_text_missing_or_empty() {
        let missing: GenerationResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.first_text(), None);

        let empty: GenerationResponse =
            serde_json::from_value(json!({"results": [{"generated_text": ""}]})).unwrap();
        assert_eq!(empty.first_text(), None);

        let null: GenerationResponse =
            serde_json::from_value(json!({"results": [{"generated_text": null}]})).unwrap();
        assert_eq!(null.first_text(), None);
    }

    #[test]
    fn test_first_text_tolerates_malformed_results() {
        for body in [
            json!({"results": null}),
            json!({"results": [null]}),
            json!({"results": "oops"}),
            json!({"results": {"generated_text": "not an array"}}),
            json!({"results": [{"generated_text": 5}]}),
            json!({"results": [{"generated_text": ["a"]}]}),
        ] {
            let resp: GenerationResponse = serde_json::from_value(body.clone()).unwrap();
            assert_eq!(resp.first_text(), None, "body {body}");
        }
    }

    #[test]
    fn test_error_response_omits_missing_details() {
        let body = serde_json::to_value(ErrorResponse {
            error: "bad".into(),
            details: None,
        })
        .unwrap();
        assert_eq!(body, json!({"error": "bad"}));
    }

    #[test]
    fn test_timestamp_is_utc_millis() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        // 2024-01-01T00:00:00.000Z
        assert_eq!(ts.len(), 24);
    }
}
