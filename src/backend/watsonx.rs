use super::Backend;
use crate::protocol::{GenerationParameters, GenerationRequest};

/// API version date sent with every generation request.
const API_VERSION: &str = "version=2023-05-29";

/// watsonx backend configuration.
pub struct WatsonxConfig {
    pub base_url: String,
    pub project_id: String,
    pub model_id: String,
}

/// watsonx.ai text generation backend, authenticated with IAM bearer tokens.
pub struct Watsonx {
    base_url: String,
    project_id: String,
    model_id: String,
    parameters: GenerationParameters,
}

impl Watsonx {
    pub fn new(config: WatsonxConfig) -> Self {
        Self {
            base_url: config.base_url,
            project_id: config.project_id,
            model_id: config.model_id,
            parameters: GenerationParameters {
                max_new_tokens: 500,
                temperature: 0.7,
                top_p: 0.9,
                stop_sequences: Vec::new(),
            },
        }
    }
}

impl Backend for Watsonx {
    fn name(&self) -> &str {
        "watsonx"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generation_path(&self) -> &str {
        "/ml/v1/text/generation"
    }

    fn generation_query(&self) -> &str {
        API_VERSION
    }

    fn authorize_request(
        &self,
        headers: &mut http::HeaderMap,
        token: &str,
    ) -> Result<(), http::header::InvalidHeaderValue> {
        headers.insert(
            http::header::AUTHORIZATION,
            format!("Bearer {token}").parse()?,
        );
        Ok(())
    }

    fn generation_request(&self, input: &str) -> GenerationRequest {
        GenerationRequest {
            input: input.to_string(),
            parameters: self.parameters.clone(),
            model_id: self.model_id.clone(),
            project_id: self.project_id.clone(),
        }
    }
}
