use std::time::Duration;

use clap::Parser;

/// watsonx relay: forwards natural-language queries to watsonx.ai text generation.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Config {
    /// Listen address (e.g. ":3001" or "0.0.0.0:3001")
    #[arg(long, default_value = ":3001", env = "ADDR")]
    pub addr: String,

    /// Listen port; overrides the port part of --addr when set
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log format: "text" or "json"
    #[arg(long, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: String,

    /// IBM Cloud API key, exchanged for IAM bearer tokens
    #[arg(long, env = "WATSON_API_KEY")]
    pub watson_api_key: Option<String>,

    /// watsonx.ai base URL (e.g. "https://us-south.ml.cloud.ibm.com")
    #[arg(long, env = "WATSON_API_URL")]
    pub watson_api_url: Option<String>,

    /// watsonx.ai project identifier
    #[arg(long, env = "WATSON_PROJECT_ID")]
    pub watson_project_id: Option<String>,

    /// Foundation model used for text generation
    #[arg(
        long,
        default_value = "meta-llama/llama-3-1-70b-instruct",
        env = "WATSON_MODEL_ID"
    )]
    pub watson_model_id: String,

    /// IBM Cloud IAM token endpoint
    #[arg(
        long,
        default_value = "https://iam.cloud.ibm.com/identity/token",
        env = "IAM_URL"
    )]
    pub iam_url: String,

    /// Timeout for the IAM credential exchange, in seconds
    #[arg(long, default_value_t = 10, env = "IAM_TIMEOUT_SECS")]
    pub iam_timeout_secs: u64,

    /// Timeout for the text generation call, in seconds
    #[arg(long, default_value_t = 30, env = "INFERENCE_TIMEOUT_SECS")]
    pub inference_timeout_secs: u64,
}

/// Upstream settings injected into the relay. Missing values are kept as `None`
/// so the relay can report them per request instead of refusing to start.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub project_id: Option<String>,
    pub model_id: String,
    pub iam_url: String,
    pub iam_timeout: Duration,
    pub inference_timeout: Duration,
}

impl RelayConfig {
    /// Both the credential and the project are present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.project_id.is_some()
    }
}

impl Config {
    /// Address to bind, with `PORT` taking precedence over the port in `addr`.
    pub fn listen_addr(&self) -> String {
        let addr = normalize_addr(&self.addr);
        match self.port {
            Some(port) => match addr.rsplit_once(':') {
                Some((host, _)) => format!("{host}:{port}"),
                None => format!("{addr}:{port}"),
            },
            None => addr,
        }
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            api_key: non_empty(self.watson_api_key.as_deref()),
            api_url: non_empty(self.watson_api_url.as_deref()),
            project_id: non_empty(self.watson_project_id.as_deref()),
            model_id: self.watson_model_id.clone(),
            iam_url: self.iam_url.clone(),
            iam_timeout: Duration::from_secs(self.iam_timeout_secs),
            inference_timeout: Duration::from_secs(self.inference_timeout_secs),
        }
    }
}

/// Convert Go-style ":3001" to "0.0.0.0:3001".
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Treat unset and blank values alike.
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
