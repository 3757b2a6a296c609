use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::RelayConfig;

/// Serve `app` on a random local port. Returns the base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{addr}")
}

/// How the simulated generation endpoint answers.
#[derive(Clone)]
pub enum Generation {
    Text(&'static str),
    NoResults,
    Status(StatusCode, Value),
    Raw(StatusCode, &'static str),
    Delay(Duration),
}

/// What the generation endpoint saw on its last call.
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub authorization: String,
    pub query: Option<String>,
    pub body: Value,
}

/// Local stand-in for both IAM and watsonx.ai.
pub struct MockUpstream {
    pub base_url: String,
    pub iam_calls: Arc<AtomicUsize>,
    pub generation_calls: Arc<AtomicUsize>,
    pub last_request: Arc<Mutex<Option<SeenRequest>>>,
}

#[derive(Clone)]
struct MockState {
    generation: Generation,
    iam_calls: Arc<AtomicUsize>,
    generation_calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<SeenRequest>>>,
}

impl MockUpstream {
    pub async fn spawn(generation: Generation) -> Self {
        let state = MockState {
            generation,
            iam_calls: Arc::new(AtomicUsize::new(0)),
            generation_calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        };

        let app = Router::new()
            .route("/identity/token", post(iam_token))
            .route("/ml/v1/text/generation", post(generate))
            .with_state(state.clone());

        Self {
            base_url: spawn_server(app).await,
            iam_calls: state.iam_calls,
            generation_calls: state.generation_calls,
            last_request: state.last_request,
        }
    }

    /// Relay configuration pointing at this mock with every setting present.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            api_key: Some("test-api-key".into()),
            api_url: Some(self.base_url.clone()),
            project_id: Some("project-1".into()),
            model_id: "meta-llama/llama-3-1-70b-instruct".into(),
            iam_url: format!("{}/identity/token", self.base_url),
            iam_timeout: Duration::from_secs(5),
            inference_timeout: Duration::from_millis(300),
        }
    }

    pub fn iam_calls(&self) -> usize {
        self.iam_calls.load(Ordering::SeqCst)
    }

    pub fn generation_calls(&self) -> usize {
        self.generation_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SeenRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

async fn iam_token(State(state): State<MockState>) -> Json<Value> {
    let n = state.iam_calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("iam-token-{n}"),
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
}

async fn generate(
    State(state): State<MockState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.generation_calls.fetch_add(1, Ordering::SeqCst);
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *state.last_request.lock().unwrap() = Some(SeenRequest {
        authorization,
        query,
        body,
    });

    match state.generation {
        Generation::Text(text) => Json(json!({
            "model_id": "meta-llama/llama-3-1-70b-instruct",
            "results": [{"generated_text": text, "stop_reason": "eos_token"}]
        }))
        .into_response(),
        Generation::NoResults => Json(json!({"results": []})).into_response(),
        Generation::Status(status, payload) => (status, Json(payload)).into_response(),
        Generation::Raw(status, text) => (status, text).into_response(),
        Generation::Delay(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({"results": [{"generated_text": "too late"}]})).into_response()
        }
    }
}
