//! In-process stand-in for the Ollama generate endpoint.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

type Responder = Arc<dyn Fn(&str) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
struct FakeState {
    responder: Responder,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

pub(crate) struct FakeOllama {
    pub base_url: String,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl FakeOllama {
    /// Every request body received so far, in arrival order.
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }

    /// The `prompt` fields received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["prompt"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

/// Reply to every prompt with an Ollama envelope around `answer(prompt)`.
pub(crate) async fn answering<F>(answer: F) -> FakeOllama
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    spawn(move |prompt| {
        let envelope = serde_json::json!({
            "model": "test-model",
            "response": answer(prompt),
            "done": true,
        });
        (StatusCode::OK, envelope.to_string())
    })
    .await
}

/// Reply to every prompt with a fixed status and raw body.
pub(crate) async fn raw(status: StatusCode, body: &'static str) -> FakeOllama {
    spawn(move |_| (status, body.to_string())).await
}

async fn spawn<F>(responder: F) -> FakeOllama
where
    F: Fn(&str) -> (StatusCode, String) + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = FakeState {
        responder: Arc::new(responder),
        requests: requests.clone(),
    };
    let app = Router::new()
        .route("/api/generate", post(generate))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeOllama {
        base_url: format!("http://{addr}"),
        requests,
    }
}

async fn generate(
    State(state): State<FakeState>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, String) {
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    state.requests.lock().unwrap().push(body);
    (state.responder)(&prompt)
}

/// A base URL nothing listens on.
pub(crate) const UNREACHABLE: &str = "http://127.0.0.1:1";
