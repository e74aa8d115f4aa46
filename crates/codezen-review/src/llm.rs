use std::time::Duration;

use codezen_core::{CodezenError, LlmConfig};
use serde::Serialize;
use serde_json::Value;

/// What a generation call is for. Decides which fallback text the caller
/// gets when the endpoint cannot produce an answer.
///
/// # Examples
///
/// ```
/// use codezen_review::llm::Purpose;
///
/// assert!(Purpose::Chat.unreachable_text("http://localhost:11434").starts_with("I apologize"));
/// assert!(Purpose::Review.malformed_text("eof").starts_with("Error parsing response"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Initial review of a code snapshot.
    Review,
    /// Follow-up question about an existing review.
    Chat,
}

impl Purpose {
    /// Text returned when the endpoint is unreachable, times out, or answers
    /// with a non-success status.
    pub fn unreachable_text(&self, base_url: &str) -> String {
        match self {
            Purpose::Review => format!(
                "Error: Unable to connect to Ollama. Please ensure Ollama is running on {base_url}"
            ),
            Purpose::Chat => {
                "I apologize, but I'm currently unable to answer. Please try again later.".into()
            }
        }
    }

    /// Text returned when the endpoint answers but the envelope is unusable.
    pub fn malformed_text(&self, detail: &str) -> String {
        match self {
            Purpose::Review => format!("Error parsing response: {detail}"),
            Purpose::Chat => {
                "I apologize, but I encountered an error processing your question.".into()
            }
        }
    }
}

#[derive(Debug)]
enum GenerateFailure {
    Unreachable(String),
    Malformed(String),
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Client for the Ollama `/api/generate` endpoint.
///
/// [`LlmClient::generate`] always yields text: transport and envelope
/// failures are logged and replaced by the [`Purpose`] fallback, so callers
/// can persist whatever comes back without handling errors.
///
/// # Examples
///
/// ```
/// use codezen_core::LlmConfig;
/// use codezen_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     base_url: "http://localhost:11434/api/generate".into(),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl LlmClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, CodezenError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CodezenError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            model: config.model.clone(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Server root the client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the generate endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Generate a review for a prompt built by
    /// [`build_review_prompt`](crate::prompt::build_review_prompt).
    pub async fn review(&self, prompt: &str) -> String {
        self.generate(prompt, Purpose::Review).await
    }

    /// Answer a prompt built by [`build_chat_prompt`](crate::prompt::build_chat_prompt).
    pub async fn answer(&self, prompt: &str) -> String {
        self.generate(prompt, Purpose::Chat).await
    }

    /// Send one non-streaming generation request and return the model text,
    /// or the fallback text for `purpose` if anything goes wrong.
    pub async fn generate(&self, prompt: &str, purpose: Purpose) -> String {
        tracing::info!(model = %self.model, ?purpose, prompt_len = prompt.len(), "sending generation request");

        match self.try_generate(prompt).await {
            Ok(text) => text,
            Err(GenerateFailure::Unreachable(detail)) => {
                tracing::error!(endpoint = %self.endpoint(), error = %detail, "generation endpoint unavailable");
                purpose.unreachable_text(&self.base_url)
            }
            Err(GenerateFailure::Malformed(detail)) => {
                tracing::error!(endpoint = %self.endpoint(), error = %detail, "unparseable generation response");
                purpose.malformed_text(&detail)
            }
        }
    }

    async fn try_generate(&self, prompt: &str) -> Result<String, GenerateFailure> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateFailure::Unreachable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GenerateFailure::Unreachable(format!(
                "Ollama API error {status}: {body_text}"
            )));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| GenerateFailure::Unreachable(format!("failed to read response: {e}")))?;

        let envelope: Value =
            serde_json::from_str(&raw).map_err(|e| GenerateFailure::Malformed(e.to_string()))?;
        Ok(response_text(&envelope))
    }

    /// Check that the runtime answers at all (`GET /api/tags`).
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Llm`] if the server cannot be reached or
    /// answers with a non-success status.
    pub async fn ping(&self) -> Result<(), CodezenError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| CodezenError::Llm(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(CodezenError::Llm(format!(
                "Ollama API error {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Text of the envelope's `response` field. A missing or null field reads
/// as empty, and scalars are rendered as their JSON text.
fn response_text(envelope: &Value) -> String {
    match envelope.get("response") {
        Some(Value::String(text)) => text.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => String::new(),
    }
}

/// Reduce a configured URL to the server root.
///
/// Accepts either the root or a full API URL such as `.../api/generate`.
///
/// # Examples
///
/// ```
/// use codezen_review::llm::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:11434/api/generate"), "http://localhost:11434");
/// assert_eq!(normalize_base_url("http://gpu:11434/api/chat"), "http://gpu:11434");
/// assert_eq!(normalize_base_url("http://gpu:11434/"), "http://gpu:11434");
/// ```
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    let root = match url.find("/api/") {
        Some(idx) => &url[..idx],
        None => url,
    };
    root.trim_end_matches('/').to_string()
}
