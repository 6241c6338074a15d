//! Text generation over the Gemini `generateContent` REST endpoint

use serde_json::{json, Value};
use std::time::Duration;

use super::retry::{BackoffPolicy, RetryDisposition};
use super::{require_env, ApiError};
use crate::config::GenerationConfig;

/// Finish reasons that mean the output was withheld
const BLOCKING_FINISH_REASONS: &[&str] =
    &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII", "RECITATION"];

/// Read `GEMINI_API_KEY`
pub fn api_key_from_env() -> Result<String, ApiError> {
    require_env("GEMINI_API_KEY")
}

/// Pull the generated text out of a response, or the reason it was blocked
pub fn parse_generation(response: &Value) -> Result<String, ApiError> {
    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(ApiError::Blocked(reason.to_string()));
    }

    let candidate = response
        .pointer("/candidates/0")
        .ok_or(ApiError::EmptyResponse)?;
    let finish = candidate
        .get("finishReason")
        .and_then(Value::as_str)
        .unwrap_or("STOP");
    if BLOCKING_FINISH_REASONS.contains(&finish) {
        return Err(ApiError::Blocked(finish.to_string()));
    }

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::EmptyResponse);
    }
    if finish != "STOP" {
        tracing::warn!("Generation finished with {}", finish);
    }
    Ok(text)
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GenerationConfig,
    api_key: String,
    backoff: BackoffPolicy,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig, api_key: String) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("postkit/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let backoff = BackoffPolicy {
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
        };
        Ok(Self {
            client,
            config,
            api_key,
            backoff,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Request body: the prompt, safety settings and sampling parameters
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "safetySettings": self.config.safety,
            "generationConfig": {
                "temperature": self.config.temperature,
                "topP": self.config.top_p,
                "topK": self.config.top_k,
            },
        })
    }

    /// Generate text, retrying transient failures with growing delays.
    /// Quota errors and blocked prompts are returned at once.
    pub async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let mut attempt = 0;
        loop {
            match self.generate_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e)
                    if e.disposition() == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries =>
                {
                    let delay = self.backoff.delay_for_attempt(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "Generation failed ({}), retrying in {}s ({}/{})",
                        e,
                        delay.as_secs(),
                        attempt,
                        self.backoff.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, ApiError> {
        tracing::debug!("POST {}", self.url());

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, body));
        }

        parse_generation(&response.json().await?)
    }
}
