//! Gemini LLM client implementation
//!
//! Async HTTP client for the Gemini `generateContent` endpoint. Requests are
//! sent once; retry policy belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::traits::ModelClient;
use super::types::{
    ApiErrorBody, GenerateContentRequest, GenerateContentResponse, GenerationConfig, LlmResponse,
    ModelTurn,
};

/// Gemini API base URL
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Wait suggested to the caller when a 429 carries no retry hint
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Gemini LLM client
#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Builder for creating a GeminiClient
pub struct GeminiClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl Default for GeminiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            api_key: None,
            base_url: None,
            timeout_secs: None,
        }
    }

    /// Set the LLM configuration
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL (defaults to the public Gemini endpoint)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the GeminiClient
    pub fn build(self) -> Result<GeminiClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::ConfigError("API key is required".to_string()))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        Ok(GeminiClient {
            http_client,
            config,
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

impl GeminiClient {
    /// Create a new client with the given configuration and API key
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        GeminiClientBuilder::new().config(config).api_key(api_key).build()
    }

    /// Create a new builder for GeminiClient
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Model used for completions
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.config.model
        )
    }

    /// Generate a completion for `prompt` following `context`
    pub async fn generate(&self, context: &[ModelTurn], prompt: &str) -> Result<LlmResponse> {
        let request = GenerateContentRequest::new(context, prompt).with_generation_config(
            GenerationConfig {
                temperature: Some(self.config.temperature),
                max_output_tokens: Some(self.config.max_output_tokens),
            },
        );

        debug!(
            model = %self.config.model,
            contents = request.contents.len(),
            "Sending generateContent request"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();

        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        if let Some(reason) = body.block_reason() {
            return Err(Error::LLMError(format!("Prompt blocked: {}", reason)));
        }

        let llm_response = LlmResponse::from_api_response(&self.config.model, &body)
            .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))?;

        debug!(
            model = %llm_response.model,
            input_tokens = llm_response.input_tokens,
            output_tokens = llm_response.output_tokens,
            "Completion received"
        );

        Ok(llm_response)
    }

    /// Handle error responses from the API
    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);

        match status.as_u16() {
            401 | 403 => Err(Error::LLMError(format!(
                "Unauthorized: {}. Set GOOGLE_API_KEY to a valid key.",
                message
            ))),
            429 => Err(Error::RateLimited(
                extract_retry_after(&body).unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            )),
            400 => Err(Error::LLMError(format!("Bad request: {}", message))),
            404 => Err(Error::LLMError(format!(
                "Model '{}' not found: {}",
                self.config.model, message
            ))),
            500..=599 => Err(Error::LLMError(format!("Server error ({}): {}", status, message))),
            _ => Err(Error::LLMError(format!("HTTP error {}: {}", status, message))),
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn send(&self, context: &[ModelTurn], prompt: &str) -> Result<String> {
        self.generate(context, prompt).await.map(|r| r.content)
    }
}

/// Best-effort human message from an error body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{} ({})", parsed.error.message, status),
            None => parsed.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}

/// Extract the retry delay from a `RetryInfo` error detail (e.g. `"retryDelay": "27s"`)
fn extract_retry_after(body: &str) -> Option<u64> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.details.iter().find_map(|detail| {
        let delay = detail.get("retryDelay")?.as_str()?;
        let secs = delay.trim_end_matches('s');
        secs.parse::<f64>().ok().map(|s| s.ceil() as u64)
    })
}
