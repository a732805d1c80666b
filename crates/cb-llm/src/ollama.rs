//! Stateless client for the Ollama HTTP API.
//!
//! One blocking round trip per call, caller-visible timeout, no retries —
//! retry policy belongs to whoever owns the call site.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::error::{LlmError, LlmResult};

/// Timeout for the lightweight availability probe (`/api/tags`).
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single message in a chat-style request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Generation options forwarded to Ollama.
#[derive(Serialize)]
struct GenOptions {
    temperature: f64,
    num_predict: u32,
}

/// `/api/generate` request body.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenOptions,
}

/// `/api/generate` response (only the field we need).
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// `/api/chat` request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: GenOptions,
}

/// `/api/chat` response (only the fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// `/api/tags` response.
#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for the Ollama generation endpoint.
///
/// Holds only read-only configuration and a pooled `reqwest::Client`, so
/// a single instance is safe to share across concurrent requests.
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Single-turn generation. `temperature` and `max_tokens` fall back to
    /// the configured defaults when `None`.
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: Option<f64>,
        max_tokens: Option<u32>,
    ) -> LlmResult<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            system,
            stream: false,
            options: GenOptions {
                temperature: temperature.unwrap_or(self.config.temperature),
                num_predict: max_tokens.unwrap_or(self.config.max_tokens),
            },
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "ollama generate returned non-success");
            return Err(LlmError::Failed {
                status: status.as_u16(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unavailable(format!("invalid generate response body: {e}")))?;
        Ok(parsed.response)
    }

    /// Chat-style generation over an ordered role/content message list.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f64>,
        max_tokens: Option<u32>,
    ) -> LlmResult<String> {
        let url = format!("{}/api/chat", self.config.base_url);
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options: GenOptions {
                temperature: temperature.unwrap_or(self.config.temperature),
                num_predict: max_tokens.unwrap_or(self.config.max_tokens),
            },
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "ollama chat returned non-success");
            return Err(LlmError::Failed {
                status: status.as_u16(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unavailable(format!("invalid chat response body: {e}")))?;
        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }

    /// Whether the endpoint answers at all.
    pub async fn check_availability(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self
            .client
            .get(&url)
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::error!(error = %e, "ollama server unavailable");
                false
            }
        }
    }

    /// Names of the models installed on the endpoint.
    pub async fn list_models(&self) -> LlmResult<Vec<String>> {
        let url = format!("{}/api/tags", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Failed {
                status: status.as_u16(),
            });
        }
        let parsed: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unavailable(format!("invalid tags response body: {e}")))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether the configured model is installed on the endpoint.
    pub async fn model_available(&self) -> bool {
        match self.list_models().await {
            Ok(models) => {
                let available = models.iter().any(|m| m == &self.config.model);
                if !available {
                    tracing::warn!(
                        model = %self.config.model,
                        installed = ?models,
                        "configured model not installed"
                    );
                }
                available
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to list installed models");
                false
            }
        }
    }
}
