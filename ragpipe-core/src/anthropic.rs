//! Anthropic generation client using the messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::generation::GenerationClient;

/// The Anthropic messages endpoint.
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// The API version header value the messages endpoint requires.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The default generation model.
const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";

/// The default completion budget. Answers are expected to be short and
/// grounded, so the cap stays small.
const DEFAULT_MAX_TOKENS: u32 = 80;

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that provides \
    accurate and concise answers based on the provided context.";

/// A [`GenerationClient`] backed by the Anthropic messages API.
///
/// Requests are deterministic (`temperature 0.0`): the answer should be a
/// function of the retrieved context, not of sampling noise.
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::anthropic::AnthropicGenerator;
///
/// let generator = AnthropicGenerator::from_env()?.with_model("claude-3-5-sonnet-latest");
/// let text = generator.generate("Say hello").await?;
/// ```
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicGenerator {
    /// Create a new generator with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::GenerationError {
                provider: "Anthropic".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Create a new generator using the `ANTHROPIC_API_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| RagError::GenerationError {
            provider: "Anthropic".into(),
            message: "ANTHROPIC_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

// ── Anthropic API request/response types ───────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl GenerationClient for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Anthropic", model = %self.model, prompt_len = prompt.len(), "generate");

        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: 0.0,
            system: SYSTEM_PROMPT,
            messages: vec![Message { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Anthropic", error = %e, "request failed");
                RagError::GenerationError {
                    provider: "Anthropic".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Anthropic", %status, "API error");
            return Err(RagError::GenerationError {
                provider: "Anthropic".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let messages_response: MessagesResponse = response.json().await.map_err(|e| {
            error!(provider = "Anthropic", error = %e, "failed to parse response");
            RagError::GenerationError {
                provider: "Anthropic".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        messages_response.content.into_iter().next().map(|block| block.text).ok_or_else(|| {
            RagError::GenerationError {
                provider: "Anthropic".into(),
                message: "API returned empty content".into(),
            }
        })
    }
}
