//! Generative-AI collaborator
//!
//! [`TextGenerator`] is injected where text generation is needed.
//! [`GeminiClient`] is built once from [`AssistConfig`] and shared by
//! reference; failures never escape as errors, they come back as
//! [`Generation::Failed`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

/// Result of one generation request
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// Plain text reply
    Text(String),
    /// Parsed structured reply
    Json(Value),
    /// Request or parsing failed
    Failed {
        /// What went wrong
        error: String,
    },
}

/// Produces text from a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply; `structured` asks for JSON
    async fn generate(&self, prompt: &str, structured: bool) -> Generation;
}

/// Gemini connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Gemini client failures
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    /// API key variable unset
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    /// Request failed
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with an error status
    #[error("API returned {status}: {body}")]
    Api {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Reply carried no text
    #[error("response contained no text")]
    EmptyResponse,

    /// Structured reply was not JSON
    #[error("invalid JSON in response: {0}")]
    Json(#[from] serde_json::Error),
}

/// `generateContent` client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: AssistConfig,
    api_key: String,
}

impl GeminiClient {
    /// Build a client, reading the API key from `config.api_key_env`
    ///
    /// # Errors
    ///
    /// Returns [`AssistError::MissingApiKey`] if the variable is unset, or
    /// [`AssistError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: AssistConfig) -> Result<Self, AssistError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| AssistError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key
    ///
    /// # Errors
    ///
    /// Returns [`AssistError::Http`] if the HTTP client cannot be built.
    pub fn with_api_key(config: AssistConfig, api_key: impl Into<String>) -> Result<Self, AssistError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    async fn request(&self, prompt: &str, structured: bool) -> Result<String, AssistError> {
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if structured {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: Value = response.json().await?;
        reply_text(&reply).ok_or(AssistError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, structured: bool) -> Generation {
        let result = match self.request(prompt, structured).await {
            Ok(text) if structured => serde_json::from_str(strip_json_fence(&text))
                .map(Generation::Json)
                .map_err(AssistError::from),
            Ok(text) => Ok(Generation::Text(text)),
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            warn!(model = %self.config.model, error = %err, "text generation failed");
            Generation::Failed {
                error: err.to_string(),
            }
        })
    }
}

/// Concatenated text parts of the first candidate
fn reply_text(reply: &Value) -> Option<String> {
    let parts = reply
        .pointer("/candidates/0/content/parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Remove a surrounding markdown code fence from a JSON reply
#[must_use]
pub fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
