//! Google Gemini API clients.
//!
//! Three thin wrappers over the generative-language REST API share one
//! `GeminiClient`:
//! - [`analysis`] — schema-constrained JSON analysis of a table sample
//! - [`chat`] — stateful follow-up conversation with streamed replies
//! - [`speech`] — text-to-speech synthesis returning raw PCM bytes
//!
//! Auth is via `?key=API_KEY` query parameter; streaming uses `?alt=sse`.

pub mod analysis;
pub mod chat;
pub mod speech;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::GeminiError;

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Shared HTTP plumbing for the Gemini API wrappers.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    /// Model used for analysis and chat completions.
    pub model: String,
    /// Model used for speech synthesis.
    pub tts_model: String,
    /// Prebuilt voice name for synthesized replies.
    pub voice: String,
}

impl GeminiClient {
    /// Create a client from configuration.
    ///
    /// The API key comes from `config.api_key` or, failing that, the
    /// environment variable named by `config.api_key_env`.
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .ok_or_else(|| GeminiError::AuthFailed {
                var: config.api_key_env.clone(),
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GeminiError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            tts_model: config.tts_model.clone(),
            voice: config.voice.clone(),
        })
    }

    /// Build the endpoint URL for an API call, key appended as `?key=`.
    fn endpoint_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }

    /// Endpoint URL for a streaming call (`?alt=sse`).
    fn streaming_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, self.api_key
        )
    }

    /// POST a JSON body and parse the JSON response, mapping HTTP errors.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, GeminiError> {
        debug!(url = url.split('?').next().unwrap_or(url), "Gemini request");

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::ApiRequest {
                message: format!("Request to Gemini API failed: {}", e),
            })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| GeminiError::ResponseParse {
                message: format!("Failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(map_http_error(status, &body_text));
        }

        serde_json::from_str(&body_text).map_err(|e| GeminiError::ResponseParse {
            message: format!("Invalid JSON in response: {}", e),
        })
    }

    /// Concatenate the text parts of the first candidate in a response.
    fn candidate_text(body: &Value) -> Result<String, GeminiError> {
        let parts = body["candidates"]
            .get(0)
            .and_then(|c| c["content"]["parts"].as_array())
            .ok_or_else(|| GeminiError::ResponseParse {
                message: "Missing candidate content parts in response".to_string(),
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        Ok(text)
    }
}

/// Map an HTTP status code to the appropriate `GeminiError`.
fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> GeminiError {
    match status.as_u16() {
        401 | 403 => GeminiError::AuthFailed {
            var: "GEMINI_API_KEY".to_string(),
        },
        429 => GeminiError::RateLimited {
            retry_after_secs: 30,
        },
        _ => GeminiError::ApiRequest {
            message: format!("HTTP {} from Gemini API: {}", status, body_text),
        },
    }
}

/// Strip a wrapping Markdown code fence (with optional language tag) from a
/// completion. Models sometimes fence JSON output despite instructions.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
