//! The chat client: a stateful follow-up conversation seeded with the
//! analysis context.
//!
//! Replies stream over SSE; fragments are concatenated in arrival order into
//! one aggregate string and usage counters are summed across fragments. A
//! stream error discards any partial text and leaves the session history
//! untouched, so callers can roll back their optimistic transcript update.

use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::{map_http_error, GeminiClient};
use crate::error::GeminiError;
use crate::types::{ChatReply, TokenUsage};

/// One committed conversational turn.
#[derive(Debug, Clone)]
struct Turn {
    role: &'static str,
    text: String,
}

/// A stateful conversation with the model, rooted in the analysis context.
///
/// Exists only while an analysis is loaded; discarded and replaced when a
/// new analysis completes.
pub struct ChatSession {
    client: GeminiClient,
    system_instruction: String,
    history: Vec<Turn>,
}

impl ChatSession {
    /// Open a session seeded with the analysis context string.
    pub fn open(client: GeminiClient, context: &str) -> Self {
        let system_instruction = format!(
            "You are a helpful data analyst. The user has uploaded a dataset that \
             was analyzed with the following findings. Answer concise follow-up \
             questions about it.\n\n{}",
            context
        );
        Self {
            client,
            system_instruction,
            history: Vec::new(),
        }
    }

    /// Number of committed turns (user and assistant counted separately).
    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    /// Send one user message and aggregate the streamed reply.
    ///
    /// The exchange is committed to the session history only when the whole
    /// stream drains successfully.
    #[instrument(skip(self, text))]
    pub async fn send(&mut self, text: &str) -> Result<ChatReply, GeminiError> {
        let mut contents: Vec<Value> = self
            .history
            .iter()
            .map(|turn| json!({"role": turn.role, "parts": [{"text": turn.text}]}))
            .collect();
        contents.push(json!({"role": "user", "parts": [{"text": text}]}));

        let body = json!({
            "contents": contents,
            "system_instruction": {"parts": [{"text": self.system_instruction}]},
        });

        let reply = self.stream_reply(&body).await?;

        self.history.push(Turn {
            role: "user",
            text: text.to_string(),
        });
        self.history.push(Turn {
            role: "model",
            text: reply.text.clone(),
        });
        Ok(reply)
    }

    /// Drain one SSE response into an aggregated reply.
    async fn stream_reply(&self, body: &Value) -> Result<ChatReply, GeminiError> {
        let url = self.client.streaming_url(&self.client.model);
        let response = self
            .client
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::ApiRequest {
                message: format!("Streaming request to Gemini API failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let mut byte_stream = response.bytes_stream();
        let mut buffer = SseLineBuffer::default();
        let mut text = String::new();
        let mut usage = TokenUsage::default();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = chunk_result.map_err(|e| GeminiError::Streaming {
                message: format!("Failed to read streaming chunk: {}", e),
            })?;

            for data in buffer.push(&String::from_utf8_lossy(&chunk)) {
                match serde_json::from_str::<Value>(&data) {
                    Ok(event) => {
                        let fragment = parse_fragment(&event);
                        text.push_str(&fragment.text);
                        if let Some(reported) = fragment.usage {
                            usage.add(reported);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to parse SSE JSON chunk");
                    }
                }
            }
        }

        if let Some(data) = buffer.flush() {
            if let Ok(event) = serde_json::from_str::<Value>(&data) {
                let fragment = parse_fragment(&event);
                text.push_str(&fragment.text);
                if let Some(reported) = fragment.usage {
                    usage.add(reported);
                }
            }
        }

        debug!(chars = text.len(), "Chat stream drained");
        Ok(ChatReply { text, usage })
    }
}

/// Accumulates raw SSE bytes and yields complete `data: ` payloads.
#[derive(Debug, Default)]
struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    /// Feed a chunk; returns the payloads of every complete `data:` line.
    fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut payloads = Vec::new();

        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].trim().to_string();
            self.buffer.drain(..=newline_pos);
            if let Some(data) = line.strip_prefix("data: ") {
                payloads.push(data.to_string());
            }
        }
        payloads
    }

    /// The trailing unterminated line, if it is a data payload.
    fn flush(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        line.trim().strip_prefix("data: ").map(|d| d.to_string())
    }
}

/// Text and usage extracted from one streamed event.
#[derive(Debug, Default)]
struct Fragment {
    text: String,
    usage: Option<TokenUsage>,
}

fn parse_fragment(event: &Value) -> Fragment {
    let mut fragment = Fragment::default();

    if let Some(parts) = event["candidates"]
        .get(0)
        .and_then(|c| c["content"]["parts"].as_array())
    {
        for part in parts {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                fragment.text.push_str(text);
            }
        }
    }

    let metadata = &event["usageMetadata"];
    if metadata.is_object() {
        fragment.usage = Some(TokenUsage {
            input_tokens: metadata["promptTokenCount"].as_u64().unwrap_or(0) as usize,
            output_tokens: metadata["candidatesTokenCount"].as_u64().unwrap_or(0) as usize,
        });
    }

    fragment
}
