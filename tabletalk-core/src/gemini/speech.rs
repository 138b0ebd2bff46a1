//! The speech client: text in, encoded PCM audio bytes out.
//!
//! Gemini's TTS endpoint returns base64-encoded raw PCM (16-bit
//! little-endian, mono, 24 kHz) as an `inlineData` part. The
//! `SpeechSynthesizer` trait is the seam the playback controller talks
//! through, so playback behavior is testable without the network.

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

use super::GeminiClient;
use crate::error::GeminiError;

/// Sample rate of synthesized audio in Hz.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
/// Channel count of synthesized audio.
pub const SPEECH_CHANNELS: u16 = 1;

/// Trait for speech synthesis backends.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize the text, returning raw 16-bit little-endian PCM bytes
    /// at [`SPEECH_SAMPLE_RATE`] Hz, [`SPEECH_CHANNELS`] channel(s).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GeminiError>;
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GeminiError> {
        let body = json!({
            "contents": [{"parts": [{"text": text}]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {"voiceName": self.voice}
                    }
                }
            },
        });

        let url = self.endpoint_url(&self.tts_model, "generateContent");
        let response = self.post_json(&url, &body).await?;

        let encoded = response["candidates"]
            .get(0)
            .and_then(|c| c["content"]["parts"].as_array())
            .and_then(|parts| {
                parts
                    .iter()
                    .find_map(|p| p["inlineData"]["data"].as_str())
            })
            .ok_or(GeminiError::NoAudio)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| GeminiError::ResponseParse {
                message: format!("Invalid base64 audio payload: {}", e),
            })?;

        debug!(bytes = bytes.len(), "Speech synthesized");
        Ok(bytes)
    }
}

/// A mock synthesizer for tests and offline use. Generates a short sine
/// wave as PCM16 bytes and counts calls.
#[derive(Default)]
pub struct MockSynthesizer {
    call_count: AtomicUsize,
    /// When true, every call fails with `GeminiError::NoAudio`.
    pub fail: bool,
}

impl MockSynthesizer {
    /// Create a mock that succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails every call.
    pub fn failing() -> Self {
        Self {
            call_count: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Number of times `synthesize` was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GeminiError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(GeminiError::NoAudio);
        }

        // 440Hz tone, 50ms per character, PCM16LE mono at the speech rate.
        let num_samples =
            (SPEECH_SAMPLE_RATE as f32 * (text.len() as f32 * 0.05).max(0.1)) as usize;
        let mut bytes = Vec::with_capacity(num_samples * 2);
        for i in 0..num_samples {
            let t = i as f32 / SPEECH_SAMPLE_RATE as f32;
            let sample = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
                * i16::MAX as f32) as i16;
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generates_pcm16_bytes() {
        let mock = MockSynthesizer::new();
        let bytes = mock.synthesize("Hello, world!").await.unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(bytes.len() % 2, 0);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockSynthesizer::failing();
        let result = mock.synthesize("x").await;
        assert!(matches!(result, Err(GeminiError::NoAudio)));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_audio_contract_constants() {
        assert_eq!(SPEECH_SAMPLE_RATE, 24_000);
        assert_eq!(SPEECH_CHANNELS, 1);
    }
}
