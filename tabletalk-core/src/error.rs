//! Error types for the Tabletalk core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the table, Gemini API, playback, export, and config domains.

use std::path::PathBuf;

/// Top-level error type for the Tabletalk core library.
#[derive(Debug, thiserror::Error)]
pub enum TabletalkError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Gemini error: {0}")]
    Gemini(#[from] GeminiError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No file is loaded")]
    NoTable,

    #[error("No analysis is loaded")]
    NoAnalysis,

    #[error("No chat session is open")]
    NoChatSession,

    #[error("No message with id {id}")]
    UnknownMessage { id: uuid::Uuid },

    #[error("Message {id} has no synthesizable audio")]
    NotSpeakable { id: uuid::Uuid },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from parsing and validating uploaded tabular files.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("File contains no data")]
    Empty,

    #[error("File too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Not a CSV file: {path}")]
    NotCsv { path: PathBuf },
}

/// Errors from Gemini API interactions (analysis, chat, speech).
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Streaming error: {message}")]
    Streaming { message: String },

    #[error("Authentication failed (env var '{var}' not set)")]
    AuthFailed { var: String },

    #[error("Rate limited by the API, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("No audio payload in speech response")]
    NoAudio,

    #[error("Connection failed: {message}")]
    Connection { message: String },
}

/// Errors from speech playback.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Audio output unavailable: {message}")]
    OutputUnavailable { message: String },

    #[error("Audio decode failed: {message}")]
    DecodeFailed { message: String },

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] GeminiError),
}

/// Errors from PDF report export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No usable font found for PDF rendering")]
    NoFont,

    #[error("Failed to render report: {message}")]
    RenderFailed { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// A type alias for results using the top-level `TabletalkError`.
pub type Result<T> = std::result::Result<T, TabletalkError>;
