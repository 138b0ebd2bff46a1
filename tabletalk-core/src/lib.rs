//! # Tabletalk Core
//!
//! Core library for Tabletalk, a conversational data analysis tool.
//! Provides CSV parsing, Gemini-backed analysis, chart data mapping,
//! streaming chat, speech synthesis and playback, and PDF report export.

pub mod charts;
pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod playback;
pub mod session;
pub mod table;
pub mod types;

// Re-export commonly used types at the crate root.
pub use charts::{chart_data, ChartKind, ChartSpec};
pub use config::{load_config, GeminiConfig, LimitsConfig, TabletalkConfig};
pub use error::{Result, TabletalkError};
pub use gemini::analysis::AnalysisResult;
pub use gemini::speech::{MockSynthesizer, SpeechSynthesizer};
pub use gemini::GeminiClient;
pub use playback::PlaybackController;
pub use session::Session;
pub use table::{Cell, Table};
pub use types::{ChatReply, Message, Sender, TokenUsage};
