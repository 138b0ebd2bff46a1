//! Configuration system for Tabletalk.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment. Configuration is loaded from `tabletalk.toml` in the working
//! directory (or an explicit path) and `TABLETALK_*` environment variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for Tabletalk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabletalkConfig {
    pub gemini: GeminiConfig,
    pub limits: LimitsConfig,
}

/// Configuration for the Gemini API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Explicit API key (takes precedence over `api_key_env` when set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model used for analysis and chat completions.
    pub model: String,
    /// Model used for speech synthesis.
    pub tts_model: String,
    /// Prebuilt voice name for synthesized replies.
    pub voice: String,
    /// API base URL (override for proxies / testing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Kore".to_string(),
            base_url: None,
        }
    }
}

/// Input limits for uploaded files and analysis sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted file size in bytes. Larger files are rejected
    /// before the parser runs.
    pub max_file_bytes: u64,
    /// Maximum number of data rows sent to the model for analysis.
    /// Charting always uses the full table.
    pub sample_rows: usize,
    /// Number of data rows shown in the exported report preview.
    pub preview_rows: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 20 * 1024 * 1024,
            sample_rows: 100,
            preview_rows: 5,
        }
    }
}

/// Load configuration with layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `TABLETALK_`, `__` as separator)
/// 2. Config file (`tabletalk.toml` in the working directory, or `path`)
/// 3. Built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<TabletalkConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(TabletalkConfig::default()));

    match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(ConfigError::FileNotFound {
                    path: explicit.to_path_buf(),
                });
            }
            figment = figment.merge(Toml::file(explicit));
        }
        None => {
            let default_path = Path::new("tabletalk.toml");
            if default_path.exists() {
                figment = figment.merge(Toml::file(default_path));
            }
        }
    }

    // Environment variables (TABLETALK_GEMINI__MODEL, TABLETALK_LIMITS__SAMPLE_ROWS, ...)
    figment = figment.merge(Env::prefixed("TABLETALK_").split("__"));

    figment.extract().map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })
}
