// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Somnia backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Somnia configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SomniaConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// OpenRouter API settings (analysis, synthesis, and image models).
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cross-dream synthesis settings.
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Image generation and retry settings.
    #[serde(default)]
    pub images: ImageConfig,

    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "somnia".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OpenRouter API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    /// OpenRouter API key. `None` requires the `OPENROUTER_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL override (primarily for testing).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model used for per-dream analysis calls.
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,

    /// Model used for cross-dream synthesis calls.
    #[serde(default = "default_synthesis_model")]
    pub synthesis_model: String,

    /// Multimodal model used for illustrative image generation.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            analysis_model: default_analysis_model(),
            synthesis_model: default_synthesis_model(),
            image_model: default_image_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_analysis_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

fn default_synthesis_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

fn default_image_model() -> String {
    "google/gemini-2.5-flash-image".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("somnia/somnia.db").display().to_string())
        .unwrap_or_else(|| "somnia.db".to_string())
}

/// Cross-dream synthesis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisConfig {
    /// Minimum number of dream entries before a synthesis runs.
    #[serde(default = "default_min_entries")]
    pub min_entries: i64,

    /// How many of the most recent entries feed one synthesis.
    #[serde(default = "default_window")]
    pub window: i64,

    /// Per-entry text truncation applied before prompting.
    #[serde(default = "default_truncate_chars")]
    pub truncate_chars: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            min_entries: default_min_entries(),
            window: default_window(),
            truncate_chars: default_truncate_chars(),
        }
    }
}

fn default_min_entries() -> i64 {
    2
}

fn default_window() -> i64 {
    10
}

fn default_truncate_chars() -> usize {
    500
}

/// Image generation and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Maximum generation attempts per entry before it is terminally failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: i64,

    /// Interval of the failed-image retry sweep, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// How much dream text is embedded into the image prompt.
    #[serde(default = "default_prompt_max_chars")]
    pub prompt_max_chars: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            sweep_interval_secs: default_sweep_interval_secs(),
            prompt_max_chars: default_prompt_max_chars(),
        }
    }
}

fn default_max_retries() -> i64 {
    3
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_prompt_max_chars() -> usize {
    800
}

/// Background worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Queue polling interval, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}
