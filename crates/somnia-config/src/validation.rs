// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and positive intervals.

use crate::diagnostic::ConfigError;
use crate::model::SomniaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SomniaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    for (key, value) in [
        ("openrouter.analysis_model", &config.openrouter.analysis_model),
        ("openrouter.synthesis_model", &config.openrouter.synthesis_model),
        ("openrouter.image_model", &config.openrouter.image_model),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    if config.openrouter.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "openrouter.max_tokens must be positive".to_string(),
        });
    }

    if config.synthesis.min_entries < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "synthesis.min_entries must be at least 1, got {}",
                config.synthesis.min_entries
            ),
        });
    }

    if config.synthesis.window < config.synthesis.min_entries {
        errors.push(ConfigError::Validation {
            message: format!(
                "synthesis.window ({}) must not be smaller than synthesis.min_entries ({})",
                config.synthesis.window, config.synthesis.min_entries
            ),
        });
    }

    if config.synthesis.truncate_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "synthesis.truncate_chars must be positive".to_string(),
        });
    }

    if config.images.max_retries < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "images.max_retries must be non-negative, got {}",
                config.images.max_retries
            ),
        });
    }

    if config.images.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "images.sweep_interval_secs must be positive".to_string(),
        });
    }

    if config.images.prompt_max_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "images.prompt_max_chars must be positive".to_string(),
        });
    }

    if config.worker.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "worker.poll_interval_secs must be positive".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = SomniaConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let mut config = SomniaConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("database_path")));
    }

    #[test]
    fn window_smaller_than_min_entries_is_rejected() {
        let mut config = SomniaConfig::default();
        config.synthesis.min_entries = 5;
        config.synthesis.window = 3;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("window")));
    }

    #[test]
    fn all_errors_are_collected_not_fail_fast() {
        let mut config = SomniaConfig::default();
        config.storage.database_path = String::new();
        config.worker.poll_interval_secs = 0;
        config.images.sweep_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3, "expected all errors collected, got {errors:?}");
    }
}
