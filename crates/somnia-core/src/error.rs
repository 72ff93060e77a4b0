// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Somnia dream journal backend.

use thiserror::Error;

/// The primary error type used across all Somnia adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SomniaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SomniaError {
    /// Wrap any error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SomniaError::Storage {
            source: Box::new(source),
        }
    }

    /// Build a provider error from a plain message.
    pub fn provider(message: impl Into<String>) -> Self {
        SomniaError::Provider {
            message: message.into(),
            source: None,
        }
    }
}
