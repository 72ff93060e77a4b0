// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./somnia.toml` > `~/.config/somnia/somnia.toml` >
//! `/etc/somnia/somnia.toml` with environment variable overrides via the
//! `SOMNIA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SomniaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/somnia/somnia.toml` (system-wide)
/// 3. `~/.config/somnia/somnia.toml` (user XDG config)
/// 4. `./somnia.toml` (local directory)
/// 5. `SOMNIA_*` environment variables
pub fn load_config() -> Result<SomniaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SomniaConfig::default()))
        .merge(Toml::file("/etc/somnia/somnia.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("somnia/somnia.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("somnia.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SomniaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SomniaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SomniaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SomniaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SOMNIA_OPENROUTER_API_KEY` must map to
/// `openrouter.api_key`, not `openrouter.api.key`.
fn env_provider() -> Env {
    Env::prefixed("SOMNIA_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("openrouter_", "openrouter.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("synthesis_", "synthesis.", 1)
            .replacen("images_", "images.", 1)
            .replacen("worker_", "worker.", 1);
        mapped.into()
    })
}
