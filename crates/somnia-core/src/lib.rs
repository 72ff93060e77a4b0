// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Somnia dream journal backend.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Somnia workspace. Adapter crates
//! (storage, LLM providers) implement traits defined here; the pipeline
//! crate consumes them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SomniaError;
pub use types::{AdapterType, EntityKind, HealthStatus, ImageStatus, PatchOutcome};

// Re-export all adapter traits at crate root.
pub use traits::{ImageAdapter, PluginAdapter, ProviderAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn somnia_error_has_all_variants() {
        let _config = SomniaError::Config("test".into());
        let _storage = SomniaError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = SomniaError::Provider {
            message: "test".into(),
            source: None,
        };
        let _timeout = SomniaError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = SomniaError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        let variants = [AdapterType::Provider, AdapterType::Image, AdapterType::Storage];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that every adapter trait is accessible through
        // the public API.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_image_adapter<T: ImageAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
    }

    #[test]
    fn patch_outcome_is_comparable() {
        assert_eq!(PatchOutcome::Applied, PatchOutcome::Applied);
        assert_ne!(PatchOutcome::Applied, PatchOutcome::NotFound);
        assert_ne!(PatchOutcome::Stale, PatchOutcome::NotFound);
    }
}
