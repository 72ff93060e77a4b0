// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Somnia integration tests.
//!
//! Provides [`MockProvider`] (canned LLM text and image replies) and
//! [`TestHarness`] (tempdir storage + mock provider + wired pipeline).

pub mod harness;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_provider::MockProvider;
