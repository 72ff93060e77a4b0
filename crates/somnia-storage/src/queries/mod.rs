// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod catalog;
pub mod dreams;
pub mod queue;
pub mod subscriptions;
pub mod users;
