// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Error taxonomy for the cortex engine.
//!
//! Absent-id operations (evolving an unknown pattern, removing an unknown
//! graph node) are silent no-ops rather than errors, and capacity exhaustion
//! is a silent drop detectable through counts. Only precondition violations
//! and backend failures surface as errors.

use thiserror::Error;

/// Errors produced by the cortex engine.
#[derive(Debug, Error)]
pub enum CortexError {
    /// A precondition on the call was violated (e.g. judging an incomplete
    /// trajectory). The caller must fix the state before retrying.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The external backend collaborator failed.
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Result type for cortex operations.
pub type Result<T> = std::result::Result<T, CortexError>;
