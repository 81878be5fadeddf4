// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Mnemon Cortex
//!
//! In-process associative memory engine for agent runtimes.
//!
//! Trajectories (episodic records of multi-step task executions) are judged,
//! distilled into reusable memories, retrieved with diversity-aware MMR
//! ranking, and kept coherent by a consolidation pass. An independent
//! [`MemoryGraph`](application::MemoryGraph) layers PageRank centrality and
//! community structure over any corpus of memory entries to rerank vector
//! search results.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Self-tuning knowledge store behind an abstract backend

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::*;
pub use domain::*;
pub use error::{CortexError, Result};
pub use infrastructure::*;
