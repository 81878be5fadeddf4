// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Distilled memory entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a distilled memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A reusable memory distilled from a judged trajectory.
///
/// Created once per trajectory by the distiller; deleted only by the
/// consolidator (dedup) or soft-excluded via `consolidated` (contradiction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistilledMemory {
    pub id: MemoryId,
    /// Back-reference to the source trajectory.
    pub trajectory_id: String,
    /// Domain inherited from the source trajectory.
    pub domain: String,
    /// Short text summary of the action sequence.
    pub strategy: String,
    /// Up to a handful of rendered strengths/improvements.
    pub key_learnings: Vec<String>,
    /// Recency-weighted aggregate of step state vectors.
    pub embedding: Vec<f32>,
    /// Quality inherited from the trajectory.
    pub quality: f64,
    /// Incremented externally on reuse.
    pub usage_count: u64,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Soft-excluded from retrieval when true (contradiction handling).
    pub consolidated: bool,
}

impl DistilledMemory {
    /// Record a reuse of this memory.
    pub fn record_use(&mut self, now: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_used = now;
    }
}
