// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Pattern entities: long-lived aggregates over repeated memory use.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::memory::DistilledMemory;

/// Most recent quality samples retained per pattern.
pub const QUALITY_HISTORY_CAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub Uuid);

impl PatternId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// How a pattern changed.
///
/// `Split` is reserved: no code path currently produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionType {
    Improvement,
    Merge,
    Split,
    Prune,
}

impl EvolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improvement => "improvement",
            Self::Merge => "merge",
            Self::Split => "split",
            Self::Prune => "prune",
        }
    }
}

/// One entry in a pattern's append-only evolution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionRecord {
    pub timestamp: DateTime<Utc>,
    pub evolution_type: EvolutionType,
    pub previous_quality: f64,
    pub new_quality: f64,
    pub description: String,
}

/// A promoted, evolving strategy aggregate.
///
/// Invariant: `success_rate` is always the arithmetic mean of the current
/// `quality_history` ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    pub domain: String,
    pub embedding: Vec<f32>,
    pub strategy: String,
    pub success_rate: f64,
    pub usage_count: u64,
    /// Capped ring of the most recent quality samples, oldest evicted first.
    pub quality_history: VecDeque<f64>,
    /// Append-only log of evolution events.
    pub evolution_history: Vec<EvolutionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pattern {
    /// Promote a distilled memory into a pattern, seeding the quality ring
    /// with the memory's quality.
    pub fn from_memory(memory: &DistilledMemory, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut quality_history = VecDeque::with_capacity(QUALITY_HISTORY_CAP);
        quality_history.push_back(memory.quality);

        Self {
            id: PatternId::new(),
            name: name.into(),
            domain: memory.domain.clone(),
            embedding: memory.embedding.clone(),
            strategy: memory.strategy.clone(),
            success_rate: memory.quality,
            usage_count: memory.usage_count,
            quality_history,
            evolution_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn recompute_success_rate(&mut self) {
        if self.quality_history.is_empty() {
            self.success_rate = 0.0;
            return;
        }
        self.success_rate =
            self.quality_history.iter().sum::<f64>() / self.quality_history.len() as f64;
    }

    fn push_quality(&mut self, quality: f64) {
        if self.quality_history.len() >= QUALITY_HISTORY_CAP {
            self.quality_history.pop_front();
        }
        self.quality_history.push_back(quality);
        self.recompute_success_rate();
    }

    /// Record a new quality sample and append the matching evolution entry.
    ///
    /// Rising (or held) quality is an `Improvement`; declining quality is a
    /// `Prune` signal. Returns the appended record.
    pub fn record_quality(
        &mut self,
        quality: f64,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> EvolutionRecord {
        let previous_quality = self.success_rate;
        let evolution_type = if quality >= previous_quality {
            EvolutionType::Improvement
        } else {
            EvolutionType::Prune
        };

        self.push_quality(quality);
        self.updated_at = now;

        let record = EvolutionRecord {
            timestamp: now,
            evolution_type,
            previous_quality,
            new_quality: self.success_rate,
            description: description.into(),
        };
        self.evolution_history.push(record.clone());
        record
    }

    /// Fold another pattern's stats into this one (merge survivor side).
    ///
    /// Usage counts are summed and quality histories concatenated, oldest
    /// samples truncated down to the ring cap; a `Merge` record is appended.
    pub fn absorb(&mut self, other: &Pattern, now: DateTime<Utc>) {
        let previous_quality = self.success_rate;

        self.usage_count += other.usage_count;
        for &q in &other.quality_history {
            if self.quality_history.len() >= QUALITY_HISTORY_CAP {
                self.quality_history.pop_front();
            }
            self.quality_history.push_back(q);
        }
        self.recompute_success_rate();
        self.updated_at = now;

        self.evolution_history.push(EvolutionRecord {
            timestamp: now,
            evolution_type: EvolutionType::Merge,
            previous_quality,
            new_quality: self.success_rate,
            description: format!("absorbed pattern {} ({})", other.id, other.name),
        });
    }

    /// Whether this pattern is stale enough to prune: older than
    /// `max_age_days` since the last update AND used fewer than `min_usage`
    /// times.
    pub fn should_prune(&self, now: DateTime<Utc>, max_age_days: i64, min_usage: u64) -> bool {
        let age_days = (now - self.updated_at).num_days();
        age_days > max_age_days && self.usage_count < min_usage
    }
}
