// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Consolidator — maintenance pass over the memory store
//!
//! Explicit "sleep cycle" invoked by the embedder, never automatic:
//!
//! 1. **Dedup** — near-identical memories (similarity above
//!    `dedup_threshold`) collapse to the higher-quality one.
//! 2. **Contradictions** — similar memories with a large quality gap are
//!    soft-excluded (`consolidated = true`), preserving the audit trail.
//! 3. **Pattern pruning** — stale, rarely used patterns are deleted.
//! 4. **Pattern merge** — near-duplicate same-domain patterns fold into the
//!    higher-success survivor.
//!
//! The pass is best-effort: data-quality problems never surface as errors,
//! and a completion event reports the final memory count.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::memory_store::MemoryStore;
use crate::application::EventBus;
use crate::domain::vector::cosine_similarity;
use crate::domain::CortexEvent;

/// Configuration for the consolidation pass.
#[derive(Debug, Clone)]
pub struct ConsolidatorConfig {
    /// Similarity above which two memories are duplicates.
    pub dedup_threshold: f64,
    /// Whether the contradiction pass runs at all.
    pub detect_contradictions: bool,
    /// Similarity above which a quality gap counts as a contradiction.
    pub contradiction_similarity: f64,
    /// Minimum quality gap for a contradiction.
    pub contradiction_quality_gap: f64,
    /// Similarity above which same-domain patterns merge.
    pub pattern_merge_similarity: f64,
    /// Patterns untouched for longer than this are prune candidates.
    pub max_pattern_age_days: i64,
    /// Patterns used at least this often are never pruned.
    pub min_pattern_usage: u64,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: 0.95,
            detect_contradictions: true,
            contradiction_similarity: 0.8,
            contradiction_quality_gap: 0.4,
            pattern_merge_similarity: 0.9,
            max_pattern_age_days: 30,
            min_pattern_usage: 5,
        }
    }
}

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub removed_duplicates: usize,
    pub contradictions_detected: usize,
    pub pruned_patterns: usize,
    pub merged_patterns: usize,
}

/// Runs the maintenance pass over a [`MemoryStore`].
pub struct Consolidator {
    config: ConsolidatorConfig,
    event_bus: Arc<dyn EventBus>,
}

impl Consolidator {
    pub fn new(config: ConsolidatorConfig, event_bus: Arc<dyn EventBus>) -> Self {
        Self { config, event_bus }
    }

    /// Run a full consolidation pass.
    pub async fn consolidate(
        &self,
        store: &mut MemoryStore,
        now: DateTime<Utc>,
    ) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();

        report.removed_duplicates = self.dedup_memories(store);
        if self.config.detect_contradictions {
            report.contradictions_detected = self.flag_contradictions(store);
        }
        report.pruned_patterns = self.prune_patterns(store, now);
        report.merged_patterns = self.merge_patterns(store, now);

        info!(
            removed_duplicates = report.removed_duplicates,
            contradictions = report.contradictions_detected,
            pruned = report.pruned_patterns,
            merged = report.merged_patterns,
            "consolidation pass completed"
        );

        // Best-effort observability; a failing bus never fails the pass
        let _ = self
            .event_bus
            .publish(CortexEvent::ConsolidationCompleted {
                removed_duplicates: report.removed_duplicates,
                contradictions_detected: report.contradictions_detected,
                pruned_patterns: report.pruned_patterns,
                merged_patterns: report.merged_patterns,
                memory_count: store.len(),
                timestamp: now,
            })
            .await;

        report
    }

    /// Pairwise scan deleting the lower-quality member of any near-identical
    /// pair. Equal quality keeps the earlier-inserted memory.
    fn dedup_memories(&self, store: &mut MemoryStore) -> usize {
        let ids = store.memory_ids();
        let mut removed: HashSet<usize> = HashSet::new();

        for i in 0..ids.len() {
            if removed.contains(&i) {
                continue;
            }
            for j in (i + 1)..ids.len() {
                if removed.contains(&j) {
                    continue;
                }
                let (a, b) = match (store.get(&ids[i]), store.get(&ids[j])) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };

                let similarity = cosine_similarity(&a.embedding, &b.embedding);
                if similarity > self.config.dedup_threshold {
                    // Keep the higher quality; ties favor the earlier entry
                    let drop = if b.quality > a.quality { i } else { j };
                    debug!(similarity, "removing duplicate memory");
                    removed.insert(drop);
                    if drop == i {
                        break;
                    }
                }
            }
        }

        for &index in &removed {
            store.remove(&ids[index]);
        }
        removed.len()
    }

    /// Soft-exclude the lower-quality member of similar pairs whose quality
    /// gap is too wide to trust both. Already-excluded memories are skipped
    /// so repeated passes do not re-count the same pair.
    fn flag_contradictions(&self, store: &mut MemoryStore) -> usize {
        let ids = store.memory_ids();
        let mut flagged = 0;

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, b) = match (store.get(&ids[i]), store.get(&ids[j])) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };
                if a.consolidated || b.consolidated {
                    continue;
                }

                let similarity = cosine_similarity(&a.embedding, &b.embedding);
                let quality_gap = (a.quality - b.quality).abs();
                if similarity > self.config.contradiction_similarity
                    && quality_gap > self.config.contradiction_quality_gap
                {
                    let loser = if a.quality < b.quality { ids[i] } else { ids[j] };
                    store.mark_consolidated(&loser);
                    flagged += 1;
                }
            }
        }

        flagged
    }

    fn prune_patterns(&self, store: &mut MemoryStore, now: DateTime<Utc>) -> usize {
        let stale: Vec<_> = store
            .patterns()
            .filter(|p| {
                p.should_prune(now, self.config.max_pattern_age_days, self.config.min_pattern_usage)
            })
            .map(|p| p.id)
            .collect();

        for id in &stale {
            store.remove_pattern(id);
        }
        stale.len()
    }

    /// Merge near-duplicate same-domain patterns into the higher-success
    /// survivor.
    fn merge_patterns(&self, store: &mut MemoryStore, now: DateTime<Utc>) -> usize {
        let ids = store.pattern_ids();
        let mut absorbed: HashSet<usize> = HashSet::new();
        let mut merged = 0;

        for i in 0..ids.len() {
            if absorbed.contains(&i) {
                continue;
            }
            for j in (i + 1)..ids.len() {
                if absorbed.contains(&j) {
                    continue;
                }
                let (a, b) = match (store.get_pattern(&ids[i]), store.get_pattern(&ids[j])) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };
                if a.domain != b.domain {
                    continue;
                }

                let similarity = cosine_similarity(&a.embedding, &b.embedding);
                if similarity > self.config.pattern_merge_similarity {
                    // Lower success rate loses; ties favor the earlier entry
                    let (survivor, loser) = if b.success_rate > a.success_rate {
                        (j, i)
                    } else {
                        (i, j)
                    };

                    let loser_pattern = match store.remove_pattern(&ids[loser]) {
                        Some(p) => p,
                        None => continue,
                    };
                    if let Some(survivor_pattern) = store.get_pattern_mut(&ids[survivor]) {
                        survivor_pattern.absorb(&loser_pattern, now);
                    }
                    absorbed.insert(loser);
                    merged += 1;
                    if loser == i {
                        break;
                    }
                }
            }
        }

        merged
    }
}
