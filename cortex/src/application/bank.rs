// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MemoryBank — the engine's front door
//!
//! Owns the trajectory pool and memory store and wires the learning loop:
//! record -> judge -> distill -> store, with MMR retrieval on the read path
//! and consolidation as an explicit maintenance call. Every state change
//! publishes a domain event on the injected bus.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::consolidator::{ConsolidationReport, Consolidator, ConsolidatorConfig};
use crate::application::distiller::MemoryDistiller;
use crate::application::judge::{JudgeConfig, TrajectoryJudge};
use crate::application::memory_store::MemoryStore;
use crate::application::retriever::{MmrRetriever, RetrievedMemory, RetrieverConfig};
use crate::application::trajectory_store::TrajectoryStore;
use crate::application::EventBus;
use crate::domain::{CortexEvent, MemoryId, PatternId, Trajectory};
use crate::error::Result;

/// Configuration for the memory bank.
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Trajectory pool capacity.
    pub max_trajectories: usize,
    /// Memory store capacity.
    pub max_memories: usize,
    pub judge: JudgeConfig,
    pub retriever: RetrieverConfig,
    pub consolidator: ConsolidatorConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            max_trajectories: 1000,
            max_memories: 10_000,
            judge: JudgeConfig::default(),
            retriever: RetrieverConfig::default(),
            consolidator: ConsolidatorConfig::default(),
        }
    }
}

/// Aggregate counts for observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankStats {
    pub trajectory_count: usize,
    pub memory_count: usize,
    pub pattern_count: usize,
    pub avg_memory_quality: f64,
}

/// Facade over the trajectory -> memory learning loop.
pub struct MemoryBank {
    trajectories: TrajectoryStore,
    memories: MemoryStore,
    distiller: MemoryDistiller,
    retriever: MmrRetriever,
    consolidator: Consolidator,
    event_bus: Arc<dyn EventBus>,
}

impl MemoryBank {
    pub fn new(config: BankConfig, event_bus: Arc<dyn EventBus>) -> Self {
        let judge = TrajectoryJudge::new(config.judge);
        Self {
            trajectories: TrajectoryStore::new(config.max_trajectories),
            memories: MemoryStore::new(config.max_memories),
            distiller: MemoryDistiller::new(judge),
            retriever: MmrRetriever::new(config.retriever),
            consolidator: Consolidator::new(config.consolidator, event_bus.clone()),
            event_bus,
        }
    }

    /// Record a trajectory; completed trajectories are judged and, when
    /// worth keeping, distilled into the memory store.
    ///
    /// Returns the distilled memory id, or `None` when nothing was kept
    /// (incomplete trajectory, gated distillation, or a silent capacity
    /// drop).
    pub async fn record_trajectory(&mut self, mut trajectory: Trajectory) -> Result<Option<MemoryId>> {
        let _ = self
            .event_bus
            .publish(CortexEvent::TrajectoryRecorded {
                trajectory_id: trajectory.id.clone(),
                quality_score: trajectory.quality_score,
                step_count: trajectory.steps.len(),
                timestamp: Utc::now(),
            })
            .await;

        if !trajectory.is_complete {
            self.trajectories.store(trajectory);
            return Ok(None);
        }

        let now = Utc::now();
        let distilled = self.distiller.distill(&mut trajectory, now)?;
        self.trajectories.store(trajectory);

        let memory = match distilled {
            Some(memory) => memory,
            None => return Ok(None),
        };

        let memory_id = memory.id;
        let trajectory_id = memory.trajectory_id.clone();
        let quality = memory.quality;

        if !self.memories.insert(memory) {
            debug!(%memory_id, "memory store full, distilled memory dropped");
            return Ok(None);
        }

        let _ = self
            .event_bus
            .publish(CortexEvent::MemoryDistilled {
                memory_id,
                trajectory_id,
                quality,
                timestamp: now,
            })
            .await;

        Ok(Some(memory_id))
    }

    /// Retrieve up to `k` memories for the query embedding (MMR).
    pub fn retrieve(&self, query: &[f32], k: usize) -> Vec<RetrievedMemory> {
        self.retriever.retrieve(&self.memories, query, k)
    }

    /// Record a reuse of a memory. Silent no-op for unknown ids.
    pub fn mark_memory_used(&mut self, id: &MemoryId) {
        self.memories.mark_used(id, Utc::now());
    }

    /// Run a consolidation pass over the memory store.
    pub async fn consolidate(&mut self) -> ConsolidationReport {
        self.consolidator
            .consolidate(&mut self.memories, Utc::now())
            .await
    }

    /// Promote a stored memory into a pattern. `None` for unknown ids.
    pub async fn promote_pattern(
        &mut self,
        memory_id: &MemoryId,
        name: impl Into<String>,
    ) -> Option<PatternId> {
        let name = name.into();
        let pattern_id = self
            .memories
            .promote_pattern(memory_id, name.clone(), Utc::now())?;

        let _ = self
            .event_bus
            .publish(CortexEvent::PatternPromoted {
                pattern_id,
                memory_id: *memory_id,
                name,
                timestamp: Utc::now(),
            })
            .await;

        Some(pattern_id)
    }

    /// Record a quality sample against a pattern. Silent no-op (`None`) for
    /// unknown ids.
    pub async fn evolve_pattern(
        &mut self,
        pattern_id: &PatternId,
        quality: f64,
        description: impl Into<String>,
    ) -> Option<String> {
        let (evolution_type, previous_quality, new_quality) =
            self.memories
                .evolve_pattern(pattern_id, quality, description, Utc::now())?;

        let _ = self
            .event_bus
            .publish(CortexEvent::PatternEvolved {
                pattern_id: *pattern_id,
                previous_quality,
                new_quality,
                evolution_type: evolution_type.clone(),
                timestamp: Utc::now(),
            })
            .await;

        Some(evolution_type)
    }

    pub fn stats(&self) -> BankStats {
        let memory_count = self.memories.len();
        let avg_memory_quality = if memory_count > 0 {
            self.memories.iter().map(|m| m.quality).sum::<f64>() / memory_count as f64
        } else {
            0.0
        };

        BankStats {
            trajectory_count: self.trajectories.len(),
            memory_count,
            pattern_count: self.memories.pattern_count(),
            avg_memory_quality,
        }
    }

    pub fn trajectory_store(&self) -> &TrajectoryStore {
        &self.trajectories
    }

    pub fn memory_store(&self) -> &MemoryStore {
        &self.memories
    }

    pub fn memory_store_mut(&mut self) -> &mut MemoryStore {
        &mut self.memories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::NoopEventBus;
    use crate::domain::TrajectoryStep;

    fn bank() -> MemoryBank {
        MemoryBank::new(BankConfig::default(), Arc::new(NoopEventBus))
    }

    fn trajectory(id: &str, rewards: &[f64], quality: f64) -> Trajectory {
        let steps = rewards
            .iter()
            .enumerate()
            .map(|(i, &r)| TrajectoryStep::new(format!("a{i}"), vec![0.1, 0.2, 0.3], r))
            .collect();
        Trajectory::new(id, "testing", steps, quality).complete()
    }

    #[tokio::test]
    async fn test_record_distills_successful_trajectory() {
        let mut bank = bank();

        let memory_id = bank
            .record_trajectory(trajectory("t-1", &[0.2, 0.8, 0.9], 0.75))
            .await
            .unwrap();

        let memory_id = memory_id.expect("should distill");
        let stats = bank.stats();
        assert_eq!(stats.trajectory_count, 1);
        assert_eq!(stats.memory_count, 1);

        // The pool copy carries the verdict and the cross-link
        let stored = bank.trajectory_store().get("t-1").unwrap();
        assert!(stored.verdict.as_ref().unwrap().success);
        assert_eq!(stored.distilled_memory, Some(memory_id));
    }

    #[tokio::test]
    async fn test_record_gates_low_quality() {
        let mut bank = bank();

        let result = bank
            .record_trajectory(trajectory("t-1", &[0.8, 0.9], 0.3))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(bank.stats().trajectory_count, 1);
        assert_eq!(bank.stats().memory_count, 0);
    }

    #[tokio::test]
    async fn test_record_incomplete_only_pools() {
        let mut bank = bank();
        let mut traj = trajectory("t-1", &[0.8, 0.9], 0.9);
        traj.is_complete = false;

        let result = bank.record_trajectory(traj).await.unwrap();
        assert!(result.is_none());
        assert_eq!(bank.stats().trajectory_count, 1);
        assert!(bank.trajectory_store().get("t-1").unwrap().verdict.is_none());
    }

    #[tokio::test]
    async fn test_retrieve_after_record() {
        let mut bank = bank();
        bank.record_trajectory(trajectory("t-1", &[0.2, 0.8, 0.9], 0.75))
            .await
            .unwrap();

        let results = bank.retrieve(&[0.1, 0.2, 0.3], 5);
        assert_eq!(results.len(), 1);
        assert!(results[0].relevance > 0.99);
    }

    #[tokio::test]
    async fn test_pattern_lifecycle_through_bank() {
        let mut bank = bank();
        let memory_id = bank
            .record_trajectory(trajectory("t-1", &[0.2, 0.8, 0.9], 0.75))
            .await
            .unwrap()
            .unwrap();

        let pattern_id = bank.promote_pattern(&memory_id, "incremental-fix").await.unwrap();
        assert_eq!(bank.stats().pattern_count, 1);

        let evolution = bank
            .evolve_pattern(&pattern_id, 0.9, "reused successfully")
            .await
            .unwrap();
        assert_eq!(evolution, "improvement");

        // Unknown ids are silent no-ops
        assert!(bank.promote_pattern(&MemoryId::new(), "x").await.is_none());
        assert!(bank.evolve_pattern(&PatternId::new(), 0.5, "x").await.is_none());
    }

    #[tokio::test]
    async fn test_stats_average_quality() {
        let mut bank = bank();
        bank.record_trajectory(trajectory("t-1", &[0.2, 0.8, 0.9], 0.8))
            .await
            .unwrap();
        bank.record_trajectory(trajectory("t-2", &[0.7, 0.8, 0.9], 0.7))
            .await
            .unwrap();

        let stats = bank.stats();
        assert_eq!(stats.memory_count, 2);
        assert!((stats.avg_memory_quality - 0.75).abs() < 1e-9);
    }
}
