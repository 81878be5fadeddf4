// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the cortex engine.
//! Published to the EventBus for observability and integration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::memory::MemoryId;
use super::pattern::PatternId;

/// Cortex domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexEvent {
    /// A trajectory was recorded into the pool.
    TrajectoryRecorded {
        trajectory_id: String,
        quality_score: f64,
        step_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A judged trajectory was distilled into a reusable memory.
    MemoryDistilled {
        memory_id: MemoryId,
        trajectory_id: String,
        quality: f64,
        timestamp: DateTime<Utc>,
    },

    /// A distilled memory was promoted to a pattern.
    PatternPromoted {
        pattern_id: PatternId,
        memory_id: MemoryId,
        name: String,
        timestamp: DateTime<Utc>,
    },

    /// A pattern recorded a new quality sample.
    PatternEvolved {
        pattern_id: PatternId,
        previous_quality: f64,
        new_quality: f64,
        evolution_type: String,
        timestamp: DateTime<Utc>,
    },

    /// A consolidation pass finished.
    ConsolidationCompleted {
        removed_duplicates: usize,
        contradictions_detected: usize,
        pruned_patterns: usize,
        merged_patterns: usize,
        memory_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The memory graph was (re)built from a backend.
    GraphBuilt {
        node_count: usize,
        edge_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// PageRank scores were recomputed.
    PageRankComputed {
        iterations: usize,
        node_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Community labels were recomputed.
    CommunitiesDetected {
        community_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl CortexEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CortexEvent::TrajectoryRecorded { timestamp, .. } => *timestamp,
            CortexEvent::MemoryDistilled { timestamp, .. } => *timestamp,
            CortexEvent::PatternPromoted { timestamp, .. } => *timestamp,
            CortexEvent::PatternEvolved { timestamp, .. } => *timestamp,
            CortexEvent::ConsolidationCompleted { timestamp, .. } => *timestamp,
            CortexEvent::GraphBuilt { timestamp, .. } => *timestamp,
            CortexEvent::PageRankComputed { timestamp, .. } => *timestamp,
            CortexEvent::CommunitiesDetected { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            CortexEvent::TrajectoryRecorded { .. } => "trajectory_recorded",
            CortexEvent::MemoryDistilled { .. } => "memory_distilled",
            CortexEvent::PatternPromoted { .. } => "pattern_promoted",
            CortexEvent::PatternEvolved { .. } => "pattern_evolved",
            CortexEvent::ConsolidationCompleted { .. } => "consolidation_completed",
            CortexEvent::GraphBuilt { .. } => "graph_built",
            CortexEvent::PageRankComputed { .. } => "pagerank_computed",
            CortexEvent::CommunitiesDetected { .. } => "communities_detected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_round_trip() {
        let event = CortexEvent::MemoryDistilled {
            memory_id: MemoryId::new(),
            trajectory_id: "t-1".to_string(),
            quality: 0.8,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: CortexEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event.event_type(), deserialized.event_type());
    }

    #[test]
    fn test_event_type_strings() {
        let event = CortexEvent::PageRankComputed {
            iterations: 12,
            node_count: 40,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "pagerank_computed");

        let event = CortexEvent::ConsolidationCompleted {
            removed_duplicates: 1,
            contradictions_detected: 0,
            pruned_patterns: 2,
            merged_patterns: 0,
            memory_count: 10,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "consolidation_completed");
    }
}
