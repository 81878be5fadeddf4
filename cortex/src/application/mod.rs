// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application layer: services orchestrating the domain entities.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::CortexEvent;

pub mod bank;
pub mod consolidator;
pub mod distiller;
pub mod judge;
pub mod memory_graph;
pub mod memory_store;
pub mod retriever;
pub mod trajectory_store;

pub use bank::{BankConfig, BankStats, MemoryBank};
pub use consolidator::{ConsolidationReport, Consolidator, ConsolidatorConfig};
pub use distiller::MemoryDistiller;
pub use judge::{JudgeConfig, TrajectoryJudge};
pub use memory_graph::{GraphConfig, GraphRankedResult, GraphStats, MemoryGraph, RankedNode};
pub use memory_store::MemoryStore;
pub use retriever::{MmrRetriever, RetrievedMemory, RetrieverConfig};
pub use trajectory_store::TrajectoryStore;

/// Event bus trait for publishing domain events
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: CortexEvent) -> Result<()>;
}

/// Event bus that discards everything. Default for embedders that do not
/// subscribe to cortex events.
pub struct NoopEventBus;

#[async_trait]
impl EventBus for NoopEventBus {
    async fn publish(&self, _event: CortexEvent) -> Result<()> {
        Ok(())
    }
}
