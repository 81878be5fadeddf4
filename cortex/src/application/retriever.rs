// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MmrRetriever — diversity-aware retrieval
//!
//! Greedy Maximal Marginal Relevance selection over the memory store:
//! `score = lambda * relevance + (1 - lambda) * (1 - max similarity to the
//! already-selected set)`. Lambda defaults to 0.7, favoring relevance.
//!
//! Candidates are scanned in insertion order every round and ties keep the
//! first candidate encountered, so results are deterministic for a fixed
//! store state.

use crate::application::memory_store::MemoryStore;
use crate::domain::vector::cosine_similarity;
use crate::domain::DistilledMemory;

/// Configuration for MMR retrieval.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Relevance/diversity balance in `[0, 1]`; 1.0 is pure relevance.
    pub mmr_lambda: f64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { mmr_lambda: 0.7 }
    }
}

/// One retrieval result with its scoring breakdown.
#[derive(Debug, Clone)]
pub struct RetrievedMemory {
    pub memory: DistilledMemory,
    /// Cosine similarity to the query.
    pub relevance: f64,
    /// `1 - max similarity` to the results selected before this one
    /// (1.0 for the first pick).
    pub diversity: f64,
    /// The MMR score this result was selected with.
    pub combined: f64,
}

/// Retrieves memories balancing relevance against redundancy.
#[derive(Debug, Clone, Default)]
pub struct MmrRetriever {
    config: RetrieverConfig,
}

impl MmrRetriever {
    pub fn new(config: RetrieverConfig) -> Self {
        Self { config }
    }

    /// Retrieve up to `k` memories for the query embedding.
    ///
    /// Soft-excluded (consolidated) memories are never candidates.
    pub fn retrieve(
        &self,
        store: &MemoryStore,
        query: &[f32],
        k: usize,
    ) -> Vec<RetrievedMemory> {
        let lambda = self.config.mmr_lambda.clamp(0.0, 1.0);

        // Candidates in insertion order with precomputed relevance
        let mut candidates: Vec<(&DistilledMemory, f64)> = store
            .iter()
            .filter(|m| !m.consolidated)
            .map(|m| (m, cosine_similarity(query, &m.embedding)))
            .collect();

        let mut selected: Vec<RetrievedMemory> = Vec::new();

        while selected.len() < k && !candidates.is_empty() {
            let mut best_index = 0;
            let mut best_score = f64::NEG_INFINITY;
            let mut best_diversity = 0.0;

            for (i, (memory, relevance)) in candidates.iter().enumerate() {
                let max_similarity = selected
                    .iter()
                    .map(|s| cosine_similarity(&memory.embedding, &s.memory.embedding))
                    .fold(0.0f64, f64::max);
                let diversity = 1.0 - max_similarity;
                let score = lambda * relevance + (1.0 - lambda) * diversity;

                // Strict > keeps the first candidate on ties
                if score > best_score {
                    best_score = score;
                    best_index = i;
                    best_diversity = diversity;
                }
            }

            let (memory, relevance) = candidates.remove(best_index);
            selected.push(RetrievedMemory {
                memory: memory.clone(),
                relevance,
                diversity: best_diversity,
                combined: best_score,
            });
        }

        selected
    }
}
