// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Backend contract for memory-entry storage and similarity search.
//!
//! The engine does not define the backing store's format or query language;
//! any store that can return entries carrying an id, an optional embedding,
//! optional references, and a metadata map can sit behind this trait.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Defines the contract external stores implement

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A memory entry as seen by the graph layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique entry id.
    pub id: String,
    /// Optional embedding vector.
    pub embedding: Option<Vec<f32>>,
    /// Ids of other entries this entry references.
    pub references: Vec<String>,
    /// Free-form metadata.
    pub metadata: HashMap<String, Value>,
}

impl MemoryEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            embedding: None,
            references: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_reference(mut self, target: impl Into<String>) -> Self {
        self.references.push(target.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Category lifted from the metadata map, when present.
    pub fn category(&self) -> Option<String> {
        self.metadata
            .get("category")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// One similarity-search match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Similarity score, higher is more similar.
    pub score: f64,
}

/// Options for a similarity search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.0,
        }
    }
}

/// Filter for bulk entry queries.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Restrict to entries whose metadata category matches.
    pub category: Option<String>,
    /// Cap the number of returned entries.
    pub limit: Option<usize>,
}

/// Contract external stores implement for the graph layer.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Store (upsert) a single entry.
    async fn store(&self, entry: MemoryEntry) -> Result<()>;

    /// Return entries matching the filter, in stable storage order.
    async fn query(&self, filter: EntryFilter) -> Result<Vec<MemoryEntry>>;

    /// Similarity search over stored embeddings, best matches first.
    async fn search(&self, embedding: &[f32], options: SearchOptions) -> Result<Vec<SearchHit>>;

    /// Bulk import.
    async fn bulk_insert(&self, entries: Vec<MemoryEntry>) -> Result<usize>;

    /// Bulk removal by id. Unknown ids are skipped.
    async fn bulk_delete(&self, ids: &[String]) -> Result<usize>;
}
