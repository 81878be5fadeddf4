// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory backend implementation.
//!
//! Reference implementation of [`MemoryBackend`] for tests and embedders
//! that do not need a vector database. Entries are kept in insertion order
//! so query results and search tie-breaks are deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::vector::cosine_similarity;
use crate::infrastructure::backend::{
    EntryFilter, MemoryBackend, MemoryEntry, SearchHit, SearchOptions,
};

#[derive(Default)]
struct Inner {
    entries: HashMap<String, MemoryEntry>,
    order: Vec<String>,
}

/// In-memory implementation of [`MemoryBackend`].
pub struct InMemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert(inner: &mut Inner, entry: MemoryEntry) {
    if !inner.entries.contains_key(&entry.id) {
        inner.order.push(entry.id.clone());
    }
    inner.entries.insert(entry.id.clone(), entry);
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    async fn store(&self, entry: MemoryEntry) -> Result<()> {
        let mut inner = self.inner.write().await;
        upsert(&mut inner, entry);
        Ok(())
    }

    async fn query(&self, filter: EntryFilter) -> Result<Vec<MemoryEntry>> {
        let inner = self.inner.read().await;

        let mut results = Vec::new();
        for id in &inner.order {
            let entry = match inner.entries.get(id) {
                Some(entry) => entry,
                None => continue,
            };
            if let Some(ref category) = filter.category {
                if entry.category().as_deref() != Some(category.as_str()) {
                    continue;
                }
            }
            results.push(entry.clone());
            if let Some(limit) = filter.limit {
                if results.len() >= limit {
                    break;
                }
            }
        }

        Ok(results)
    }

    async fn search(&self, embedding: &[f32], options: SearchOptions) -> Result<Vec<SearchHit>> {
        let inner = self.inner.read().await;

        let mut hits: Vec<SearchHit> = inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id))
            .filter_map(|entry| {
                let stored = entry.embedding.as_ref()?;
                let score = cosine_similarity(embedding, stored);
                if score >= options.min_score {
                    Some(SearchHit {
                        id: entry.id.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        // Stable sort keeps insertion order on score ties
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(options.limit);

        debug!(hit_count = hits.len(), "similarity search completed");
        Ok(hits)
    }

    async fn bulk_insert(&self, entries: Vec<MemoryEntry>) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let count = entries.len();
        for entry in entries {
            upsert(&mut inner, entry);
        }
        Ok(count)
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let Inner { entries, order } = &mut *inner;
        let mut removed = 0;
        for id in ids {
            if entries.remove(id).is_some() {
                removed += 1;
            }
        }
        order.retain(|id| entries.contains_key(id));
        Ok(removed)
    }
}
