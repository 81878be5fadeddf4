// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Bounded store of distilled memories plus the pattern registry.
//!
//! Memories keep a stable insertion order so retrieval scans are
//! deterministic. At capacity a new-identity insert is silently dropped
//! (memories are only ever deleted by consolidation); callers detect the
//! drop by comparing counts.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{DistilledMemory, MemoryId, Pattern, PatternId};

/// Bounded map of distilled memories and promoted patterns.
pub struct MemoryStore {
    capacity: usize,
    memories: HashMap<MemoryId, DistilledMemory>,
    memory_order: Vec<MemoryId>,
    patterns: HashMap<PatternId, Pattern>,
    pattern_order: Vec<PatternId>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            memories: HashMap::new(),
            memory_order: Vec::new(),
            patterns: HashMap::new(),
            pattern_order: Vec::new(),
        }
    }

    // ── Memories ─────────────────────────────────────────────────────────

    /// Insert a memory. Returns `false` when a new identity was silently
    /// dropped at capacity; replacing an existing id always succeeds.
    pub fn insert(&mut self, memory: DistilledMemory) -> bool {
        let existing = self.memories.contains_key(&memory.id);
        if !existing {
            if self.memories.len() >= self.capacity {
                debug!(memory_id = %memory.id, "memory store at capacity, dropping insert");
                return false;
            }
            self.memory_order.push(memory.id);
        }
        self.memories.insert(memory.id, memory);
        true
    }

    pub fn get(&self, id: &MemoryId) -> Option<&DistilledMemory> {
        self.memories.get(id)
    }

    pub fn remove(&mut self, id: &MemoryId) -> Option<DistilledMemory> {
        let removed = self.memories.remove(id);
        if removed.is_some() {
            self.memory_order.retain(|m| m != id);
        }
        removed
    }

    /// Record a reuse of a memory. Silent no-op when the id is unknown.
    pub fn mark_used(&mut self, id: &MemoryId, now: DateTime<Utc>) {
        if let Some(memory) = self.memories.get_mut(id) {
            memory.record_use(now);
        }
    }

    /// Soft-exclude a memory from retrieval. Silent no-op when unknown.
    pub fn mark_consolidated(&mut self, id: &MemoryId) {
        if let Some(memory) = self.memories.get_mut(id) {
            memory.consolidated = true;
        }
    }

    /// Memories in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DistilledMemory> {
        self.memory_order
            .iter()
            .filter_map(move |id| self.memories.get(id))
    }

    /// Ids in insertion order (snapshot).
    pub fn memory_ids(&self) -> Vec<MemoryId> {
        self.memory_order.clone()
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ── Patterns ─────────────────────────────────────────────────────────

    /// Promote a stored memory into a pattern. Returns `None` when the
    /// memory id is unknown.
    pub fn promote_pattern(
        &mut self,
        memory_id: &MemoryId,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<PatternId> {
        let memory = self.memories.get(memory_id)?;
        let pattern = Pattern::from_memory(memory, name, now);
        let id = pattern.id;
        self.pattern_order.push(id);
        self.patterns.insert(id, pattern);
        Some(id)
    }

    /// Record a quality sample against a pattern. Silent no-op (`None`) when
    /// the id is unknown; otherwise returns the evolution type applied and
    /// the previous/new success rates.
    pub fn evolve_pattern(
        &mut self,
        pattern_id: &PatternId,
        quality: f64,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<(String, f64, f64)> {
        let pattern = self.patterns.get_mut(pattern_id)?;
        let record = pattern.record_quality(quality, description, now);
        Some((
            record.evolution_type.as_str().to_string(),
            record.previous_quality,
            record.new_quality,
        ))
    }

    /// Record a pattern reuse. Silent no-op when unknown.
    pub fn mark_pattern_used(&mut self, pattern_id: &PatternId, now: DateTime<Utc>) {
        if let Some(pattern) = self.patterns.get_mut(pattern_id) {
            pattern.usage_count += 1;
            pattern.updated_at = now;
        }
    }

    pub fn get_pattern(&self, id: &PatternId) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    pub fn get_pattern_mut(&mut self, id: &PatternId) -> Option<&mut Pattern> {
        self.patterns.get_mut(id)
    }

    pub fn remove_pattern(&mut self, id: &PatternId) -> Option<Pattern> {
        let removed = self.patterns.remove(id);
        if removed.is_some() {
            self.pattern_order.retain(|p| p != id);
        }
        removed
    }

    /// Patterns in insertion order.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.pattern_order
            .iter()
            .filter_map(move |id| self.patterns.get(id))
    }

    /// Pattern ids in insertion order (snapshot).
    pub fn pattern_ids(&self) -> Vec<PatternId> {
        self.pattern_order.clone()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
