// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Structural graph entities over memory entries.

use serde::{Deserialize, Serialize};

/// A node in the memory graph, wrapping an arbitrary memory-entry id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Memory-entry id this node wraps.
    pub id: String,
    /// Optional category lifted from entry metadata.
    pub category: Option<String>,
    /// Optional embedding, required for similarity-edge expansion.
    pub embedding: Option<Vec<f32>>,
}

impl MemoryNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: None,
            embedding: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Type of edge between two memory entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Explicit reference declared by the source entry.
    Reference,
    /// Embedding-similarity edge.
    Similar,
    /// Caller-defined relation.
    Custom(String),
}

impl EdgeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Reference => "reference",
            Self::Similar => "similar",
            Self::Custom(s) => s.as_str(),
        }
    }
}

/// A directed weighted edge. Weight lives in `(0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f64,
}

impl MemoryEdge {
    /// Create an edge, clamping the weight into `(0, 1]`.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
        weight: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            weight: weight.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }
}
