// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MemoryGraph — structural index over memory entries
//!
//! Builds a directed weighted graph from explicit entry references and
//! similarity edges, computes PageRank centrality and label-propagation
//! communities, and blends vector-search scores with structural importance.
//!
//! PageRank and community labels are derived caches: any mutation marks the
//! graph dirty and they are recomputed only by explicit calls. The graph is
//! single-writer; callers serialize access per instance.
//!
//! Ordered maps back the node and adjacency sets so every computation
//! iterates in a stable order and repeated calls produce identical results.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::EventBus;
use crate::domain::{CortexEvent, EdgeKind, MemoryEdge, MemoryNode};
use crate::error::Result;
use crate::infrastructure::backend::{EntryFilter, MemoryBackend, SearchHit, SearchOptions};

/// Configuration for the memory graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Hard cap on graph size; new ids beyond it are silently ignored.
    pub max_nodes: usize,
    /// PageRank damping factor.
    pub pagerank_damping: f64,
    /// PageRank iteration cap.
    pub pagerank_max_iterations: usize,
    /// Total L1 rank change below which PageRank has converged.
    pub pagerank_tolerance: f64,
    /// Label propagation sweep cap.
    pub label_max_iterations: usize,
    /// Vector-score weight in graph-blended reranking.
    pub rank_alpha: f64,
    /// Weight for edges added without an explicit weight.
    pub default_edge_weight: f64,
    /// Minimum similarity for an automatic similarity edge.
    pub similarity_threshold: f64,
    /// Backend search limit when expanding similarity edges.
    pub similarity_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            pagerank_damping: 0.85,
            pagerank_max_iterations: 50,
            pagerank_tolerance: 1e-6,
            label_max_iterations: 20,
            rank_alpha: 0.7,
            default_edge_weight: 0.5,
            similarity_threshold: 0.7,
            similarity_limit: 10,
        }
    }
}

/// A vector-search result reranked with graph centrality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRankedResult {
    pub id: String,
    pub vector_score: f64,
    pub page_rank: f64,
    pub combined_score: f64,
    /// Community label, present when communities have been computed.
    pub community: Option<usize>,
}

/// A node annotated with its centrality and community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedNode {
    pub id: String,
    pub page_rank: f64,
    pub category: Option<String>,
    pub community: Option<usize>,
}

/// Graph-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub avg_out_degree: f64,
    pub community_count: usize,
    pub page_rank_computed: bool,
    pub min_page_rank: f64,
    pub max_page_rank: f64,
}

/// Directed weighted graph over memory entries with derived centrality.
pub struct MemoryGraph {
    config: GraphConfig,
    event_bus: Arc<dyn EventBus>,
    nodes: BTreeMap<String, MemoryNode>,
    edges: BTreeMap<(String, String), MemoryEdge>,
    outgoing: BTreeMap<String, BTreeSet<String>>,
    incoming: BTreeMap<String, BTreeSet<String>>,
    page_rank: HashMap<String, f64>,
    communities: HashMap<String, usize>,
    page_rank_computed: bool,
}

impl MemoryGraph {
    pub fn new(config: GraphConfig, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            config,
            event_bus,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
            page_rank: HashMap::new(),
            communities: HashMap::new(),
            page_rank_computed: false,
        }
    }

    /// Any mutation transitions the graph clean -> dirty.
    fn invalidate(&mut self) {
        self.page_rank_computed = false;
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Add or refresh a node.
    ///
    /// Re-adding an existing id refreshes it in place and never counts
    /// against capacity. A new id is silently ignored once the graph holds
    /// `max_nodes` nodes.
    pub fn add_node(&mut self, node: MemoryNode) {
        let exists = self.nodes.contains_key(&node.id);
        if !exists && self.nodes.len() >= self.config.max_nodes {
            debug!(node_id = %node.id, "graph at capacity, ignoring new node");
            return;
        }
        if !exists {
            self.outgoing.insert(node.id.clone(), BTreeSet::new());
            self.incoming.insert(node.id.clone(), BTreeSet::new());
        }
        self.nodes.insert(node.id.clone(), node);
        self.invalidate();
    }

    /// Remove a node and every edge touching it. No-op for unknown ids.
    pub fn remove_node(&mut self, id: &str) {
        if self.nodes.remove(id).is_none() {
            return;
        }

        if let Some(targets) = self.outgoing.remove(id) {
            for target in targets {
                self.edges.remove(&(id.to_string(), target.clone()));
                if let Some(sources) = self.incoming.get_mut(&target) {
                    sources.remove(id);
                }
            }
        }
        if let Some(sources) = self.incoming.remove(id) {
            for source in sources {
                self.edges.remove(&(source.clone(), id.to_string()));
                if let Some(targets) = self.outgoing.get_mut(&source) {
                    targets.remove(id);
                }
            }
        }

        self.page_rank.remove(id);
        self.communities.remove(id);
        self.invalidate();
    }

    /// Add an edge with the default weight.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        self.add_edge_with_weight(source, target, kind, self.config.default_edge_weight)
    }

    /// Add a directed weighted edge.
    ///
    /// No-op (returns `false`) unless both endpoints are present. Re-adding
    /// an existing pair keeps the maximum of the old and new weight — a
    /// weight can only ever increase.
    pub fn add_edge_with_weight(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeKind,
        weight: f64,
    ) -> bool {
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return false;
        }

        let key = (source.to_string(), target.to_string());
        match self.edges.get_mut(&key) {
            Some(edge) => {
                edge.weight = edge.weight.max(weight.clamp(f64::MIN_POSITIVE, 1.0));
            }
            None => {
                self.edges
                    .insert(key, MemoryEdge::new(source, target, kind, weight));
                self.outgoing
                    .entry(source.to_string())
                    .or_default()
                    .insert(target.to_string());
                self.incoming
                    .entry(target.to_string())
                    .or_default()
                    .insert(source.to_string());
            }
        }

        self.invalidate();
        true
    }

    /// Effective weight of the `(source, target)` edge, if present.
    pub fn edge_weight(&self, source: &str, target: &str) -> Option<f64> {
        self.edges
            .get(&(source.to_string(), target.to_string()))
            .map(|e| e.weight)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ── Backend integration ──────────────────────────────────────────────

    /// Rebuild the graph from a backend: load up to `max_nodes` entries and
    /// add a reference edge for every declared reference whose target is in
    /// the loaded set. Dangling references are silently skipped.
    pub async fn build_from_backend(&mut self, backend: &dyn MemoryBackend) -> Result<usize> {
        let entries = backend
            .query(EntryFilter {
                category: None,
                limit: Some(self.config.max_nodes),
            })
            .await?;

        self.nodes.clear();
        self.edges.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.page_rank.clear();
        self.communities.clear();
        self.page_rank_computed = false;

        for entry in &entries {
            let mut node = MemoryNode::new(&entry.id);
            if let Some(category) = entry.category() {
                node = node.with_category(category);
            }
            if let Some(ref embedding) = entry.embedding {
                node = node.with_embedding(embedding.clone());
            }
            self.add_node(node);
        }

        for entry in &entries {
            for reference in &entry.references {
                // References to entries outside the loaded set are skipped,
                // never queued
                self.add_edge(&entry.id, reference, EdgeKind::Reference);
            }
        }

        info!(
            node_count = self.nodes.len(),
            edge_count = self.edges.len(),
            "memory graph built from backend"
        );

        let _ = self
            .event_bus
            .publish(CortexEvent::GraphBuilt {
                node_count: self.nodes.len(),
                edge_count: self.edges.len(),
                timestamp: Utc::now(),
            })
            .await;

        Ok(self.nodes.len())
    }

    /// Expand similarity edges around one node via the backend's search.
    ///
    /// Adds a `Similar` edge to each distinct, sufficiently similar result
    /// already present in the graph (self-matches excluded) and returns the
    /// number of edges touched. Returns 0 when the node is absent or has no
    /// embedding.
    pub async fn add_similarity_edges(
        &mut self,
        backend: &dyn MemoryBackend,
        id: &str,
    ) -> Result<usize> {
        let embedding = match self.nodes.get(id).and_then(|n| n.embedding.clone()) {
            Some(embedding) => embedding,
            None => return Ok(0),
        };

        let hits = backend
            .search(
                &embedding,
                SearchOptions {
                    limit: self.config.similarity_limit,
                    min_score: self.config.similarity_threshold,
                },
            )
            .await?;

        let mut added = 0;
        for hit in hits {
            if hit.id == id {
                continue;
            }
            if self.add_edge_with_weight(id, &hit.id, EdgeKind::Similar, hit.score) {
                added += 1;
            }
        }

        debug!(node_id = %id, added, "similarity edges expanded");
        Ok(added)
    }

    // ── Derived structure ────────────────────────────────────────────────

    /// Recompute PageRank with power iteration.
    ///
    /// Each round a node receives `(1 - d)/N` plus `d` times the rank mass
    /// flowing along incoming edges; dangling nodes redistribute their rank
    /// uniformly so the total stays at 1.0. Stops once the total L1 change
    /// drops below the tolerance or the iteration cap is reached.
    pub async fn compute_page_rank(&mut self) -> HashMap<String, f64> {
        let n = self.nodes.len();
        if n == 0 {
            self.page_rank.clear();
            self.page_rank_computed = true;
            return HashMap::new();
        }

        let damping = self.config.pagerank_damping;
        let ids: Vec<&String> = self.nodes.keys().collect();
        let mut ranks: BTreeMap<&String, f64> =
            ids.iter().map(|id| (*id, 1.0 / n as f64)).collect();

        let mut iterations = 0;
        for _ in 0..self.config.pagerank_max_iterations {
            iterations += 1;

            let mut dangling_mass = 0.0;
            for id in &ids {
                if self.outgoing.get(id.as_str()).map_or(true, |t| t.is_empty()) {
                    dangling_mass += ranks[*id];
                }
            }

            let mut next: BTreeMap<&String, f64> = BTreeMap::new();
            for id in &ids {
                let mut incoming_mass = dangling_mass / n as f64;
                if let Some(sources) = self.incoming.get(*id) {
                    for source in sources {
                        let out_degree = self.outgoing.get(source).map_or(0, |t| t.len());
                        if out_degree > 0 {
                            incoming_mass += ranks[source] / out_degree as f64;
                        }
                    }
                }
                next.insert(*id, (1.0 - damping) / n as f64 + damping * incoming_mass);
            }

            let delta: f64 = ids.iter().map(|id| (next[*id] - ranks[*id]).abs()).sum();
            ranks = next;

            if delta < self.config.pagerank_tolerance {
                break;
            }
        }

        self.page_rank = ranks.into_iter().map(|(id, r)| (id.clone(), r)).collect();
        self.page_rank_computed = true;

        debug!(iterations, node_count = n, "pagerank converged");
        let _ = self
            .event_bus
            .publish(CortexEvent::PageRankComputed {
                iterations,
                node_count: n,
                timestamp: Utc::now(),
            })
            .await;

        self.page_rank.clone()
    }

    /// Recompute community labels with label propagation.
    ///
    /// Every node starts in its own community; each sweep a node adopts the
    /// most frequent label among its undirected neighbors, ties going to the
    /// lowest label. Stops when a sweep changes nothing or at the cap.
    /// Isolated nodes stay singleton communities.
    pub async fn detect_communities(&mut self) -> HashMap<String, usize> {
        let ids: Vec<String> = self.nodes.keys().cloned().collect();
        let mut labels: BTreeMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        for _ in 0..self.config.label_max_iterations {
            let mut changed = false;

            for id in &ids {
                let mut neighbor_labels: BTreeMap<usize, usize> = BTreeMap::new();
                if let Some(targets) = self.outgoing.get(id) {
                    for t in targets {
                        *neighbor_labels.entry(labels[t.as_str()]).or_insert(0) += 1;
                    }
                }
                if let Some(sources) = self.incoming.get(id) {
                    for s in sources {
                        *neighbor_labels.entry(labels[s.as_str()]).or_insert(0) += 1;
                    }
                }

                let current = labels[id.as_str()];

                // Most frequent label; BTreeMap order makes ties resolve to
                // the lowest label id
                let best = neighbor_labels
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(label, _)| *label)
                    .unwrap_or(current);

                if best != current {
                    labels.insert(id.as_str(), best);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        self.communities = labels
            .into_iter()
            .map(|(id, label)| (id.to_string(), label))
            .collect();

        let community_count = self
            .communities
            .values()
            .collect::<BTreeSet<_>>()
            .len();

        debug!(community_count, "communities detected");
        let _ = self
            .event_bus
            .publish(CortexEvent::CommunitiesDetected {
                community_count,
                timestamp: Utc::now(),
            })
            .await;

        self.communities.clone()
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Rerank with the configured alpha.
    pub fn rank_with_graph_default(&self, results: &[SearchHit]) -> Vec<GraphRankedResult> {
        self.rank_with_graph(results, self.config.rank_alpha)
    }

    /// Rerank vector-search results by blending the vector score with
    /// max-normalized PageRank: `alpha * vector + (1 - alpha) * rank`.
    /// Results absent from the graph contribute rank 0.
    pub fn rank_with_graph(&self, results: &[SearchHit], alpha: f64) -> Vec<GraphRankedResult> {
        let max_rank = self.page_rank.values().cloned().fold(0.0f64, f64::max);

        let mut ranked: Vec<GraphRankedResult> = results
            .iter()
            .map(|hit| {
                let rank = self.page_rank.get(&hit.id).copied().unwrap_or(0.0);
                let normalized = if max_rank > 0.0 { rank / max_rank } else { 0.0 };
                GraphRankedResult {
                    id: hit.id.clone(),
                    vector_score: hit.score,
                    page_rank: rank,
                    combined_score: alpha * hit.score + (1.0 - alpha) * normalized,
                    community: self.communities.get(&hit.id).copied(),
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// Top-n nodes by PageRank, annotated with category and community.
    pub fn get_top_nodes(&self, n: usize) -> Vec<RankedNode> {
        let mut nodes: Vec<RankedNode> = self
            .nodes
            .values()
            .map(|node| RankedNode {
                id: node.id.clone(),
                page_rank: self.page_rank.get(&node.id).copied().unwrap_or(0.0),
                category: node.category.clone(),
                community: self.communities.get(&node.id).copied(),
            })
            .collect();

        nodes.sort_by(|a, b| {
            b.page_rank
                .partial_cmp(&a.page_rank)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        nodes.truncate(n);
        nodes
    }

    /// Ids reachable from `id` over outgoing edges within `depth` hops,
    /// excluding the start node. Empty for unknown ids.
    pub fn get_neighbors(&self, id: &str, depth: usize) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        if !self.nodes.contains_key(id) || depth == 0 {
            return found;
        }

        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((id, 0));
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        visited.insert(id);

        while let Some((current, hops)) = queue.pop_front() {
            if hops >= depth {
                continue;
            }
            if let Some(targets) = self.outgoing.get(current) {
                for target in targets {
                    if visited.insert(target.as_str()) {
                        found.insert(target.clone());
                        queue.push_back((target.as_str(), hops + 1));
                    }
                }
            }
        }

        found
    }

    /// Graph statistics. PageRank extrema are 0.0 until computed.
    pub fn stats(&self) -> GraphStats {
        let node_count = self.nodes.len();
        let avg_out_degree = if node_count > 0 {
            self.edges.len() as f64 / node_count as f64
        } else {
            0.0
        };

        let (min_page_rank, max_page_rank) = if self.page_rank_computed && !self.page_rank.is_empty()
        {
            (
                self.page_rank.values().cloned().fold(f64::INFINITY, f64::min),
                self.page_rank.values().cloned().fold(0.0, f64::max),
            )
        } else {
            (0.0, 0.0)
        };

        GraphStats {
            node_count,
            edge_count: self.edges.len(),
            avg_out_degree,
            community_count: self.communities.values().collect::<BTreeSet<_>>().len(),
            page_rank_computed: self.page_rank_computed,
            min_page_rank,
            max_page_rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::NoopEventBus;
    use crate::infrastructure::{InMemoryBackend, MemoryEntry};

    fn graph() -> MemoryGraph {
        MemoryGraph::new(GraphConfig::default(), Arc::new(NoopEventBus))
    }

    fn graph_with(config: GraphConfig) -> MemoryGraph {
        MemoryGraph::new(config, Arc::new(NoopEventBus))
    }

    fn add_nodes(g: &mut MemoryGraph, ids: &[&str]) {
        for id in ids {
            g.add_node(MemoryNode::new(*id));
        }
    }

    #[test]
    fn test_add_node_and_capacity_cap() {
        let mut g = graph_with(GraphConfig {
            max_nodes: 2,
            ..Default::default()
        });

        add_nodes(&mut g, &["a", "b", "c"]);
        assert_eq!(g.node_count(), 2);

        // Re-adding an existing id refreshes, never grows past the cap
        g.add_node(MemoryNode::new("a").with_category("refreshed"));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_add_edge_requires_both_endpoints() {
        let mut g = graph();
        add_nodes(&mut g, &["a"]);

        assert!(!g.add_edge("a", "missing", EdgeKind::Reference));
        assert!(!g.add_edge("missing", "a", EdgeKind::Reference));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_edge_weight_never_decreases() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b"]);

        g.add_edge_with_weight("a", "b", EdgeKind::Reference, 0.9);
        g.add_edge_with_weight("a", "b", EdgeKind::Reference, 0.3);
        assert_eq!(g.edge_weight("a", "b"), Some(0.9));

        g.add_edge_with_weight("a", "b", EdgeKind::Reference, 0.95);
        assert_eq!(g.edge_weight("a", "b"), Some(0.95));
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "c"]);
        g.add_edge("a", "b", EdgeKind::Reference);
        g.add_edge("c", "a", EdgeKind::Reference);
        g.add_edge("b", "c", EdgeKind::Reference);

        g.remove_node("a");

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge_weight("b", "c"), Some(0.5));

        // Unknown id removal is a silent no-op
        g.remove_node("a");
        assert_eq!(g.node_count(), 2);
    }

    #[tokio::test]
    async fn test_pagerank_single_node_is_one() {
        let mut g = graph();
        add_nodes(&mut g, &["only"]);

        let ranks = g.compute_page_rank().await;
        assert!((ranks["only"] - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_pagerank_empty_graph_is_empty() {
        let mut g = graph();
        assert!(g.compute_page_rank().await.is_empty());
    }

    #[tokio::test]
    async fn test_pagerank_conserves_total_mass() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "c", "d"]);
        g.add_edge("a", "b", EdgeKind::Reference);
        g.add_edge("b", "c", EdgeKind::Reference);
        g.add_edge("c", "a", EdgeKind::Reference);
        // d is dangling

        let ranks = g.compute_page_rank().await;
        let total: f64 = ranks.values().sum();
        assert!((total - 1.0).abs() < 1e-2);
    }

    #[tokio::test]
    async fn test_pagerank_sink_outranks_sources() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "c"]);
        g.add_edge("a", "c", EdgeKind::Reference);
        g.add_edge("b", "c", EdgeKind::Reference);

        let ranks = g.compute_page_rank().await;
        assert!(ranks["c"] > ranks["a"]);
        assert!(ranks["c"] > ranks["b"]);
    }

    #[tokio::test]
    async fn test_communities_split_disconnected_pairs() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "c", "d"]);
        g.add_edge("a", "b", EdgeKind::Similar);
        g.add_edge("b", "a", EdgeKind::Similar);
        g.add_edge("c", "d", EdgeKind::Similar);
        g.add_edge("d", "c", EdgeKind::Similar);

        let communities = g.detect_communities().await;

        assert_eq!(communities["a"], communities["b"]);
        assert_eq!(communities["c"], communities["d"]);
        assert_ne!(communities["a"], communities["c"]);

        let distinct: BTreeSet<usize> = communities.values().copied().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[tokio::test]
    async fn test_isolated_nodes_stay_singletons() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "c"]);

        let communities = g.detect_communities().await;
        let distinct: BTreeSet<usize> = communities.values().copied().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[tokio::test]
    async fn test_rank_with_graph_blends_scores() {
        let mut g = graph();
        add_nodes(&mut g, &["hub", "leaf", "other"]);
        g.add_edge("leaf", "hub", EdgeKind::Reference);
        g.add_edge("other", "hub", EdgeKind::Reference);
        g.compute_page_rank().await;

        let hits = vec![
            SearchHit {
                id: "leaf".to_string(),
                score: 0.9,
            },
            SearchHit {
                id: "hub".to_string(),
                score: 0.85,
            },
        ];

        // Relevance-dominated: leaf wins
        let ranked = g.rank_with_graph(&hits, 1.0);
        assert_eq!(ranked[0].id, "leaf");

        // Structure-dominated: hub (max rank, normalized to 1.0) wins
        let ranked = g.rank_with_graph(&hits, 0.0);
        assert_eq!(ranked[0].id, "hub");
        assert!((ranked[0].combined_score - 1.0).abs() < 1e-9);

        // Configured alpha (0.7) still favors relevance here
        let ranked = g.rank_with_graph_default(&hits);
        assert_eq!(ranked[0].id, "leaf");
    }

    #[tokio::test]
    async fn test_rank_with_graph_unknown_ids_rank_zero() {
        let mut g = graph();
        add_nodes(&mut g, &["a"]);
        g.compute_page_rank().await;

        let hits = vec![SearchHit {
            id: "stranger".to_string(),
            score: 0.8,
        }];
        let ranked = g.rank_with_graph(&hits, 0.5);

        assert_eq!(ranked[0].page_rank, 0.0);
        assert!((ranked[0].combined_score - 0.4).abs() < 1e-9);
        assert!(ranked[0].community.is_none());
    }

    #[tokio::test]
    async fn test_rank_with_graph_is_deterministic() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "c"]);
        g.add_edge("a", "b", EdgeKind::Reference);
        g.add_edge("c", "b", EdgeKind::Reference);
        g.compute_page_rank().await;

        let hits: Vec<SearchHit> = ["a", "b", "c"]
            .iter()
            .map(|id| SearchHit {
                id: id.to_string(),
                score: 0.5,
            })
            .collect();

        let first: Vec<String> = g.rank_with_graph(&hits, 0.7).iter().map(|r| r.id.clone()).collect();
        let second: Vec<String> = g.rank_with_graph(&hits, 0.7).iter().map(|r| r.id.clone()).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_top_nodes() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "hub"]);
        g.add_edge("a", "hub", EdgeKind::Reference);
        g.add_edge("b", "hub", EdgeKind::Reference);
        g.compute_page_rank().await;
        g.detect_communities().await;

        let top = g.get_top_nodes(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "hub");
        assert!(top[0].community.is_some());

        // Asking for more than exists returns what's there
        assert_eq!(g.get_top_nodes(10).len(), 3);
        assert!(graph().get_top_nodes(5).is_empty());
    }

    #[test]
    fn test_get_neighbors_bfs_depth() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b", "c", "d"]);
        g.add_edge("a", "b", EdgeKind::Reference);
        g.add_edge("b", "c", EdgeKind::Reference);
        g.add_edge("c", "d", EdgeKind::Reference);

        let one_hop = g.get_neighbors("a", 1);
        assert_eq!(one_hop.len(), 1);
        assert!(one_hop.contains("b"));

        let two_hops = g.get_neighbors("a", 2);
        assert_eq!(two_hops.len(), 2);
        assert!(two_hops.contains("c"));
        assert!(!two_hops.contains("a"));

        assert!(g.get_neighbors("missing", 2).is_empty());
    }

    #[tokio::test]
    async fn test_mutation_dirties_pagerank() {
        let mut g = graph();
        add_nodes(&mut g, &["a", "b"]);
        g.compute_page_rank().await;
        assert!(g.stats().page_rank_computed);

        g.add_edge("a", "b", EdgeKind::Reference);
        assert!(!g.stats().page_rank_computed);
    }

    #[tokio::test]
    async fn test_build_from_backend_skips_dangling_references() {
        let backend = InMemoryBackend::new();
        backend
            .store(
                MemoryEntry::new("a")
                    .with_reference("b")
                    .with_reference("ghost")
                    .with_metadata("category", "design"),
            )
            .await
            .unwrap();
        backend.store(MemoryEntry::new("b")).await.unwrap();

        let mut g = graph();
        let loaded = g.build_from_backend(&backend).await.unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge_weight("a", "b"), Some(0.5));
        assert!(!g.contains_node("ghost"));
    }

    #[tokio::test]
    async fn test_build_from_backend_respects_max_nodes() {
        let backend = InMemoryBackend::new();
        for i in 0..5 {
            backend
                .store(MemoryEntry::new(format!("m-{i}")))
                .await
                .unwrap();
        }

        let mut g = graph_with(GraphConfig {
            max_nodes: 3,
            ..Default::default()
        });
        let loaded = g.build_from_backend(&backend).await.unwrap();
        assert_eq!(loaded, 3);
    }

    #[tokio::test]
    async fn test_add_similarity_edges() {
        let backend = InMemoryBackend::new();
        backend
            .store(MemoryEntry::new("a").with_embedding(vec![1.0, 0.0]))
            .await
            .unwrap();
        backend
            .store(MemoryEntry::new("near").with_embedding(vec![0.95, 0.05]))
            .await
            .unwrap();
        backend
            .store(MemoryEntry::new("far").with_embedding(vec![0.0, 1.0]))
            .await
            .unwrap();
        backend
            .store(MemoryEntry::new("absent").with_embedding(vec![1.0, 0.01]))
            .await
            .unwrap();

        let mut g = graph();
        // "absent" is in the backend but not in the graph
        add_nodes(&mut g, &["near", "far"]);
        g.add_node(MemoryNode::new("a").with_embedding(vec![1.0, 0.0]));

        let added = g.add_similarity_edges(&backend, "a").await.unwrap();

        // Self-match and out-of-graph hits excluded; "far" below threshold
        assert_eq!(added, 1);
        assert!(g.edge_weight("a", "near").is_some());
        assert!(g.edge_weight("a", "far").is_none());
        assert!(g.edge_weight("a", "absent").is_none());
    }

    #[tokio::test]
    async fn test_add_similarity_edges_absent_or_unembedded_is_zero() {
        let backend = InMemoryBackend::new();
        let mut g = graph();
        add_nodes(&mut g, &["plain"]);

        assert_eq!(g.add_similarity_edges(&backend, "missing").await.unwrap(), 0);
        assert_eq!(g.add_similarity_edges(&backend, "plain").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let mut g = graph();
        let empty = g.stats();
        assert_eq!(empty.node_count, 0);
        assert_eq!(empty.max_page_rank, 0.0);
        assert!(!empty.page_rank_computed);

        add_nodes(&mut g, &["a", "b", "c"]);
        g.add_edge("a", "b", EdgeKind::Reference);
        g.add_edge("a", "c", EdgeKind::Reference);

        let stats = g.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert!((stats.avg_out_degree - 2.0 / 3.0).abs() < 1e-9);
        assert!(!stats.page_rank_computed);

        g.compute_page_rank().await;
        let stats = g.stats();
        assert!(stats.page_rank_computed);
        assert!(stats.max_page_rank > stats.min_page_rank);
        assert!(stats.max_page_rank > 0.0);
    }
}
