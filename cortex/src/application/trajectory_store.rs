// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Bounded trajectory pool.
//!
//! When the pool is full an insert first trims it to 80% of capacity,
//! evicting lowest-quality trajectories first. The eviction order is
//! load-bearing: callers rely on high-quality episodes surviving churn.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::Trajectory;

const TRIM_RATIO: f64 = 0.8;

/// Bounded pool of trajectories keyed by id.
pub struct TrajectoryStore {
    capacity: usize,
    trajectories: HashMap<String, Trajectory>,
}

impl TrajectoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            trajectories: HashMap::new(),
        }
    }

    /// Insert a trajectory, trimming the pool when at capacity.
    ///
    /// Replacing an existing id never triggers a trim. No error is raised on
    /// overflow; callers observing counts see the trim.
    pub fn store(&mut self, trajectory: Trajectory) {
        let replacing = self.trajectories.contains_key(&trajectory.id);
        if !replacing && self.trajectories.len() >= self.capacity {
            self.trim();
        }
        self.trajectories.insert(trajectory.id.clone(), trajectory);
    }

    /// Drop lowest-quality trajectories until the pool is at 80% of capacity.
    fn trim(&mut self) {
        let target = ((self.capacity as f64 * TRIM_RATIO) as usize).max(1);
        if self.trajectories.len() <= target {
            return;
        }

        let mut by_quality: Vec<(String, f64)> = self
            .trajectories
            .iter()
            .map(|(id, t)| (id.clone(), t.quality_score))
            .collect();
        // Lowest quality first; ties broken by id for determinism
        by_quality.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let excess = self.trajectories.len() - target;
        for (id, _) in by_quality.into_iter().take(excess) {
            self.trajectories.remove(&id);
        }

        debug!(retained = self.trajectories.len(), "trajectory pool trimmed");
    }

    pub fn get(&self, id: &str) -> Option<&Trajectory> {
        self.trajectories.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Trajectory> {
        self.trajectories.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Trajectory> {
        self.trajectories.remove(id)
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.values()
    }
}
