// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Trajectory entities: episodic records of multi-step task executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::memory::MemoryId;

/// A single state transition in a task execution.
///
/// Immutable once appended to a trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// Opaque identifier of the action taken.
    pub action: String,
    /// Dense state vector after the action (fixed dimension per trajectory).
    pub state_after: Vec<f32>,
    /// Reward for this step. Higher is better, roughly 0..1 but not clamped.
    pub reward: f64,
}

impl TrajectoryStep {
    /// Create a new trajectory step.
    pub fn new(action: impl Into<String>, state_after: Vec<f32>, reward: f64) -> Self {
        Self {
            action: action.into(),
            state_after,
            reward,
        }
    }
}

/// Verdict produced by judging a completed trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryVerdict {
    /// Whether the trajectory counts as a success.
    pub success: bool,
    /// Confidence in the verdict, 0..1.
    pub confidence: f64,
    /// What went well.
    pub strengths: Vec<String>,
    /// What went poorly.
    pub weaknesses: Vec<String>,
    /// Templated suggestions keyed off the weaknesses.
    pub improvements: Vec<String>,
    /// Quality blended with recency decay, 0..1.
    pub relevance_score: f64,
}

/// An ordered sequence of steps plus outcome bookkeeping.
///
/// Cross-references to the distilled memory are id-based; the owning stores
/// resolve them on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    /// Caller-supplied unique identifier.
    pub id: String,
    /// Free-text category (e.g. "refactoring", "dependency").
    pub domain: String,
    /// Creation timestamp.
    pub start_time: DateTime<Utc>,
    /// Caller-supplied overall quality summary.
    pub quality_score: f64,
    /// Judging requires this to be true.
    pub is_complete: bool,
    /// Execution steps in order.
    pub steps: Vec<TrajectoryStep>,
    /// Set once by the judge.
    pub verdict: Option<TrajectoryVerdict>,
    /// Set once by the distiller.
    pub distilled_memory: Option<MemoryId>,
}

impl Trajectory {
    /// Create a new trajectory.
    pub fn new(
        id: impl Into<String>,
        domain: impl Into<String>,
        steps: Vec<TrajectoryStep>,
        quality_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            start_time: Utc::now(),
            quality_score,
            is_complete: false,
            steps,
            verdict: None,
            distilled_memory: None,
        }
    }

    /// Mark the trajectory as complete (ready for judging).
    pub fn complete(mut self) -> Self {
        self.is_complete = true;
        self
    }

    /// Mean reward over all steps; 0.0 for an empty trajectory.
    pub fn average_reward(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.steps.iter().map(|s| s.reward).sum::<f64>() / self.steps.len() as f64
    }

    /// Fraction of steps with reward above 0.5; 0.0 for an empty trajectory.
    pub fn positive_ratio(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        let positive = self.steps.iter().filter(|s| s.reward > 0.5).count();
        positive as f64 / self.steps.len() as f64
    }

    /// Reward trend: `last - first`, or 0.0 with one step or fewer.
    pub fn reward_slope(&self) -> f64 {
        if self.steps.len() <= 1 {
            return 0.0;
        }
        self.steps[self.steps.len() - 1].reward - self.steps[0].reward
    }

    /// Age of the trajectory in fractional days at `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.start_time).num_seconds() as f64 / 86_400.0
    }
}
