// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MemoryDistiller — Trajectory distillation
//!
//! Turns a judged, successful trajectory into a reusable
//! [`DistilledMemory`]: a compact strategy summary, key learnings, and a
//! recency-weighted embedding of the step state vectors.
//!
//! "Nothing worth keeping" (failed verdict, quality below the threshold, or
//! already distilled) is a normal `Ok(None)` outcome, not an error.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::application::judge::TrajectoryJudge;
use crate::domain::vector::recency_weighted_mean;
use crate::domain::{DistilledMemory, MemoryId, Trajectory};
use crate::error::Result;

/// Distills judged trajectories into memories.
#[derive(Debug, Clone, Default)]
pub struct MemoryDistiller {
    judge: TrajectoryJudge,
}

impl MemoryDistiller {
    pub fn new(judge: TrajectoryJudge) -> Self {
        Self { judge }
    }

    /// Distill a trajectory into a memory, judging it first if needed.
    ///
    /// Returns `Ok(None)` when the trajectory is not worth keeping: failed
    /// verdict, quality below the distillation threshold, or already
    /// distilled (one memory per trajectory).
    pub fn distill(
        &self,
        trajectory: &mut Trajectory,
        now: DateTime<Utc>,
    ) -> Result<Option<DistilledMemory>> {
        if trajectory.distilled_memory.is_some() {
            return Ok(None);
        }

        if trajectory.verdict.is_none() {
            self.judge.judge(trajectory, now)?;
        }
        let verdict = match trajectory.verdict.as_ref() {
            Some(verdict) => verdict,
            None => return Ok(None),
        };

        if !verdict.success || trajectory.quality_score < self.judge.distillation_threshold() {
            debug!(trajectory_id = %trajectory.id, "trajectory not worth distilling");
            return Ok(None);
        }

        let strategy = summarize_actions(trajectory);

        let mut key_learnings: Vec<String> = verdict.strengths.iter().take(2).cloned().collect();
        key_learnings.extend(
            verdict
                .improvements
                .iter()
                .take(2)
                .map(|i| format!("next time: {i}")),
        );

        let state_vectors: Vec<Vec<f32>> = trajectory
            .steps
            .iter()
            .map(|s| s.state_after.clone())
            .collect();
        let embedding = recency_weighted_mean(&state_vectors);

        let memory = DistilledMemory {
            id: MemoryId::new(),
            trajectory_id: trajectory.id.clone(),
            domain: trajectory.domain.clone(),
            strategy,
            key_learnings,
            embedding,
            quality: trajectory.quality_score,
            usage_count: 0,
            last_used: now,
            created_at: now,
            consolidated: false,
        };

        trajectory.distilled_memory = Some(memory.id);
        debug!(trajectory_id = %trajectory.id, memory_id = %memory.id, "trajectory distilled");

        Ok(Some(memory))
    }
}

/// Compact summary of the distinct actions taken, in first-appearance order.
fn summarize_actions(trajectory: &Trajectory) -> String {
    let mut distinct: Vec<&str> = Vec::new();
    for step in &trajectory.steps {
        if !distinct.contains(&step.action.as_str()) {
            distinct.push(&step.action);
        }
    }

    if distinct.len() <= 3 {
        format!("Apply {}", distinct.join(" -> "))
    } else {
        format!("Multi-step approach: {}...", distinct[..3].join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrajectoryStep;

    fn trajectory(rewards: &[f64], quality: f64) -> Trajectory {
        let steps = rewards
            .iter()
            .enumerate()
            .map(|(i, &r)| TrajectoryStep::new(format!("a{i}"), vec![0.1, 0.2, 0.3], r))
            .collect();
        Trajectory::new("t-1", "testing", steps, quality).complete()
    }

    #[test]
    fn test_distill_judges_when_no_verdict() {
        let distiller = MemoryDistiller::default();
        let mut traj = trajectory(&[0.2, 0.8, 0.9], 0.75);
        assert!(traj.verdict.is_none());

        let memory = distiller.distill(&mut traj, Utc::now()).unwrap();
        assert!(traj.verdict.is_some());
        assert!(memory.is_some());
    }

    #[test]
    fn test_distill_gated_by_quality() {
        let distiller = MemoryDistiller::default();
        let mut traj = trajectory(&[0.8, 0.9, 0.9], 0.4);
        assert!(distiller.distill(&mut traj, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_distill_gated_by_verdict_success() {
        let distiller = MemoryDistiller::default();
        // Positive ratio 1/3 -> unsuccessful verdict despite quality 0.9
        let mut traj = trajectory(&[0.1, 0.2, 0.9], 0.9);
        assert!(distiller.distill(&mut traj, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_distill_only_once_per_trajectory() {
        let distiller = MemoryDistiller::default();
        let mut traj = trajectory(&[0.2, 0.8, 0.9], 0.75);

        let first = distiller.distill(&mut traj, Utc::now()).unwrap();
        assert!(first.is_some());
        let second = distiller.distill(&mut traj, Utc::now()).unwrap();
        assert!(second.is_none());
        assert_eq!(traj.distilled_memory, Some(first.unwrap().id));
    }

    #[test]
    fn test_embedding_dimension_matches_steps() {
        let distiller = MemoryDistiller::default();
        let mut traj = trajectory(&[0.2, 0.8, 0.9], 0.75);

        let memory = distiller.distill(&mut traj, Utc::now()).unwrap().unwrap();
        assert_eq!(memory.embedding.len(), 3);
        assert_eq!(memory.quality, 0.75);
        assert_eq!(memory.trajectory_id, "t-1");
        assert_eq!(memory.domain, "testing");
    }

    #[test]
    fn test_strategy_few_distinct_actions() {
        let mut traj = Trajectory::new(
            "t-2",
            "testing",
            vec![
                TrajectoryStep::new("read", vec![1.0], 0.8),
                TrajectoryStep::new("edit", vec![1.0], 0.8),
                TrajectoryStep::new("read", vec![1.0], 0.9),
            ],
            0.8,
        )
        .complete();

        let distiller = MemoryDistiller::default();
        let memory = distiller.distill(&mut traj, Utc::now()).unwrap().unwrap();
        assert_eq!(memory.strategy, "Apply read -> edit");
    }

    #[test]
    fn test_strategy_many_distinct_actions() {
        let steps = ["plan", "read", "edit", "build", "test"]
            .iter()
            .map(|a| TrajectoryStep::new(*a, vec![1.0], 0.8))
            .collect();
        let mut traj = Trajectory::new("t-3", "testing", steps, 0.8).complete();

        let distiller = MemoryDistiller::default();
        let memory = distiller.distill(&mut traj, Utc::now()).unwrap().unwrap();
        assert_eq!(memory.strategy, "Multi-step approach: plan, read, edit...");
    }

    #[test]
    fn test_key_learnings_capped() {
        let distiller = MemoryDistiller::default();
        let mut traj = trajectory(&[0.6, 0.8, 0.9], 0.85);

        let memory = distiller.distill(&mut traj, Utc::now()).unwrap().unwrap();
        // At most 2 strengths + 2 improvements
        assert!(memory.key_learnings.len() <= 4);
        assert!(!memory.key_learnings.is_empty());
    }
}
