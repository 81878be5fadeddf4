// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # TrajectoryJudge — Verdict computation
//!
//! Evaluates a completed trajectory into a [`TrajectoryVerdict`]: success
//! flag, confidence, strengths/weaknesses with templated improvement
//! suggestions, and a recency-decayed relevance score.
//!
//! The verdict is a pure function of the trajectory's steps and quality
//! score; judging is idempotent and may be re-run (no guard — the caller
//! owns re-judge policy).

use chrono::{DateTime, Utc};

use crate::domain::{Trajectory, TrajectoryVerdict};
use crate::error::{CortexError, Result};

/// Configuration for trajectory judging.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Quality score a trajectory must reach to count as a success and be
    /// eligible for distillation.
    pub distillation_threshold: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            distillation_threshold: 0.6,
        }
    }
}

/// Judges completed trajectories.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryJudge {
    config: JudgeConfig,
}

impl TrajectoryJudge {
    pub fn new(config: JudgeConfig) -> Self {
        Self { config }
    }

    pub fn distillation_threshold(&self) -> f64 {
        self.config.distillation_threshold
    }

    /// Judge a trajectory and attach the verdict to it.
    ///
    /// Fails with [`CortexError::InvalidState`] when the trajectory is not
    /// complete.
    pub fn judge(&self, trajectory: &mut Trajectory, now: DateTime<Utc>) -> Result<TrajectoryVerdict> {
        if !trajectory.is_complete {
            return Err(CortexError::InvalidState(
                "cannot judge incomplete trajectory".to_string(),
            ));
        }

        let avg_reward = trajectory.average_reward();
        let positive_ratio = trajectory.positive_ratio();
        let slope = trajectory.reward_slope();
        let quality = trajectory.quality_score;
        let step_count = trajectory.steps.len();

        let success = quality >= self.config.distillation_threshold && positive_ratio > 0.6;

        let confidence = 0.3 * (step_count as f64 / 10.0).min(1.0)
            + 0.4 * positive_ratio
            + 0.3 * ((quality - 0.5).abs() * 2.0);

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        let mut improvements = Vec::new();

        if avg_reward > 0.7 {
            strengths.push("high average reward across steps".to_string());
        }
        if slope > 0.2 {
            strengths.push("rewards improved over the trajectory".to_string());
        }
        if quality > 0.8 {
            strengths.push("high overall quality".to_string());
        }
        if step_count < 5 && quality > 0.6 {
            strengths.push("efficient: good outcome in few steps".to_string());
        }

        if avg_reward < 0.4 {
            weaknesses.push("low average reward".to_string());
            improvements.push("prefer actions with higher expected reward".to_string());
        }
        if slope < -0.1 {
            weaknesses.push("rewards declined over the trajectory".to_string());
            improvements.push("re-plan when step rewards start dropping".to_string());
        }
        if positive_ratio < 0.5 {
            weaknesses.push("many negative or neutral steps".to_string());
            improvements.push("prune exploratory steps that do not pay off".to_string());
        }
        if step_count > 10 && quality < 0.7 {
            weaknesses.push("long trajectory with mediocre outcome".to_string());
            improvements.push("look for a shorter path to the same result".to_string());
        }

        let age_days = trajectory.age_days(now);
        let relevance_score = 0.7 * quality + 0.3 * (-age_days / 30.0).exp();

        let verdict = TrajectoryVerdict {
            success,
            confidence,
            strengths,
            weaknesses,
            improvements,
            relevance_score,
        };

        trajectory.verdict = Some(verdict.clone());
        Ok(verdict)
    }
}
