//! Cross-cycle run memory.
//!
//! One [`RunMemory`] lives for the duration of a run. It records everything
//! attempted so the filter never re-approves known-bad work: attempted
//! recommendation identities, failed changes with reasons, targets promoted
//! to the avoided set after repeated failures, the full score history, and
//! per-file modification counts.
//!
//! Invariants: `score_history.len()` equals the number of completed cycles,
//! and the avoided set only ever grows within a run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::recommendation::RecommendationId;

/// One recommendation that failed execution or verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FailedChange {
    /// Cycle in which the failure occurred.
    pub cycle: u32,
    /// Title of the failed recommendation.
    pub recommendation: String,
    /// Target key the failure counts against (lowercased file stem), if the
    /// failure was attributable to a specific file.
    pub target: Option<String>,
    /// Why it failed.
    pub reason: String,
}

/// One completed cycle's score movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreEntry {
    /// Cycle number, 1-indexed.
    pub cycle: u32,
    /// Composite score before the cycle's changes.
    pub before: f64,
    /// Composite score after the cycle's changes.
    pub after: f64,
    /// `after - before`.
    pub delta: f64,
}

/// Everything attempted across cycles in one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunMemory {
    /// Recommendation identities already tried this run.
    pub attempted_recommendations: BTreeSet<RecommendationId>,

    /// Recommendations that failed execution or verification, with reasons.
    pub failed_changes: Vec<FailedChange>,

    /// Target keys that have failed repeatedly and must not be targeted
    /// again. Monotonic: entries are never removed within a run.
    pub avoided_targets: BTreeSet<String>,

    /// Failure count per target key; drives promotion into `avoided_targets`.
    pub failure_counts: BTreeMap<String, u32>,

    /// Ordered score movement, one entry per completed cycle.
    pub score_history: Vec<ScoreEntry>,

    /// Consecutive cycles whose |delta| stayed below the plateau threshold.
    pub plateau_count: u32,

    /// Number of times each file has been edited this run.
    pub modification_count: BTreeMap<String, u32>,

    /// Lessons accumulated from reflection, fed back to the analyzer.
    pub lessons: Vec<String>,

    /// When this memory was last updated.
    pub updated_at: Option<DateTime<Utc>>,
}

impl RunMemory {
    /// Mark a recommendation identity as attempted.
    pub fn record_attempt(&mut self, id: RecommendationId) {
        self.attempted_recommendations.insert(id);
        self.touch();
    }

    /// Whether a recommendation identity was already attempted.
    pub fn has_attempted(&self, id: &RecommendationId) -> bool {
        self.attempted_recommendations.contains(id)
    }

    /// Record a failed change. When the failure is attributable to a target
    /// and that target's failure count reaches `avoid_after_failures`, the
    /// target is promoted into the avoided set.
    pub fn record_failure(&mut self, failure: FailedChange, avoid_after_failures: u32) {
        if let Some(target) = failure.target.clone() {
            let count = self.failure_counts.entry(target.clone()).or_insert(0);
            *count += 1;
            if *count >= avoid_after_failures {
                self.promote_to_avoided(target);
            }
        }
        self.failed_changes.push(failure);
        self.touch();
    }

    /// Force a target into the avoided set.
    pub fn promote_to_avoided(&mut self, target: String) {
        self.avoided_targets.insert(target.to_lowercase());
        self.touch();
    }

    /// The first avoided target that appears (case-insensitively) in the
    /// given text, if any.
    pub fn matching_avoided_target(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.avoided_targets
            .iter()
            .find(|t| lowered.contains(t.as_str()))
            .map(String::as_str)
    }

    /// Record a completed cycle's score movement and update the plateau
    /// counter against the given threshold.
    pub fn record_score(&mut self, cycle: u32, before: f64, after: f64, plateau_threshold: f64) {
        let delta = after - before;
        self.score_history.push(ScoreEntry {
            cycle,
            before,
            after,
            delta,
        });
        if delta.abs() < plateau_threshold {
            self.plateau_count += 1;
        } else {
            self.plateau_count = 0;
        }
        self.touch();
    }

    /// Record that a file was modified this cycle.
    pub fn record_modification(&mut self, target: &str) {
        *self
            .modification_count
            .entry(target.to_lowercase())
            .or_insert(0) += 1;
        self.touch();
    }

    /// Append reflection lessons.
    pub fn record_lessons(&mut self, lessons: impl IntoIterator<Item = String>) {
        self.lessons.extend(lessons);
        self.touch();
    }

    /// Number of completed cycles, derived from the score history.
    pub fn completed_cycles(&self) -> u32 {
        self.score_history.len() as u32
    }

    /// The last `window` score deltas, oldest first.
    pub fn recent_deltas(&self, window: usize) -> Vec<f64> {
        let start = self.score_history.len().saturating_sub(window);
        self.score_history[start..].iter().map(|e| e.delta).collect()
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
