//! Memory store: single-writer wrapper over [`RunMemory`].
//!
//! The store is mutated only at defined transition points between stages;
//! reads used for filtering and planning within a cycle go through
//! [`MemoryStore::view`], a snapshot taken at the top of the cycle, so no
//! mid-cycle mutation can leak into stage decisions.

use crate::domain::models::{FailedChange, RunMemory};
use crate::domain::models::recommendation::RecommendationId;
use crate::domain::ports::MemoryContext;

/// Owns the run's memory and its explicit mutation points.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RunMemory,
    avoid_after_failures: u32,
    plateau_threshold: f64,
}

impl MemoryStore {
    /// Create a store with the given promotion threshold and plateau band.
    pub fn new(avoid_after_failures: u32, plateau_threshold: f64) -> Self {
        Self {
            inner: RunMemory::default(),
            avoid_after_failures,
            plateau_threshold,
        }
    }

    /// Resume from previously persisted memory.
    pub fn resume(memory: RunMemory, avoid_after_failures: u32, plateau_threshold: f64) -> Self {
        Self {
            inner: memory,
            avoid_after_failures,
            plateau_threshold,
        }
    }

    /// Snapshot-consistent view for filtering and planning within a cycle.
    pub fn view(&self) -> RunMemory {
        self.inner.clone()
    }

    /// Borrow the live memory for read-only aggregate queries.
    pub fn current(&self) -> &RunMemory {
        &self.inner
    }

    /// The context slice handed to the analyzer.
    pub fn analyzer_context(&self) -> MemoryContext {
        MemoryContext {
            avoided_targets: self.inner.avoided_targets.iter().cloned().collect(),
            attempted_count: self.inner.attempted_recommendations.len(),
            lessons: self.inner.lessons.clone(),
        }
    }

    /// Record that a recommendation was tried.
    pub fn record_attempt(&mut self, id: RecommendationId) {
        self.inner.record_attempt(id);
    }

    /// Record a failed change; promotes the target when its failure count
    /// crosses the configured threshold.
    pub fn record_failure(&mut self, failure: FailedChange) {
        let target = failure.target.clone();
        self.inner.record_failure(failure, self.avoid_after_failures);
        if let Some(target) = target {
            if self.inner.avoided_targets.contains(&target) {
                tracing::warn!(%target, "target promoted to avoided set");
            }
        }
    }

    /// Record a completed cycle's score movement.
    pub fn record_score(&mut self, cycle: u32, before: f64, after: f64) {
        self.inner
            .record_score(cycle, before, after, self.plateau_threshold);
    }

    /// Record that a file was edited.
    pub fn record_modification(&mut self, target: &str) {
        self.inner.record_modification(target);
    }

    /// Append reflection lessons.
    pub fn record_lessons(&mut self, lessons: impl IntoIterator<Item = String>) {
        self.inner.record_lessons(lessons);
    }
}
