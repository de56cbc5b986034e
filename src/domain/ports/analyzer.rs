//! Analyzer port: snapshot in, scored issues and recommendations out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::RefineResult;
use crate::domain::models::Recommendation;

use super::capture::ArtifactSnapshot;

/// One scored issue found by the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Issue {
    /// Quality dimension the issue belongs to.
    pub dimension: String,
    /// Severity on a 0-10 scale.
    pub severity: f64,
    /// What is wrong.
    pub description: String,
}

/// Full analyzer output for one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Analysis {
    /// Composite quality score, 0-10.
    pub score: f64,
    /// Scored issues backing the recommendations.
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Proposed improvements.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl Analysis {
    /// Clamp untrusted scores into range and sanitize each recommendation.
    pub fn sanitize(mut self) -> Self {
        self.score = self.score.clamp(0.0, 10.0);
        self.recommendations = self
            .recommendations
            .into_iter()
            .map(Recommendation::sanitize)
            .collect();
        self
    }
}

/// Slice of run memory handed to the analyzer so it can steer away from
/// targets the loop has already given up on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryContext {
    /// Targets that must not be recommended again.
    pub avoided_targets: Vec<String>,
    /// Number of recommendations already attempted this run.
    pub attempted_count: usize,
    /// Lessons accumulated by reflection.
    pub lessons: Vec<String>,
}

/// External artifact-analysis capability.
///
/// A failure here is fatal for the run: without recommendations there is
/// nothing to act on. The implementation owns its own per-call timeout.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze a snapshot into a score, issues, and recommendations.
    async fn analyze(
        &self,
        snapshot: &ArtifactSnapshot,
        context: &MemoryContext,
    ) -> RefineResult<Analysis>;
}
