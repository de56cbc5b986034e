//! Reflector port: cycle summary in, free-form reflection text out.
//!
//! The reasoning itself is delegated to an external capability; the
//! reflection engine only parses and validates its output, falling back to a
//! conservative default when parsing fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::RefineResult;
use crate::domain::models::{Trend, VerificationResult};

/// Everything the reflector is shown about one completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CycleSummary {
    /// Cycle number, 1-indexed.
    pub cycle: u32,
    /// Score before the cycle's changes.
    pub before: f64,
    /// Score after the cycle's changes.
    pub after: f64,
    /// `after - before`.
    pub delta: f64,
    /// Short-window trend classification.
    pub trend: Trend,
    /// Titles of recommendations whose changes landed.
    pub applied: Vec<String>,
    /// Titles and reasons of recommendations that failed this cycle.
    pub failed: Vec<(String, String)>,
    /// Verification outcome.
    pub verification: VerificationResult,
    /// Consecutive plateau cycles so far.
    pub plateau_count: u32,
}

/// External reflection capability. Output is unstructured text the engine
/// parses against a strict schema.
#[async_trait]
pub trait Reflector: Send + Sync {
    /// Produce reflection text for one cycle summary.
    async fn reflect(&self, summary: &CycleSummary) -> RefineResult<String>;
}
