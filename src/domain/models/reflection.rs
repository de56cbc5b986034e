//! Reflection result and score-trend classification.

use serde::{Deserialize, Serialize};

/// The reflection engine's interpretation of one completed cycle.
///
/// Produced by parsing the external reflector's output and overlaying the
/// engine's own policy. On malformed reflector output the engine falls back
/// to [`ReflectionResult::conservative`], never aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReflectionResult {
    /// Whether the run should proceed to another cycle.
    #[serde(default = "default_true")]
    pub should_continue: bool,

    /// Whether the just-completed cycle should be rolled back before the
    /// next cycle starts.
    #[serde(default)]
    pub should_rollback: bool,

    /// Free-form reasoning, for logs and the run report.
    #[serde(default)]
    pub reasoning: String,

    /// Lessons worth remembering for later cycles.
    #[serde(default)]
    pub lessons_learned: Vec<String>,

    /// Suggested directions for the next cycle.
    #[serde(default)]
    pub suggested_next_steps: Vec<String>,
}

const fn default_true() -> bool {
    true
}

impl ReflectionResult {
    /// Conservative fallback used when reflector output is malformed or
    /// unavailable: continue, do not roll back, record nothing.
    pub fn conservative(reason: impl Into<String>) -> Self {
        Self {
            should_continue: true,
            should_rollback: false,
            reasoning: reason.into(),
            lessons_learned: Vec::new(),
            suggested_next_steps: Vec::new(),
        }
    }
}

/// Short-window score trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Mean recent delta above the plateau threshold.
    Improving,
    /// Mean recent delta within the plateau band.
    Plateau,
    /// Mean recent delta below the negative plateau threshold.
    Declining,
}

impl Trend {
    /// Classify the mean of recent score deltas against a symmetric
    /// threshold band (default band is +/- 0.2 composite points).
    pub fn classify(deltas: &[f64], threshold: f64) -> Self {
        if deltas.is_empty() {
            return Trend::Plateau;
        }
        let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
        if mean > threshold {
            Trend::Improving
        } else if mean < -threshold {
            Trend::Declining
        } else {
            Trend::Plateau
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Improving => "improving",
            Trend::Plateau => "plateau",
            Trend::Declining => "declining",
        };
        write!(f, "{s}")
    }
}
