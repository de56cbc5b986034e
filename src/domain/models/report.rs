//! Run report and per-cycle records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::memory::ScoreEntry;
use super::reflection::{ReflectionResult, Trend};
use super::verification::VerificationResult;

/// Why a run ended. Every run terminates with exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The composite score reached the configured target.
    TargetReached,
    /// The cycle budget was exhausted.
    BudgetExhausted,
    /// The filter approved nothing and memory showed no unexplored targets.
    OptionsExhausted,
    /// Reflection explicitly signalled stop.
    ReflectionStop,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::TargetReached => "target reached",
            StopReason::BudgetExhausted => "budget exhausted",
            StopReason::OptionsExhausted => "no remaining options",
            StopReason::ReflectionStop => "stopped by reflection",
        };
        write!(f, "{s}")
    }
}

/// A recommendation the filter or planner turned down, with its reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RejectedItem {
    /// Recommendation title.
    pub title: String,
    /// Why it was rejected or skipped.
    pub reason: String,
}

/// Everything that happened in one cycle, for the report and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CycleRecord {
    /// Cycle number, 1-indexed.
    pub cycle: u32,
    /// Score before this cycle's changes.
    pub before: f64,
    /// Score after this cycle's changes.
    pub after: f64,
    /// Recommendations the filter approved.
    pub approved: usize,
    /// Recommendations rejected or skipped, with reasons.
    pub rejected: Vec<RejectedItem>,
    /// Changes that landed on disk.
    pub applied: usize,
    /// Trend classification at the end of the cycle.
    pub trend: Trend,
    /// Verification outcome.
    pub verification: VerificationResult,
    /// Reflection outcome.
    pub reflection: ReflectionResult,
    /// Whether this cycle was rolled back afterwards.
    pub rolled_back: bool,
}

/// Terminal summary of one refinement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunReport {
    /// Run identifier; also the run directory name.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
    /// Why the run ended.
    pub stop_reason: StopReason,
    /// Final composite score.
    pub final_score: f64,
    /// Completed cycles.
    pub cycles_completed: u32,
    /// Score movement per cycle.
    pub score_history: Vec<ScoreEntry>,
    /// Per-cycle detail.
    pub cycles: Vec<CycleRecord>,
}
