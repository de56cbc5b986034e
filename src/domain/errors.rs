//! Domain errors for the Burnish refinement loop.
//!
//! Each variant maps to one failure class in the loop's propagation policy:
//! analysis failures are fatal for the run, planning and execution failures
//! are isolated per recommendation, stale-plan rejections are isolated per
//! change, and reflection parse failures are never fatal (the reflection
//! engine falls back to a conservative default instead of surfacing them).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a refinement run.
#[derive(Debug, Error)]
pub enum RefineError {
    /// The external analyzer errored or returned unparseable output.
    /// Fatal for the run: without recommendations there is nothing to act on.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// The planner produced no usable changes for a recommendation.
    /// The recommendation is skipped; the cycle continues.
    #[error("planning produced no changes for '{0}'")]
    EmptyPlan(String),

    /// A planned change's expected line content no longer matches the live
    /// file. Only that change is rejected; the rest of the plan still applies.
    #[error("stale plan: {file}:{line} no longer matches expected content")]
    StalePlan {
        /// File the change targeted.
        file: PathBuf,
        /// 1-indexed line the change targeted.
        line: usize,
    },

    /// The aggregate diff for a plan exceeded the effort-scaled size limits.
    /// The entire plan is rejected and reverted.
    #[error("size policy violation: {0}")]
    SizePolicyViolation(String),

    /// A file read or write failed while executing a plan.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Verification could not be carried out (as opposed to verification
    /// reporting a failed build, which is a result, not an error).
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// The external reflector's output did not match the expected schema.
    /// Callers fall back to a conservative continue/no-rollback default.
    #[error("reflection output could not be parsed: {0}")]
    ReflectionParseFailed(String),

    /// A collaborator call failed in a way that is not one of the more
    /// specific classes above (timeouts, transport errors).
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Configuration was invalid or could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence of run artifacts or memory failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Underlying IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type RefineResult<T> = Result<T, RefineError>;

impl RefineError {
    /// Whether this error aborts the whole run rather than a single
    /// recommendation or change.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RefineError::AnalysisFailed(_) | RefineError::Config(_) | RefineError::Persistence(_)
        )
    }
}
