//! Verification result model.

use serde::{Deserialize, Serialize};

/// Aggregate outcome of verifying one cycle's applied changes.
///
/// Verification only reports; it never rolls back. The rollback decision
/// belongs to the reflection engine, which weighs these signals against the
/// score trend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VerificationResult {
    /// Overall verdict: files modified, build succeeded, console clean.
    pub success: bool,

    /// The project's build command exited successfully within its timeout.
    pub build_succeeded: bool,

    /// Every claimed edit exists on disk and differs from its pre-change
    /// snapshot.
    pub files_modified: bool,

    /// A visual or content delta was detected after the changes landed.
    pub visual_changes_detected: bool,

    /// Console errors captured from a live session's settling window, when
    /// one was available.
    pub console_errors: Vec<String>,

    /// Hard errors encountered while verifying.
    pub errors: Vec<String>,

    /// Non-fatal observations (e.g. heuristic delta used instead of a live
    /// session).
    pub warnings: Vec<String>,
}

impl VerificationResult {
    /// A verification result for a cycle in which nothing was applied.
    pub fn nothing_applied() -> Self {
        Self {
            success: false,
            build_succeeded: true,
            files_modified: false,
            visual_changes_detected: false,
            console_errors: Vec::new(),
            errors: Vec::new(),
            warnings: vec!["no changes were applied this cycle".into()],
        }
    }

    /// Recompute the aggregate verdict from the component signals.
    pub fn finalize(mut self) -> Self {
        self.success =
            self.files_modified && self.build_succeeded && self.console_errors.is_empty();
        self
    }
}
