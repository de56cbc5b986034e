//! Verification engine.
//!
//! Confirms a cycle's edits actually landed, the artifact still builds, and a
//! visual or content delta exists. Verification only reports; the rollback
//! decision belongs to reflection, which weighs these signals against the
//! score trend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::RefineResult;
use crate::domain::models::VerificationResult;
use crate::domain::ports::{BuildRunner, LiveSession};

/// Settling window used when a live session is attached.
const CONSOLE_SETTLE: Duration = Duration::from_secs(2);

/// Verifies a batch of applied changes after the implement stage.
pub struct VerificationEngine<B: BuildRunner> {
    build_runner: Arc<B>,
    live_session: Option<Arc<dyn LiveSession>>,
    build_timeout: Duration,
}

impl<B: BuildRunner> VerificationEngine<B> {
    /// Create a verification engine. `live_session` is optional; without one
    /// the console check degrades to a content-delta heuristic.
    pub fn new(
        build_runner: Arc<B>,
        live_session: Option<Arc<dyn LiveSession>>,
        build_timeout: Duration,
    ) -> Self {
        Self {
            build_runner,
            live_session,
            build_timeout,
        }
    }

    /// Verify one cycle's changes.
    ///
    /// `pre_change` maps each touched file (relative to `project`) to its
    /// content before the cycle's first write.
    pub async fn verify(
        &self,
        project: &Path,
        pre_change: &BTreeMap<PathBuf, String>,
    ) -> RefineResult<VerificationResult> {
        if pre_change.is_empty() {
            return Ok(VerificationResult::nothing_applied());
        }

        let mut result = VerificationResult {
            success: false,
            build_succeeded: false,
            files_modified: false,
            visual_changes_detected: false,
            console_errors: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        // 1. Files modified: each touched file exists and differs from its
        //    pre-change snapshot.
        let mut all_modified = true;
        let mut any_delta = false;
        for (path, original) in pre_change {
            let absolute = project.join(path);
            match tokio::fs::read_to_string(&absolute).await {
                Ok(current) => {
                    if current == *original {
                        all_modified = false;
                        result
                            .warnings
                            .push(format!("{} is unchanged", path.display()));
                    } else {
                        any_delta = true;
                    }
                }
                Err(e) => {
                    all_modified = false;
                    result
                        .errors
                        .push(format!("{} could not be read: {e}", path.display()));
                }
            }
        }
        result.files_modified = all_modified;

        // 2. Build check with timeout. A timeout counts as a build failure.
        let build = self.build_runner.build(project, self.build_timeout).await?;
        result.build_succeeded = build.succeeded();
        if build.timed_out {
            result.errors.push(format!(
                "build timed out after {}s",
                self.build_timeout.as_secs()
            ));
        } else if !build.succeeded() {
            result.errors.extend(build.error_lines());
        }

        // 3. Console errors from a live session when available; otherwise the
        //    content delta stands in for visual change detection.
        match &self.live_session {
            Some(session) => match session.console_errors(CONSOLE_SETTLE).await {
                Ok(errors) => {
                    result.visual_changes_detected = any_delta;
                    result.console_errors = errors;
                }
                Err(e) => {
                    result.visual_changes_detected = any_delta;
                    result
                        .warnings
                        .push(format!("live session unavailable: {e}"));
                }
            },
            None => {
                // TODO(perceptual-diff): replace the content-delta stand-in
                // once a real visual comparison capability is plugged in.
                result.visual_changes_detected = any_delta;
                result
                    .warnings
                    .push("no live session; using content-delta heuristic".into());
            }
        }

        let result = result.finalize();
        tracing::info!(
            success = result.success,
            build = result.build_succeeded,
            files_modified = result.files_modified,
            console_errors = result.console_errors.len(),
            "verification complete"
        );
        Ok(result)
    }
}
