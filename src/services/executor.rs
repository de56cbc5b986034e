//! Change validator/executor.
//!
//! Executes a plan one change at a time: the stale-plan guard rejects a
//! single change whose expected line content no longer matches the live
//! file, while the size policy rejects (and reverts) the whole plan when its
//! aggregate effect exceeds the effort-scaled limits. Every file is backed up
//! before its first write so a rejected plan leaves no trace and the cycle's
//! backups feed the run-scoped snapshot store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::errors::{RefineError, RefineResult};
use crate::domain::models::plan::{changed_lines, growth_percent, target_key, FileBackup};
use crate::domain::models::{AppliedChange, ChangePlan, PlannedChange, SizePolicy};

/// One change within a plan that was individually rejected.
#[derive(Debug, Clone)]
pub struct RejectedChange {
    /// The planned change that was rejected.
    pub change: PlannedChange,
    /// Why.
    pub reason: String,
}

/// Result of executing one plan.
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// Title of the recommendation the plan implements.
    pub recommendation_title: String,
    /// Changes that landed on disk (empty when the plan was rejected).
    pub applied: Vec<AppliedChange>,
    /// Changes rejected individually (stale line, missing anchor).
    pub rejected_changes: Vec<RejectedChange>,
    /// Set when the whole plan was rejected and reverted.
    pub plan_rejected: Option<String>,
    /// Pre-write file contents, keyed by path, for the snapshot store.
    pub backups: Vec<FileBackup>,
}

impl ExecutionOutcome {
    /// Whether anything usable came out of this plan.
    pub fn succeeded(&self) -> bool {
        self.plan_rejected.is_none() && !self.applied.is_empty()
    }

    /// Target keys this outcome's failure should count against: the stems of
    /// every file the plan intended to touch.
    pub fn failure_targets(plan: &ChangePlan) -> Vec<String> {
        plan.target_files().iter().map(|p| target_key(p)).collect()
    }
}

/// Applies validated plans to the project tree under the size policy.
pub struct ChangeExecutor {
    project_root: PathBuf,
    policy: SizePolicy,
}

impl ChangeExecutor {
    /// Create an executor rooted at the project directory.
    pub fn new(project_root: impl Into<PathBuf>, policy: SizePolicy) -> Self {
        Self {
            project_root: project_root.into(),
            policy,
        }
    }

    /// Execute one plan. Individual stale or unanchored changes are skipped;
    /// a size-policy violation rejects and reverts the entire plan.
    pub async fn execute(&self, plan: &ChangePlan) -> RefineResult<ExecutionOutcome> {
        let mut outcome = ExecutionOutcome {
            recommendation_title: plan.recommendation.title.clone(),
            applied: Vec::new(),
            rejected_changes: Vec::new(),
            plan_rejected: None,
            backups: Vec::new(),
        };

        // Pre-write content per file, captured on first touch.
        let mut originals: BTreeMap<PathBuf, String> = BTreeMap::new();

        for change in &plan.changes {
            match self.apply_change(change, &mut originals).await {
                Ok(applied) => outcome.applied.push(applied),
                Err(err) => {
                    tracing::debug!(
                        file = %change.file.display(),
                        line = change.line,
                        error = %err,
                        "rejected single change"
                    );
                    outcome.rejected_changes.push(RejectedChange {
                        change: change.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if outcome.applied.is_empty() {
            outcome.backups = originals.into_iter().collect();
            return Ok(outcome);
        }

        // Size policy over the plan's aggregate effect, measured against the
        // final on-disk state of every touched file.
        let mut total_changed = 0usize;
        let mut file_growth = Vec::new();
        for (path, original) in &originals {
            let current = tokio::fs::read_to_string(self.project_root.join(path)).await?;
            total_changed += changed_lines(original, &current);
            file_growth.push((original.lines().count(), growth_percent(original, &current)));
        }

        let tier = plan.recommendation.effort_tier();
        if let Err(violation) = self.policy.check(tier, total_changed, &file_growth) {
            tracing::warn!(
                title = %plan.recommendation.title,
                %violation,
                "size policy violation, reverting plan"
            );
            for (path, original) in &originals {
                tokio::fs::write(self.project_root.join(path), original).await?;
            }
            outcome.applied.clear();
            outcome.plan_rejected = Some(
                RefineError::SizePolicyViolation(violation).to_string(),
            );
        }

        outcome.backups = originals.into_iter().collect();
        Ok(outcome)
    }

    /// Apply one planned change with the stale-plan guard.
    async fn apply_change(
        &self,
        change: &PlannedChange,
        originals: &mut BTreeMap<PathBuf, String>,
    ) -> RefineResult<AppliedChange> {
        let absolute = self.project_root.join(&change.file);
        let content = tokio::fs::read_to_string(&absolute)
            .await
            .map_err(|e| RefineError::ExecutionFailed(format!(
                "cannot read {}: {e}",
                change.file.display()
            )))?;

        let mut lines: Vec<&str> = content.lines().collect();
        if change.line == 0 || change.line > lines.len() {
            return Err(RefineError::StalePlan {
                file: change.file.clone(),
                line: change.line,
            });
        }

        // Stale-plan guard: the live line must still match what the planner saw.
        let live_line = lines[change.line - 1];
        if live_line != change.line_content {
            return Err(RefineError::StalePlan {
                file: change.file.clone(),
                line: change.line,
            });
        }

        let edited_line = change
            .op
            .apply_to_line(live_line)
            .map_err(RefineError::ExecutionFailed)?;

        // Back up before the first write to this file.
        originals
            .entry(change.file.clone())
            .or_insert_with(|| content.clone());

        lines[change.line - 1] = &edited_line;
        let mut new_content = lines.join("\n");
        if content.ends_with('\n') {
            new_content.push('\n');
        }

        tokio::fs::write(&absolute, &new_content).await.map_err(|e| {
            RefineError::ExecutionFailed(format!("cannot write {}: {e}", change.file.display()))
        })?;

        // Re-read so the applied record reflects what actually landed.
        let on_disk = tokio::fs::read_to_string(&absolute).await?;
        tracing::debug!(
            file = %change.file.display(),
            line = change.line,
            "applied change"
        );
        Ok(AppliedChange::edit(change.file.clone(), content, on_disk))
    }
}

/// Verification's claim set: the pre-write content of every file a
/// successful outcome touched. Rejected plans were reverted and claim no
/// edits, so their backups are excluded; including them would fail the
/// files-modified check for the whole cycle on files that are rightly
/// byte-identical to their backups.
pub fn backup_map(outcomes: &[ExecutionOutcome]) -> BTreeMap<PathBuf, String> {
    let mut map = BTreeMap::new();
    for outcome in outcomes.iter().filter(|o| o.succeeded()) {
        for (path, content) in &outcome.backups {
            map.entry(path.clone()).or_insert_with(|| content.clone());
        }
    }
    map
}
