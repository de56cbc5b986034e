//! Change planner: one approved recommendation in, one validated plan out.
//!
//! Planning (which needs full-file context) is deliberately decoupled from
//! execution (which is constrained to a small operation vocabulary). The
//! planner delegates the creative step to the external implementer, then
//! validates the returned plan mechanically: change-count bounds, files
//! inside the snapshot, 1-indexed lines in range, and line content matching
//! the snapshot. It also guarantees that no two plans in one cycle target the
//! same file, which is what makes the implement stage safe to parallelize.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::errors::{RefineError, RefineResult};
use crate::domain::models::{ChangePlan, Recommendation};
use crate::domain::ports::{FileSnapshot, Implementer};

/// A recommendation the planner skipped, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedPlan {
    /// The skipped recommendation.
    pub recommendation: Recommendation,
    /// Why planning produced nothing usable.
    pub reason: String,
}

/// The planner's output for one cycle: dispatchable plans in priority order,
/// plus everything that was skipped.
#[derive(Debug, Default)]
pub struct PlanBatch {
    /// Plans ready for execution, in the approval (priority) order.
    pub plans: Vec<ChangePlan>,
    /// Recommendations skipped during planning.
    pub skipped: Vec<SkippedPlan>,
}

/// Read-only planning service wrapping the external implementer.
pub struct ChangePlanner<I: Implementer> {
    implementer: Arc<I>,
    max_changes_per_plan: usize,
}

impl<I: Implementer> ChangePlanner<I> {
    /// Create a planner with the given per-plan change bound.
    pub fn new(implementer: Arc<I>, max_changes_per_plan: usize) -> Self {
        Self {
            implementer,
            max_changes_per_plan,
        }
    }

    /// Plan every approved recommendation against one snapshot.
    ///
    /// Recommendations are processed in priority order; the first plan to
    /// claim a file wins, and later plans touching any claimed file are
    /// skipped for this cycle. Per-recommendation failures are isolated:
    /// a planner error or empty plan skips that recommendation only.
    pub async fn plan_cycle(
        &self,
        approved: &[Recommendation],
        snapshot: &FileSnapshot,
    ) -> PlanBatch {
        let mut batch = PlanBatch::default();
        let mut claimed_files: BTreeSet<PathBuf> = BTreeSet::new();

        for recommendation in approved {
            match self.plan_one(recommendation, snapshot).await {
                Ok(plan) => {
                    let targets = plan.target_files();
                    if let Some(conflict) = targets.iter().find(|f| claimed_files.contains(*f)) {
                        tracing::debug!(
                            title = %recommendation.title,
                            file = %conflict.display(),
                            "skipping plan, file already claimed this cycle"
                        );
                        batch.skipped.push(SkippedPlan {
                            recommendation: recommendation.clone(),
                            reason: format!(
                                "file {} already claimed this cycle",
                                conflict.display()
                            ),
                        });
                        continue;
                    }
                    claimed_files.extend(targets);
                    batch.plans.push(plan);
                }
                Err(err) => {
                    tracing::debug!(
                        title = %recommendation.title,
                        error = %err,
                        "skipping recommendation"
                    );
                    batch.skipped.push(SkippedPlan {
                        recommendation: recommendation.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            plans = batch.plans.len(),
            skipped = batch.skipped.len(),
            "planned cycle"
        );
        batch
    }

    /// Plan one recommendation and validate the result.
    async fn plan_one(
        &self,
        recommendation: &Recommendation,
        snapshot: &FileSnapshot,
    ) -> RefineResult<ChangePlan> {
        let plan = self.implementer.plan(recommendation, snapshot).await?;

        if plan.is_empty() {
            return Err(RefineError::EmptyPlan(recommendation.title.clone()));
        }
        if plan.changes.len() > self.max_changes_per_plan {
            return Err(RefineError::EmptyPlan(format!(
                "{}: {} changes exceeds the {} change limit",
                recommendation.title,
                plan.changes.len(),
                self.max_changes_per_plan
            )));
        }

        for change in &plan.changes {
            if !snapshot.contains(&change.file) {
                return Err(RefineError::EmptyPlan(format!(
                    "{}: plan targets {} which is not in the snapshot",
                    recommendation.title,
                    change.file.display()
                )));
            }
            if snapshot.line(&change.file, change.line).is_none() {
                return Err(RefineError::EmptyPlan(format!(
                    "{}: line {} out of range for {}",
                    recommendation.title,
                    change.line,
                    change.file.display()
                )));
            }
        }

        Ok(plan)
    }
}
