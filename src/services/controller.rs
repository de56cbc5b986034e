//! Iteration controller: the stateful driver of the refinement loop.
//!
//! One traversal of Analyzing -> Filtering -> Implementing -> Verifying ->
//! Reflecting is one cycle. The controller owns termination (target reached,
//! budget exhausted, options exhausted, reflection stop), performs rollbacks
//! from the snapshot store, and is the single writer of run memory: every
//! mutation happens between stages, never concurrently with them.
//!
//! Within the implement stage, plans for disjoint file sets (guaranteed by
//! the planner) run on concurrent tasks; results are aggregated back in the
//! filter's priority order so memory updates and logs are reproducible
//! regardless of completion order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::domain::errors::{RefineError, RefineResult};
use crate::domain::models::plan::target_key;
use crate::domain::models::report::RejectedItem;
use crate::domain::models::{
    ChangePlan, Config, CycleRecord, FailedChange, RunReport, StopReason, Trend,
};
use crate::domain::ports::{Analyzer, BuildRunner, Capture, CycleSummary, Implementer, Reflector};
use crate::infrastructure::capture::hidden_or_vendored;
use crate::infrastructure::persistence::RunStore;

use super::executor::{backup_map, ChangeExecutor, ExecutionOutcome};
use super::filter::{RecommendationFilter, RejectReason};
use super::memory::MemoryStore;
use super::planner::ChangePlanner;
use super::reflection::{ReflectionEngine, ReflectionPolicy};
use super::snapshots::SnapshotStore;
use super::verifier::VerificationEngine;

/// The controller's position within a cycle, for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Between runs or before the first cycle.
    Idle,
    /// Capturing and analyzing the artifact.
    Analyzing,
    /// Applying the recommendation filter.
    Filtering,
    /// Planning and executing approved recommendations.
    Implementing,
    /// Verifying the applied changes.
    Verifying,
    /// Interpreting the cycle's outcome.
    Reflecting,
    /// Cycle complete, another will start.
    Continuing,
    /// Run over.
    Terminated,
}

/// External collaborators handed to the controller at construction.
pub struct Collaborators<A, I, B, R> {
    /// Artifact analysis capability.
    pub analyzer: Arc<A>,
    /// Code-generation capability.
    pub implementer: Arc<I>,
    /// Build/test execution capability.
    pub build_runner: Arc<B>,
    /// Reflection capability.
    pub reflector: Arc<R>,
    /// Snapshot capture capability.
    pub capture: Arc<dyn Capture>,
}

/// The stateful driver sequencing one refinement run.
pub struct IterationController<A, I, B, R>
where
    A: Analyzer,
    I: Implementer + 'static,
    B: BuildRunner,
    R: Reflector,
{
    run_id: Uuid,
    config: Config,
    project_root: PathBuf,
    phase: LoopPhase,

    analyzer: Arc<A>,
    capture: Arc<dyn Capture>,
    filter: RecommendationFilter,
    planner: ChangePlanner<I>,
    executor: Arc<ChangeExecutor>,
    verifier: VerificationEngine<B>,
    reflection: ReflectionEngine<R>,

    memory: MemoryStore,
    snapshots: SnapshotStore,
    store: RunStore,
}

impl<A, I, B, R> IterationController<A, I, B, R>
where
    A: Analyzer,
    I: Implementer + 'static,
    B: BuildRunner,
    R: Reflector,
{
    /// Assemble a controller from configuration and collaborators.
    pub fn new(
        config: Config,
        collaborators: Collaborators<A, I, B, R>,
        store: RunStore,
    ) -> Self {
        let project_root = PathBuf::from(&config.project_path);
        let filter = RecommendationFilter::new(config.filter.min_roi_ratio);
        let planner = ChangePlanner::new(
            collaborators.implementer,
            config.planner.max_changes_per_plan,
        );
        let executor = Arc::new(ChangeExecutor::new(
            project_root.clone(),
            config.size_policy.clone(),
        ));
        let verifier = VerificationEngine::new(
            collaborators.build_runner,
            None,
            Duration::from_secs(config.build.timeout_secs),
        );
        let reflection = ReflectionEngine::new(
            collaborators.reflector,
            ReflectionPolicy {
                regression_tolerance: config.cycle.regression_tolerance,
                plateau_limit: config.cycle.plateau_limit,
            },
        );
        let memory = MemoryStore::new(
            config.filter.avoid_after_failures,
            config.cycle.plateau_threshold,
        );

        Self {
            run_id: store.run_id(),
            config,
            project_root,
            phase: LoopPhase::Idle,
            analyzer: collaborators.analyzer,
            capture: collaborators.capture,
            filter,
            planner,
            executor,
            verifier,
            reflection,
            memory,
            snapshots: SnapshotStore::new(),
            store,
        }
    }

    /// Replace the run's memory, typically when resuming a crashed run.
    pub fn with_memory(mut self, memory: MemoryStore) -> Self {
        self.memory = memory;
        self
    }

    /// The controller's current phase.
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Drive the full run to termination and return the report.
    pub async fn run(&mut self) -> RefineResult<RunReport> {
        let started_at = Utc::now();
        let mut cycle_records: Vec<CycleRecord> = Vec::new();
        let mut current_score: Option<f64> = None;
        let mut consecutive_empty_cycles = 0u32;

        let stop_reason = loop {
            let cycle = self.memory.current().completed_cycles() + 1;

            // Termination checks at the top of the cycle.
            if let Some(score) = current_score {
                if score >= self.config.cycle.target_score {
                    break StopReason::TargetReached;
                }
            }
            if cycle > self.config.cycle.max_cycles {
                break StopReason::BudgetExhausted;
            }

            tracing::info!(cycle, run_id = %self.run_id, "starting cycle");

            // ---- Analyzing -------------------------------------------------
            self.phase = LoopPhase::Analyzing;
            let analysis = self.analyze().await?;
            let before = analysis.score;
            if before >= self.config.cycle.target_score {
                current_score = Some(before);
                break StopReason::TargetReached;
            }

            // ---- Filtering -------------------------------------------------
            self.phase = LoopPhase::Filtering;
            let memory_view = self.memory.view();
            let outcome = self.filter.filter(analysis.recommendations, &memory_view);
            let approved_count = outcome.approved.len();
            let mut rejected_items: Vec<RejectedItem> = outcome
                .rejected
                .iter()
                .map(|r| RejectedItem {
                    title: r.recommendation.title.clone(),
                    reason: r.reason.to_string(),
                })
                .collect();

            if outcome.approved.is_empty() {
                consecutive_empty_cycles += 1;
                if outcome.options_exhausted() || consecutive_empty_cycles >= 2 {
                    tracing::info!(cycle, "no approved recommendations and nothing unexplored");
                    current_score = Some(before);
                    break StopReason::OptionsExhausted;
                }
            } else {
                consecutive_empty_cycles = 0;
            }

            // ---- Implementing ----------------------------------------------
            self.phase = LoopPhase::Implementing;
            let snapshot = self.file_snapshot().await?;
            let batch = self.planner.plan_cycle(&outcome.approved, &snapshot).await;
            for skipped in &batch.skipped {
                self.memory.record_attempt(skipped.recommendation.identity());
                rejected_items.push(RejectedItem {
                    title: skipped.recommendation.title.clone(),
                    reason: skipped.reason.clone(),
                });
            }

            let outcomes = self.execute_plans(&batch.plans).await?;
            let mut applied_titles = Vec::new();
            let mut failed_titles: Vec<(String, String)> = Vec::new();
            for (plan, outcome) in batch.plans.iter().zip(&outcomes) {
                self.memory.record_attempt(plan.recommendation.identity());
                if outcome.succeeded() {
                    applied_titles.push(outcome.recommendation_title.clone());
                    for (path, content) in &outcome.backups {
                        self.snapshots.record(cycle, path.clone(), content.clone());
                        self.memory.record_modification(&target_key(path));
                    }
                } else {
                    let reason = outcome
                        .plan_rejected
                        .clone()
                        .or_else(|| {
                            outcome
                                .rejected_changes
                                .first()
                                .map(|r| r.reason.clone())
                        })
                        .unwrap_or_else(|| "no changes applied".into());
                    failed_titles.push((outcome.recommendation_title.clone(), reason.clone()));
                    for target in ExecutionOutcome::failure_targets(plan) {
                        self.memory.record_failure(FailedChange {
                            cycle,
                            recommendation: plan.recommendation.title.clone(),
                            target: Some(target),
                            reason: reason.clone(),
                        });
                    }
                }
            }
            let applied_count: usize = outcomes.iter().map(|o| o.applied.len()).sum();

            // ---- Verifying -------------------------------------------------
            self.phase = LoopPhase::Verifying;
            let pre_change = backup_map(&outcomes);
            let verification = self.verifier.verify(&self.project_root, &pre_change).await?;

            // ---- Re-score --------------------------------------------------
            let after = self.analyze().await?.score;
            self.memory.record_score(cycle, before, after);
            let trend = Trend::classify(
                &self.memory.current().recent_deltas(self.config.cycle.trend_window),
                self.config.cycle.plateau_threshold,
            );

            // ---- Reflecting ------------------------------------------------
            self.phase = LoopPhase::Reflecting;
            let summary = CycleSummary {
                cycle,
                before,
                after,
                delta: after - before,
                trend,
                applied: applied_titles,
                failed: failed_titles,
                verification: verification.clone(),
                plateau_count: self.memory.current().plateau_count,
            };
            // Options remain only where a rejection can still pan out: ROI
            // rejections may be re-scored by a later analysis and planner
            // skips may plan cleanly against a fresh snapshot. Avoided and
            // duplicate rejections are settled for the run, and this cycle's
            // approvals have been consumed, so neither keeps a persistent
            // plateau from stopping the run.
            let retryable_rejections = outcome
                .rejected
                .iter()
                .any(|r| matches!(r.reason, RejectReason::LowRoi { .. }));
            let options_remaining = retryable_rejections || !batch.skipped.is_empty();
            let reflection = self.reflection.reflect(&summary, options_remaining).await;
            self.memory.record_lessons(reflection.lessons_learned.clone());

            let mut rolled_back = false;
            if reflection.should_rollback {
                let restored = self.snapshots.restore_cycle(cycle, &self.project_root).await?;
                rolled_back = !restored.is_empty();
                // Count the rollback against every file the cycle touched so
                // repeat offenders eventually reach the avoided set, and keep
                // the attempts recorded so the same set is not retried.
                for path in &restored {
                    self.memory.record_failure(FailedChange {
                        cycle,
                        recommendation: "cycle rollback".into(),
                        target: Some(target_key(path)),
                        reason: reflection.reasoning.clone(),
                    });
                }
                tracing::warn!(cycle, files = restored.len(), "cycle rolled back");
            }

            // The effective score going forward: rolled-back cycles revert to
            // their pre-cycle score.
            current_score = Some(if rolled_back { before } else { after });

            let record = CycleRecord {
                cycle,
                before,
                after,
                approved: approved_count,
                rejected: rejected_items,
                applied: applied_count,
                trend,
                verification,
                reflection: reflection.clone(),
                rolled_back,
            };
            self.store.save_cycle(&record).await?;
            self.store.save_memory(self.memory.current()).await?;
            cycle_records.push(record);

            // Termination checks after reflection.
            if !reflection.should_continue {
                break StopReason::ReflectionStop;
            }
            self.phase = LoopPhase::Continuing;
        };

        self.phase = LoopPhase::Terminated;
        let final_score = current_score.unwrap_or(0.0);
        let report = RunReport {
            run_id: self.run_id,
            started_at,
            finished_at: Utc::now(),
            stop_reason,
            final_score,
            cycles_completed: self.memory.current().completed_cycles(),
            score_history: self.memory.current().score_history.clone(),
            cycles: cycle_records,
        };
        self.store.save_report(&report).await?;
        tracing::info!(
            run_id = %self.run_id,
            stop_reason = %stop_reason,
            final_score,
            cycles = report.cycles_completed,
            "run complete"
        );
        Ok(report)
    }

    /// Capture and analyze the artifact. Analyzer failures are fatal.
    async fn analyze(&self) -> RefineResult<crate::domain::ports::Analysis> {
        let snapshot = self.capture.snapshot(&self.project_root).await?;
        let context = self.memory.analyzer_context();
        let analysis = self
            .analyzer
            .analyze(&snapshot, &context)
            .await
            .map_err(|e| RefineError::AnalysisFailed(e.to_string()))?
            .sanitize();
        tracing::info!(score = analysis.score, recommendations = analysis.recommendations.len(), "analysis complete");
        Ok(analysis)
    }

    /// Point-in-time snapshot of candidate files for planning.
    async fn file_snapshot(&self) -> RefineResult<crate::domain::ports::FileSnapshot> {
        let files = collect_files(
            &self.project_root,
            &self.config.planner.watch_extensions,
            self.config.planner.max_file_bytes,
        )
        .await?;
        Ok(crate::domain::ports::FileSnapshot::from_files(files))
    }

    /// Execute plans concurrently and aggregate in priority order.
    ///
    /// The planner guarantees plans target disjoint file sets, so concurrent
    /// workers never write the same file. Results come back keyed by the
    /// plan's position in the priority order and are sorted on it before any
    /// memory update, keeping downstream effects deterministic.
    async fn execute_plans(&self, plans: &[ChangePlan]) -> RefineResult<Vec<ExecutionOutcome>> {
        let mut set: JoinSet<(usize, RefineResult<ExecutionOutcome>)> = JoinSet::new();
        for (index, plan) in plans.iter().enumerate() {
            let executor = Arc::clone(&self.executor);
            let plan = plan.clone();
            set.spawn(async move { (index, executor.execute(&plan).await) });
        }

        let mut indexed: Vec<(usize, ExecutionOutcome)> = Vec::with_capacity(plans.len());
        while let Some(joined) = set.join_next().await {
            let (index, result) = joined
                .map_err(|e| RefineError::ExecutionFailed(format!("worker panicked: {e}")))?;
            match result {
                Ok(outcome) => indexed.push((index, outcome)),
                // Isolate per-recommendation execution failures: a broken
                // plan must not abort the cycle.
                Err(err) if !err.is_fatal() => {
                    tracing::warn!(error = %err, "plan execution failed");
                    indexed.push((
                        index,
                        ExecutionOutcome {
                            recommendation_title: plans[index].recommendation.title.clone(),
                            applied: Vec::new(),
                            rejected_changes: Vec::new(),
                            plan_rejected: Some(err.to_string()),
                            backups: Vec::new(),
                        },
                    ));
                }
                Err(err) => return Err(err),
            }
        }

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, outcome)| outcome).collect())
    }
}

/// Collect watched files under `root`, keyed by path relative to `root`.
/// Uses the same traversal and directory skip rules as the content-digest
/// capture so the planning snapshot and the captured artifact never disagree
/// about which files exist.
async fn collect_files(
    root: &Path,
    extensions: &[String],
    max_bytes: u64,
) -> RefineResult<BTreeMap<PathBuf, String>> {
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !hidden_or_vendored(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .map(|e| {
                let ext = e.to_string_lossy().to_lowercase();
                extensions.iter().any(|w| *w == ext)
            })
            .unwrap_or(false);
        if !matches {
            continue;
        }
        if entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX) > max_bytes {
            continue;
        }

        let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
            continue; // non-UTF8 files are not edit candidates
        };
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path())
            .to_path_buf();
        files.insert(relative, content);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_files_filters_by_extension_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.tsx"), "component").await.unwrap();
        tokio::fs::write(dir.path().join("b.lock"), "ignore").await.unwrap();
        tokio::fs::create_dir(dir.path().join(".git")).await.unwrap();
        tokio::fs::write(dir.path().join(".git/c.tsx"), "ignore").await.unwrap();
        tokio::fs::create_dir(dir.path().join("src")).await.unwrap();
        tokio::fs::write(dir.path().join("src/d.css"), "styles").await.unwrap();

        let files = collect_files(dir.path(), &["tsx".into(), "css".into()], 1024)
            .await
            .unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains_key(Path::new("a.tsx")));
        assert!(files.contains_key(Path::new("src/d.css")));
    }

    #[tokio::test]
    async fn collect_files_skips_vendored_dirs_like_capture() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("app.css"), "body {}").await.unwrap();
        for vendored in ["node_modules", "target"] {
            tokio::fs::create_dir(dir.path().join(vendored)).await.unwrap();
            tokio::fs::write(dir.path().join(vendored).join("dep.css"), "x").await.unwrap();
        }

        let files = collect_files(dir.path(), &["css".into()], 1024).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains_key(Path::new("app.css")));
    }

    #[tokio::test]
    async fn collect_files_skips_oversized() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("big.css"), "x".repeat(2048))
            .await
            .unwrap();
        let files = collect_files(dir.path(), &["css".into()], 1024).await.unwrap();
        assert!(files.is_empty());
    }
}
