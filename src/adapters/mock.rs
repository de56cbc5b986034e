//! Scripted mock collaborators.
//!
//! Used by integration tests and the `run --driver mock` dry-run mode. Each
//! mock replays a prepared script: analyses are consumed in order, plans are
//! looked up by recommendation title, reflections fall back to a permissive
//! default once the script runs out.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::{RefineError, RefineResult};
use crate::domain::models::{ChangePlan, Recommendation};
use crate::domain::ports::{
    Analysis, Analyzer, ArtifactSnapshot, BuildOutput, BuildRunner, Capture, CycleSummary,
    FileSnapshot, Implementer, MemoryContext, Reflector,
};

/// Analyzer replaying a scripted sequence of analyses.
#[derive(Debug, Default)]
pub struct MockAnalyzer {
    script: Mutex<VecDeque<Analysis>>,
}

impl MockAnalyzer {
    /// Build from the analyses to return, in call order.
    pub fn scripted(analyses: impl IntoIterator<Item = Analysis>) -> Self {
        Self {
            script: Mutex::new(analyses.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(
        &self,
        _snapshot: &ArtifactSnapshot,
        _context: &MemoryContext,
    ) -> RefineResult<Analysis> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| RefineError::Collaborator("analyzer script poisoned".into()))?;
        script
            .pop_front()
            .ok_or_else(|| RefineError::AnalysisFailed("analyzer script exhausted".into()))
    }
}

/// Implementer that looks plans up by recommendation title.
#[derive(Debug, Default)]
pub struct MockImplementer {
    plans: BTreeMap<String, ChangePlan>,
}

impl MockImplementer {
    /// Register the plan to return for a recommendation title.
    pub fn with_plan(mut self, title: impl Into<String>, plan: ChangePlan) -> Self {
        self.plans.insert(title.into(), plan);
        self
    }
}

#[async_trait]
impl Implementer for MockImplementer {
    async fn plan(
        &self,
        recommendation: &Recommendation,
        _snapshot: &FileSnapshot,
    ) -> RefineResult<ChangePlan> {
        match self.plans.get(&recommendation.title) {
            Some(plan) => Ok(plan.clone()),
            None => Ok(ChangePlan::empty(recommendation.clone())),
        }
    }
}

/// Reflector replaying scripted reflection text, then a permissive default.
#[derive(Debug, Default)]
pub struct MockReflector {
    script: Mutex<VecDeque<String>>,
}

impl MockReflector {
    /// Build from raw reflection responses, in call order.
    pub fn scripted(responses: impl IntoIterator<Item = String>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Reflector for MockReflector {
    async fn reflect(&self, _summary: &CycleSummary) -> RefineResult<String> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| RefineError::Collaborator("reflector script poisoned".into()))?;
        Ok(script.pop_front().unwrap_or_else(|| {
            r#"{"should_continue": true, "should_rollback": false, "reasoning": "scripted default"}"#
                .to_string()
        }))
    }
}

/// Build runner that always reports the configured outcome.
#[derive(Debug)]
pub struct MockBuildRunner {
    exit_code: i32,
    stderr: String,
}

impl MockBuildRunner {
    /// A runner whose builds always succeed.
    pub fn passing() -> Self {
        Self {
            exit_code: 0,
            stderr: String::new(),
        }
    }

    /// A runner whose builds always fail with the given stderr.
    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            stderr: stderr.into(),
        }
    }
}

#[async_trait]
impl BuildRunner for MockBuildRunner {
    async fn build(&self, _project: &Path, _timeout: Duration) -> RefineResult<BuildOutput> {
        Ok(BuildOutput {
            exit_code: self.exit_code,
            stdout: String::new(),
            stderr: self.stderr.clone(),
            timed_out: false,
        })
    }
}

/// Capture returning a counter-stamped digest, distinct on every call.
#[derive(Debug, Default)]
pub struct MockCapture {
    calls: Mutex<u64>,
}

#[async_trait]
impl Capture for MockCapture {
    async fn snapshot(&self, _target: &Path) -> RefineResult<ArtifactSnapshot> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|_| RefineError::Collaborator("capture counter poisoned".into()))?;
        *calls += 1;
        Ok(ArtifactSnapshot::new(
            "text/x-digest",
            format!("mock-capture-{calls}").into_bytes(),
        ))
    }
}
