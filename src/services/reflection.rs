//! Reflection engine.
//!
//! Delegates the reasoning to the external reflector, then parses its output
//! against a strict schema and overlays local policy: roll back when the
//! build broke or the score regressed beyond tolerance, stop when a plateau
//! has persisted with nothing left to explore, and fall back to a
//! conservative continue/no-rollback default whenever the reflector's output
//! is malformed. A reflection-parsing failure never aborts the run.

use std::sync::Arc;

use crate::domain::models::{ReflectionResult, Trend};
use crate::domain::ports::{CycleSummary, Reflector};

/// Thresholds the reflection engine applies on top of reflector output.
#[derive(Debug, Clone)]
pub struct ReflectionPolicy {
    /// Score regression beyond this triggers a rollback recommendation.
    pub regression_tolerance: f64,
    /// Consecutive plateau cycles after which to recommend stopping when no
    /// options remain.
    pub plateau_limit: u32,
}

/// Interprets one cycle's outcome into a continue/rollback decision.
pub struct ReflectionEngine<R: Reflector> {
    reflector: Arc<R>,
    policy: ReflectionPolicy,
}

impl<R: Reflector> ReflectionEngine<R> {
    /// Create an engine with the given reflector and policy.
    pub fn new(reflector: Arc<R>, policy: ReflectionPolicy) -> Self {
        Self { reflector, policy }
    }

    /// Reflect on one completed cycle.
    ///
    /// `options_remaining` tells the engine whether the filter still has
    /// unexplored recommendations to draw from; without it a persistent
    /// plateau is grounds to stop.
    pub async fn reflect(
        &self,
        summary: &CycleSummary,
        options_remaining: bool,
    ) -> ReflectionResult {
        let mut result = match self.reflector.reflect(summary).await {
            Ok(raw) => parse_reflection(&raw),
            Err(e) => {
                tracing::warn!(error = %e, "reflector unavailable, using conservative default");
                ReflectionResult::conservative(format!("reflector unavailable: {e}"))
            }
        };

        // Policy overlay. The external reasoning can add context but cannot
        // veto these guarantees.
        if !summary.verification.build_succeeded {
            result.should_rollback = true;
            result
                .lessons_learned
                .push("build broke; the cycle's changes were rolled back".into());
        }
        if summary.delta < -self.policy.regression_tolerance {
            result.should_rollback = true;
            result.lessons_learned.push(format!(
                "score regressed by {:.2}; rolling back",
                -summary.delta
            ));
        }
        if summary.trend == Trend::Plateau
            && summary.plateau_count >= self.policy.plateau_limit
            && !options_remaining
        {
            result.should_continue = false;
            result
                .lessons_learned
                .push("plateau persisted with no unexplored targets".into());
        }

        tracing::info!(
            cycle = summary.cycle,
            should_continue = result.should_continue,
            should_rollback = result.should_rollback,
            trend = %summary.trend,
            "reflection complete"
        );
        result
    }
}

/// Parse reflector output. Accepts a bare JSON object or one embedded in
/// surrounding prose; anything else yields the conservative default.
fn parse_reflection(raw: &str) -> ReflectionResult {
    let candidate = extract_json_object(raw).unwrap_or(raw);
    match serde_json::from_str::<ReflectionResult>(candidate) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "malformed reflection output, using conservative default");
            ReflectionResult::conservative(format!("malformed reflection output: {e}"))
        }
    }
}

/// The first balanced `{...}` region in the text, if any.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            if c != '\\' {
                escaped = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::errors::{RefineError, RefineResult};
    use crate::domain::models::VerificationResult;

    struct FixedReflector {
        raw: Option<String>,
    }

    #[async_trait]
    impl Reflector for FixedReflector {
        async fn reflect(&self, _summary: &CycleSummary) -> RefineResult<String> {
            self.raw
                .clone()
                .ok_or_else(|| RefineError::Collaborator("offline".into()))
        }
    }

    fn summary(delta: f64, build_ok: bool, plateau_count: u32) -> CycleSummary {
        let verification = VerificationResult {
            success: build_ok,
            build_succeeded: build_ok,
            files_modified: true,
            visual_changes_detected: true,
            console_errors: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };
        CycleSummary {
            cycle: 1,
            before: 7.0,
            after: 7.0 + delta,
            delta,
            trend: Trend::classify(&[delta], 0.2),
            applied: vec!["some change".into()],
            failed: Vec::new(),
            verification,
            plateau_count,
        }
    }

    fn engine(raw: Option<&str>) -> ReflectionEngine<FixedReflector> {
        ReflectionEngine::new(
            Arc::new(FixedReflector {
                raw: raw.map(String::from),
            }),
            ReflectionPolicy {
                regression_tolerance: 0.2,
                plateau_limit: 3,
            },
        )
    }

    #[tokio::test]
    async fn well_formed_output_is_honored() {
        let raw = r#"{"should_continue": true, "should_rollback": false,
                      "reasoning": "steady progress", "lessons_learned": ["keep edits small"],
                      "suggested_next_steps": ["look at typography"]}"#;
        let result = engine(Some(raw)).reflect(&summary(0.7, true, 0), true).await;
        assert!(result.should_continue);
        assert!(!result.should_rollback);
        assert_eq!(result.lessons_learned, vec!["keep edits small"]);
    }

    #[tokio::test]
    async fn json_embedded_in_prose_is_extracted() {
        let raw = "Here is my take:\n{\"should_continue\": true, \"reasoning\": \"ok\"}\nThanks.";
        let result = engine(Some(raw)).reflect(&summary(0.7, true, 0), true).await;
        assert_eq!(result.reasoning, "ok");
    }

    #[tokio::test]
    async fn malformed_output_falls_back_conservatively() {
        let result = engine(Some("not json at all"))
            .reflect(&summary(0.7, true, 0), true)
            .await;
        assert!(result.should_continue);
        assert!(!result.should_rollback);
        assert!(result.reasoning.contains("malformed"));
    }

    #[tokio::test]
    async fn reflector_failure_falls_back_conservatively() {
        let result = engine(None).reflect(&summary(0.7, true, 0), true).await;
        assert!(result.should_continue);
        assert!(!result.should_rollback);
    }

    #[tokio::test]
    async fn build_failure_forces_rollback() {
        let raw = r#"{"should_continue": true, "should_rollback": false}"#;
        let result = engine(Some(raw)).reflect(&summary(0.3, false, 0), true).await;
        assert!(result.should_rollback);
    }

    #[tokio::test]
    async fn regression_beyond_tolerance_forces_rollback() {
        let raw = r#"{"should_continue": true, "should_rollback": false}"#;
        let result = engine(Some(raw)).reflect(&summary(-0.5, true, 0), true).await;
        assert!(result.should_rollback);
    }

    #[tokio::test]
    async fn persistent_plateau_without_options_stops() {
        let raw = r#"{"should_continue": true}"#;
        let result = engine(Some(raw)).reflect(&summary(0.05, true, 3), false).await;
        assert!(!result.should_continue);
    }

    #[tokio::test]
    async fn plateau_with_options_remaining_continues() {
        let raw = r#"{"should_continue": true}"#;
        let result = engine(Some(raw)).reflect(&summary(0.05, true, 3), true).await;
        assert!(result.should_continue);
    }
}
