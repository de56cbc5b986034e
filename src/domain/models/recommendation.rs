//! Recommendation model produced by the external analyzer.
//!
//! Recommendations are consumed read-only by the filter and planner. Identity
//! for deduplication is the `(dimension, title)` pair, normalized to lowercase
//! so case drift in analyzer output does not defeat the duplicate check.

use serde::{Deserialize, Serialize};

/// One proposed improvement to the artifact.
///
/// Produced by the external analyzer. `impact` and `effort` are scored on a
/// 0-10 scale; the filter's ROI gate uses their ratio to bias the loop toward
/// cheap, high-value changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Recommendation {
    /// Quality dimension this recommendation addresses (e.g. "typography",
    /// "accessibility"). Free-form because analyzer output is untrusted.
    pub dimension: String,

    /// Short title. Part of the recommendation's identity.
    pub title: String,

    /// Longer description of what to change and why.
    pub description: String,

    /// Estimated impact on the composite score, 0-10.
    pub impact: f64,

    /// Estimated effort to implement, 0-10.
    pub effort: f64,

    /// Optional implementation hint passed through to the planner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Recommendation {
    /// Stable identity used for duplicate detection across cycles.
    pub fn identity(&self) -> RecommendationId {
        RecommendationId(format!(
            "{}::{}",
            self.dimension.trim().to_lowercase(),
            self.title.trim().to_lowercase()
        ))
    }

    /// Impact/effort ratio. Effort is clamped to at least 1 so zero-effort
    /// claims from the analyzer cannot produce an infinite ROI.
    pub fn roi(&self) -> f64 {
        self.impact / self.effort.max(1.0)
    }

    /// Effort tier used to scale the executor's changed-line ceiling.
    pub fn effort_tier(&self) -> EffortTier {
        EffortTier::from_effort(self.effort)
    }

    /// All recommendation text the avoided-target check matches against,
    /// lowercased: title, description, and hint.
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {}", self.title, self.description);
        if let Some(hint) = &self.hint {
            text.push(' ');
            text.push_str(hint);
        }
        text.to_lowercase()
    }

    /// Clamp scores into the valid 0-10 range. Applied once when analyzer
    /// output is accepted, since that output is untrusted.
    pub fn sanitize(mut self) -> Self {
        self.impact = self.impact.clamp(0.0, 10.0);
        self.effort = self.effort.clamp(0.0, 10.0);
        self
    }
}

/// Normalized `(dimension, title)` identity of a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecommendationId(String);

impl RecommendationId {
    /// The normalized key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecommendationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Effort tier for size-policy scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortTier {
    /// Effort 0-3.
    Low,
    /// Effort above 3, up to 6.
    Medium,
    /// Effort above 6.
    High,
}

impl EffortTier {
    /// Classify a raw effort score into a tier.
    pub fn from_effort(effort: f64) -> Self {
        if effort <= 3.0 {
            EffortTier::Low
        } else if effort <= 6.0 {
            EffortTier::Medium
        } else {
            EffortTier::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(impact: f64, effort: f64) -> Recommendation {
        Recommendation {
            dimension: "typography".into(),
            title: "Increase heading contrast".into(),
            description: "Headings are hard to read on the light background".into(),
            impact,
            effort,
            hint: None,
        }
    }

    #[test]
    fn identity_is_case_insensitive() {
        let a = rec(5.0, 2.0);
        let mut b = a.clone();
        b.dimension = "Typography".into();
        b.title = "INCREASE HEADING CONTRAST".into();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn roi_clamps_zero_effort() {
        assert!((rec(8.0, 0.0).roi() - 8.0).abs() < f64::EPSILON);
        assert!((rec(9.0, 2.0).roi() - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn effort_tiers() {
        assert_eq!(EffortTier::from_effort(2.0), EffortTier::Low);
        assert_eq!(EffortTier::from_effort(3.0), EffortTier::Low);
        assert_eq!(EffortTier::from_effort(5.0), EffortTier::Medium);
        assert_eq!(EffortTier::from_effort(7.5), EffortTier::High);
    }

    #[test]
    fn searchable_text_includes_hint() {
        let mut r = rec(5.0, 2.0);
        r.hint = Some("Header.tsx line 12".into());
        assert!(r.searchable_text().contains("header.tsx"));
    }

    #[test]
    fn sanitize_clamps_scores() {
        let r = rec(14.0, -3.0).sanitize();
        assert!((r.impact - 10.0).abs() < f64::EPSILON);
        assert!(r.effort.abs() < f64::EPSILON);
    }
}
