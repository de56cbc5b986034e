//! Recommendation filter: the policy gate between analysis and
//! implementation.
//!
//! Pure function over its inputs. Three ordered checks, first failure wins:
//! avoided-target, duplicate identity, then ROI. The controller, not the
//! filter, records accepted recommendations into memory after they are
//! actually applied.

use serde::{Deserialize, Serialize};

use crate::domain::models::{Recommendation, RunMemory};

/// Why a recommendation was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RejectReason {
    /// The recommendation references a target in the avoided set.
    AvoidedTarget {
        /// The avoided entry that matched.
        target: String,
    },
    /// The `(dimension, title)` identity was already attempted this run.
    Duplicate,
    /// Impact/effort ratio below the configured minimum.
    LowRoi {
        /// Computed ratio.
        roi: f64,
        /// Required minimum.
        min: f64,
    },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::AvoidedTarget { target } => write!(f, "avoided target '{target}'"),
            RejectReason::Duplicate => write!(f, "already attempted this run"),
            RejectReason::LowRoi { roi, min } => {
                write!(f, "roi {roi:.2} below minimum {min:.2}")
            }
        }
    }
}

/// A rejected recommendation with its reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RejectedRecommendation {
    /// The recommendation that was turned down.
    pub recommendation: Recommendation,
    /// Why.
    pub reason: RejectReason,
}

/// The filter's verdict over one cycle's fresh recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FilterOutcome {
    /// Approved recommendations, sorted by descending ROI. This ordering is
    /// the priority order the implement stage aggregates results in.
    pub approved: Vec<Recommendation>,
    /// Rejected recommendations with reasons.
    pub rejected: Vec<RejectedRecommendation>,
}

impl FilterOutcome {
    /// Whether this cycle left the run with nothing new to explore: no
    /// approvals, and every rejection was an avoided target or a duplicate.
    /// ROI rejections do not count as exhaustion on their own because a later
    /// analysis may re-score the same idea differently.
    pub fn options_exhausted(&self) -> bool {
        self.approved.is_empty()
            && self.rejected.iter().all(|r| {
                matches!(
                    r.reason,
                    RejectReason::AvoidedTarget { .. } | RejectReason::Duplicate
                )
            })
    }
}

/// The policy gate applied to every fresh recommendation before planning.
#[derive(Debug, Clone)]
pub struct RecommendationFilter {
    min_roi_ratio: f64,
}

impl RecommendationFilter {
    /// Create a filter with the given minimum impact/effort ratio.
    pub fn new(min_roi_ratio: f64) -> Self {
        Self { min_roi_ratio }
    }

    /// Apply the three ordered checks to each recommendation.
    pub fn filter(&self, recommendations: Vec<Recommendation>, memory: &RunMemory) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for recommendation in recommendations {
            match self.check(&recommendation, memory) {
                None => outcome.approved.push(recommendation),
                Some(reason) => {
                    tracing::debug!(
                        title = %recommendation.title,
                        reason = %reason,
                        "rejected recommendation"
                    );
                    outcome.rejected.push(RejectedRecommendation {
                        recommendation,
                        reason,
                    });
                }
            }
        }

        // Descending ROI; ties broken by title for determinism.
        outcome.approved.sort_by(|a, b| {
            b.roi()
                .partial_cmp(&a.roi())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.title.cmp(&b.title))
        });

        tracing::info!(
            approved = outcome.approved.len(),
            rejected = outcome.rejected.len(),
            "filtered recommendations"
        );
        outcome
    }

    /// Run the ordered checks for one recommendation. `None` means approved.
    fn check(&self, recommendation: &Recommendation, memory: &RunMemory) -> Option<RejectReason> {
        // 1. Target avoidance
        if let Some(target) = memory.matching_avoided_target(&recommendation.searchable_text()) {
            return Some(RejectReason::AvoidedTarget {
                target: target.to_string(),
            });
        }

        // 2. Duplicate identity
        if memory.has_attempted(&recommendation.identity()) {
            return Some(RejectReason::Duplicate);
        }

        // 3. ROI gate
        let roi = recommendation.roi();
        if roi < self.min_roi_ratio {
            return Some(RejectReason::LowRoi {
                roi,
                min: self.min_roi_ratio,
            });
        }

        None
    }
}
