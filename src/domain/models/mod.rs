//! Domain models for the refinement loop.

pub mod config;
pub mod memory;
pub mod plan;
pub mod recommendation;
pub mod reflection;
pub mod report;
pub mod verification;

pub use config::{
    BuildConfig, Config, CycleConfig, FilterConfig, GrowthTier, LoggingConfig, PlannerConfig,
    SizePolicy,
};
pub use memory::{FailedChange, RunMemory, ScoreEntry};
pub use plan::{AppliedChange, ChangeKind, ChangeOp, ChangePlan, PlannedChange};
pub use recommendation::{EffortTier, Recommendation, RecommendationId};
pub use reflection::{ReflectionResult, Trend};
pub use report::{CycleRecord, RunReport, StopReason};
pub use verification::VerificationResult;
