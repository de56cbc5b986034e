//! Control-loop services.
//!
//! Leaf-first: the memory store and snapshot store are pure state containers,
//! the filter is a pure policy gate, planner/executor/verifier/reflection are
//! per-stage services, and the iteration controller sequences them all.

pub mod controller;
pub mod executor;
pub mod filter;
pub mod memory;
pub mod planner;
pub mod reflection;
pub mod snapshots;
pub mod verifier;

pub use controller::{Collaborators, IterationController, LoopPhase};
pub use executor::{ChangeExecutor, ExecutionOutcome};
pub use filter::{FilterOutcome, RecommendationFilter, RejectReason};
pub use memory::MemoryStore;
pub use planner::{ChangePlanner, PlanBatch};
pub use reflection::ReflectionEngine;
pub use snapshots::SnapshotStore;
pub use verifier::VerificationEngine;
