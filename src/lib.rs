//! Burnish - Iterative Artifact Refinement Loop
//!
//! Burnish drives a web UI project toward a quality target through repeated
//! analyze/filter/implement/verify/reflect cycles, applying small auditable
//! single-line edits and remembering what it already tried.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, policies, and the ports external
//!   capabilities plug into
//! - **Service Layer** (`services`): The control loop and its stage engines
//! - **Infrastructure Layer** (`infrastructure`): Configuration, persistence,
//!   logging, and process-backed capabilities
//! - **Adapters** (`adapters`): Concrete port implementations
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use burnish::services::IterationController;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Assemble collaborators and drive a run
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    ChangeOp, ChangePlan, Config, CycleRecord, PlannedChange, Recommendation, ReflectionResult,
    RunMemory, RunReport, StopReason, Trend, VerificationResult,
};
pub use domain::ports::{
    Analysis, Analyzer, ArtifactSnapshot, BuildOutput, BuildRunner, Capture, CycleSummary,
    FileSnapshot, Implementer, LiveSession, MemoryContext, Reflector,
};
pub use domain::{RefineError, RefineResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Collaborators, IterationController, LoopPhase};
