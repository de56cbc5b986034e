//! Port trait definitions (hexagonal architecture).
//!
//! These async traits are the narrow interfaces the control loop consumes its
//! collaborators through. Implementations live outside the core: real ones in
//! the surrounding system, process-backed ones in `infrastructure`, and
//! deterministic mocks in `adapters::mock` for dry runs and tests.
//!
//! Every response coming back through a port is treated as untrusted and is
//! validated before the loop acts on it.

pub mod analyzer;
pub mod build_runner;
pub mod capture;
pub mod implementer;
pub mod reflector;

pub use analyzer::{Analysis, Analyzer, Issue, MemoryContext};
pub use build_runner::{BuildOutput, BuildRunner};
pub use capture::{ArtifactSnapshot, Capture, LiveSession};
pub use implementer::{FileSnapshot, Implementer};
pub use reflector::{CycleSummary, Reflector};
