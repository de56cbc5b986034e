//! Domain layer for the Burnish refinement loop.
//!
//! Contains the pure data model of a refinement run (recommendations, change
//! plans, verification and reflection results, run memory), the error
//! taxonomy, and the port traits the control loop consumes collaborators
//! through.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{RefineError, RefineResult};
