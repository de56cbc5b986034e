//! Infrastructure layer: configuration loading, run persistence, and the
//! concrete capture and build implementations.

pub mod build;
pub mod capture;
pub mod config;
pub mod logging;
pub mod persistence;
