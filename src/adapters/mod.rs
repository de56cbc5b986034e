//! Adapter implementations of the external-capability ports.

pub mod mock;
