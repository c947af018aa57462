//! # Arena Library
//!
//! HTTP API, configuration, and operator commands of the Arena booking
//! service, exposed for the binary and for integration tests.

pub mod api;
pub mod cli;
pub mod config;

// Re-export arena_core for convenience
pub use arena_core;
