//! Foundation utilities for the diffdelta fleet engine.
//!
//! Everything here is deliberately small and dependency-light: canonical
//! JSON encoding and hashing (the invariant every other crate trusts),
//! atomic file writes, RFC 3339 time helpers, the output path layout, exit
//! codes, logging setup, and the shared error taxonomy.

pub mod atomic_write;
pub mod canonical;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;
pub mod time;

/// Schema version stamped into every emitted document.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Generator identifier stamped into telemetry.
pub const GENERATOR_VERSION: &str = concat!("fleet-engine/", env!("CARGO_PKG_VERSION"));
