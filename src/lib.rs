//! diffdelta: a deterministic, polling-driven change-detection engine.
//!
//! The engine turns heterogeneous upstream publishers (JSON APIs,
//! RSS/Atom feeds, HTML pages) into hash-addressed delta feeds with a
//! strict bot contract: a caller polling with its previous cursor either
//! sees "no change" with the cursor untouched, or a payload whose
//! invariants are strong enough to drive automated action.
//!
//! This crate is the facade: the pieces live in focused workspace crates.

pub mod cli;

pub use diffdelta_adapters as adapters;
pub use diffdelta_config as config;
pub use diffdelta_emit as emit;
pub use diffdelta_engine as engine;
pub use diffdelta_orchestrator as orchestrator;
pub use diffdelta_state as state;
pub use diffdelta_utils as utils;

pub use diffdelta_utils::exit_codes::ExitCode;
pub use diffdelta_utils::{GENERATOR_VERSION, SCHEMA_VERSION};
