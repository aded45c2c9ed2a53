//! The diff engine and its feed model.
//!
//! Pure throughout: given the previous fleet state and one cycle's
//! normalized items, this crate decides what changed, scores integrity
//! risk, assigns buckets under the quarantine rule, derives cursors that
//! honor the stability invariant, and assembles the documents the
//! publisher writes. The only side effects live in `diffdelta-emit`.

pub mod assemble;
pub mod cursor;
pub mod diff;
pub mod narrative;
pub mod risk;
pub mod types;
pub mod validate;

pub use cursor::Cursor;
pub use risk::{Risk, FLAG_THRESHOLD};
pub use types::{
    Buckets, DeltaItem, FeedDocument, PerSourceResult, PerSourceStatus, Provenance, SourceStatus,
};
