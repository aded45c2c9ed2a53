//! Publication: the engine's only side effects.
//!
//! Feeds, fleet state, known issues, and telemetry all leave the process
//! through this crate, each file written atomically (temp + fsync +
//! rename) so readers only ever observe committed documents.

pub mod known_issues;
pub mod publisher;
pub mod telemetry;

pub use known_issues::{fetch_failed_issue, update_known_issues, KnownIssue, KnownIssuesDoc};
pub use publisher::{to_pretty_json, write_json_document};
pub use telemetry::{
    run_id, write_telemetry, EmitTelemetry, FetchTelemetry, StateTelemetry, TelemetryDoc,
    TelemetryRecord,
};
