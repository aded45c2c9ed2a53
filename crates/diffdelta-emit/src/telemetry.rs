//! Per-run telemetry: one record per configured source.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use diffdelta_utils::canonical::sha256_str;
use diffdelta_utils::error::EmitError;
use diffdelta_utils::{GENERATOR_VERSION, SCHEMA_VERSION};

use crate::publisher::write_json_document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTelemetry {
    pub ok: bool,
    pub status_code: u16,
    pub duration_ms: u64,
    pub items_fetched: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitTelemetry {
    pub changed: bool,
    pub new: usize,
    pub updated: usize,
    pub removed: usize,
    pub flagged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTelemetry {
    pub cursor: String,
    pub prev_cursor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub run_id: String,
    pub source: String,
    pub fetch: FetchTelemetry,
    pub emit: EmitTelemetry,
    pub state: StateTelemetry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryDoc {
    pub schema_version: String,
    pub run_id: String,
    pub generated_at: String,
    pub generator: String,
    pub records: Vec<TelemetryRecord>,
}

/// Deterministic run identifier: a digest prefix over the cycle timestamp
/// and the configured source set. Replayable; no randomness.
#[must_use]
pub fn run_id(generated_at: &str, source_names: &[&str]) -> String {
    let seed = format!("{generated_at}\n{}", source_names.join("\n"));
    format!("run-{}", &sha256_str(&seed)[..16])
}

impl TelemetryDoc {
    #[must_use]
    pub fn new(run_id: String, generated_at: &str, records: Vec<TelemetryRecord>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            generated_at: generated_at.to_string(),
            generator: GENERATOR_VERSION.to_string(),
            records,
        }
    }
}

/// Write the cycle's telemetry document.
pub fn write_telemetry(path: &Utf8Path, doc: &TelemetryDoc) -> Result<(), EmitError> {
    write_json_document(path, doc)
}
