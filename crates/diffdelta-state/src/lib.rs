//! Fleet state: what the engine remembers between cycles.
//!
//! One JSON document (`diff/_state.json`) maps each source to its last
//! observed hash, cursor, and success/error timestamps, plus a `_global`
//! record for the aggregate cursor. The orchestrator is the only writer;
//! the file is written atomically, last in the cycle.

use std::collections::BTreeMap;
use std::fs;

use serde::{Deserialize, Serialize};

use diffdelta_utils::atomic_write::write_file_atomic;
use diffdelta_utils::error::EmitError;

/// Per-source memory. All fields optional: a source that has never
/// succeeded has no hash, a source that has never failed has no error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<String>,
}

/// The aggregate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub last_cursor: String,
    pub last_run_at: String,
}

/// The persisted fleet document: `_global` plus one entry per source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetState {
    #[serde(rename = "_global", default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalState>,
    #[serde(flatten)]
    pub sources: BTreeMap<String, SourceState>,
}

/// Partial update produced by one source's cycle. Only set fields are
/// merged; an error cycle never clears the last good hash or cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub last_hash: Option<String>,
    pub last_cursor: Option<String>,
    pub last_success_at: Option<String>,
    pub last_error: Option<String>,
    pub last_error_at: Option<String>,
}

impl StateDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl FleetState {
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceState> {
        self.sources.get(name)
    }

    /// Merge a per-source delta. Unset fields leave prior values intact.
    pub fn apply(&mut self, source: &str, delta: &StateDelta) {
        if delta.is_empty() {
            return;
        }
        let entry = self.sources.entry(source.to_string()).or_default();
        if let Some(v) = &delta.last_hash {
            entry.last_hash = Some(v.clone());
        }
        if let Some(v) = &delta.last_cursor {
            entry.last_cursor = Some(v.clone());
        }
        if let Some(v) = &delta.last_success_at {
            entry.last_success_at = Some(v.clone());
        }
        if let Some(v) = &delta.last_error {
            entry.last_error = Some(v.clone());
        }
        if let Some(v) = &delta.last_error_at {
            entry.last_error_at = Some(v.clone());
        }
    }
}

/// Loads and saves the fleet state file.
#[derive(Debug, Clone)]
pub struct FleetStateStore {
    path: camino::Utf8PathBuf,
}

impl FleetStateStore {
    #[must_use]
    pub fn new(path: impl Into<camino::Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load prior state; a missing file is an empty fleet.
    pub fn load(&self) -> Result<FleetState, EmitError> {
        if !self.path.exists() {
            return Ok(FleetState::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| EmitError::Read {
            path: self.path.to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| EmitError::Read {
            path: self.path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Persist atomically.
    pub fn save(&self, state: &FleetState) -> Result<(), EmitError> {
        let mut content =
            serde_json::to_string_pretty(state).map_err(|e| EmitError::Serialize {
                path: self.path.to_string(),
                reason: e.to_string(),
            })?;
        content.push('\n');
        write_file_atomic(&self.path, &content).map_err(|e| EmitError::Write {
            path: self.path.to_string(),
            reason: format!("{e:#}"),
        })
    }
}
