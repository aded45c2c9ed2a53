//! Feed document model: the schema every emitted file follows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cursor::Cursor;
use crate::risk::Risk;

/// Per-source processing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Disabled,
    Error,
}

impl SourceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Disabled => "disabled",
            Self::Error => "error",
        }
    }
}

/// Where an item came from and how to verify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub fetched_at: String,
    pub evidence_urls: Vec<String>,
    pub content_hash: String,
}

/// One classified change, as it appears inside a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaItem {
    pub source: String,
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub published_at: String,
    pub updated_at: String,
    pub signals: Vec<String>,
    pub action_items: Vec<String>,
    pub summary: String,
    pub risk: Risk,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_payload: Option<Value>,
}

/// The four ordered item lists of a feed. All four are always present,
/// even when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buckets {
    pub new: Vec<DeltaItem>,
    pub updated: Vec<DeltaItem>,
    pub removed: Vec<DeltaItem>,
    pub flagged: Vec<DeltaItem>,
}

impl Buckets {
    /// Changes excluding quarantined items.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.new.len() + self.updated.len() + self.removed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0 && self.flagged.is_empty()
    }

    /// Append another source's buckets, preserving order.
    pub fn extend_from(&mut self, other: &Buckets) {
        self.new.extend(other.new.iter().cloned());
        self.updated.extend(other.updated.iter().cloned());
        self.removed.extend(other.removed.iter().cloned());
        self.flagged.extend(other.flagged.iter().cloned());
    }
}

/// One source's row in a feed's `sources` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerSourceStatus {
    pub changed: bool,
    pub cursor: Cursor,
    pub prev_cursor: Cursor,
    pub ttl_sec: u64,
    pub status: SourceStatus,
    pub error: Option<String>,
}

/// A complete feed document: the engine's unit of publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDocument {
    pub schema_version: String,
    pub generated_at: String,
    pub cursor: Cursor,
    pub prev_cursor: Cursor,
    pub changed: bool,
    pub ttl_sec: u64,
    pub sources_included: Vec<String>,
    pub batch_narrative: String,
    pub sources: BTreeMap<String, PerSourceStatus>,
    pub buckets: Buckets,
}

/// The diff engine's answer for one source, before feed assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct PerSourceResult {
    pub status: SourceStatus,
    pub changed: bool,
    pub cursor: Cursor,
    pub prev_cursor: Cursor,
    pub ttl_sec: u64,
    pub error: Option<String>,
    /// Present on `ok` results; `None` for disabled/error sources (the
    /// assembler substitutes empty buckets).
    pub buckets: Option<Buckets>,
}

impl PerSourceResult {
    /// Project into the `sources` map row of a feed document.
    #[must_use]
    pub fn to_status(&self) -> PerSourceStatus {
        PerSourceStatus {
            changed: self.changed,
            cursor: self.cursor.clone(),
            prev_cursor: self.prev_cursor.clone(),
            ttl_sec: self.ttl_sec,
            status: self.status,
            error: self.error.clone(),
        }
    }
}
