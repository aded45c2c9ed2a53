//! The diff engine: change classification and cursor assignment.
//!
//! Pure functions from (previous state, this cycle's items) to a
//! [`PerSourceResult`] and a state delta. The only rule that matters more
//! than any other: **`changed=false` implies the cursor is byte-equal to
//! the previous cursor.** Everything here is arranged so that invariant
//! falls out by construction, and the validator re-checks it before
//! anything touches disk.

use serde_json::Value;

use diffdelta_adapters::NormalizedItem;
use diffdelta_state::{SourceState, StateDelta};
use diffdelta_utils::canonical::hash_value;
use diffdelta_utils::error::EngineError;
use diffdelta_utils::SCHEMA_VERSION;

use crate::cursor::Cursor;
use crate::risk;
use crate::types::{Buckets, DeltaItem, PerSourceResult, Provenance, SourceStatus};

/// One source's inputs on the changed path.
pub struct SourceCycle<'a> {
    pub source: &'a str,
    pub ttl_sec: u64,
    /// RFC 3339 fetch timestamp, shared by every item this cycle.
    pub fetched_at: &'a str,
    pub http_status: u16,
    pub items: &'a [NormalizedItem],
    /// Opaque upstream remainders, parallel to `items`.
    pub payloads: &'a [Option<Value>],
    pub prev: Option<&'a SourceState>,
}

/// Hex SHA-256 over canonical `{title, content, url}` with surrounding
/// whitespace stripped. Stable across cycles iff the three fields are
/// byte-equal after stripping.
pub fn content_hash(item: &NormalizedItem) -> Result<String, EngineError> {
    let canonical = serde_json::json!({
        "title": item.title.as_deref().unwrap_or("").trim(),
        "content": item.content.trim(),
        "url": item.url.trim(),
    });
    hash_value(&canonical).map_err(|e| EngineError::canonical(&e))
}

/// Keep the first occurrence of each id, preserving adapter order.
#[must_use]
pub fn dedup_first_by_id(
    items: Vec<NormalizedItem>,
    payloads: Vec<Option<Value>>,
) -> (Vec<NormalizedItem>, Vec<Option<Value>>) {
    let mut seen = std::collections::HashSet::new();
    let mut kept_items = Vec::with_capacity(items.len());
    let mut kept_payloads = Vec::with_capacity(payloads.len());

    for (item, payload) in items.into_iter().zip(payloads.into_iter()) {
        if seen.insert(item.id.clone()) {
            kept_items.push(item);
            kept_payloads.push(payload);
        }
    }
    (kept_items, kept_payloads)
}

fn prev_cursor_of(prev: Option<&SourceState>) -> Cursor {
    Cursor::from_stored(prev.and_then(|s| s.last_cursor.as_deref()))
}

/// Result for a disabled source: cursor preserved, no buckets, no state
/// change.
#[must_use]
pub fn disabled_result(prev: Option<&SourceState>, ttl_sec: u64) -> PerSourceResult {
    let cursor = prev_cursor_of(prev);
    PerSourceResult {
        status: SourceStatus::Disabled,
        changed: false,
        cursor: cursor.clone(),
        prev_cursor: cursor,
        ttl_sec,
        error: None,
        buckets: None,
    }
}

/// Result for a configuration, transport, or decode failure: cursor
/// preserved, error recorded in state, cycle continues.
#[must_use]
pub fn error_result(
    prev: Option<&SourceState>,
    ttl_sec: u64,
    error: String,
    error_at: &str,
) -> (PerSourceResult, StateDelta) {
    let cursor = prev_cursor_of(prev);
    let result = PerSourceResult {
        status: SourceStatus::Error,
        changed: false,
        cursor: cursor.clone(),
        prev_cursor: cursor,
        ttl_sec,
        error: Some(error.clone()),
        buckets: None,
    };
    let delta = StateDelta {
        last_error: Some(error),
        last_error_at: Some(error_at.to_string()),
        ..StateDelta::default()
    };
    (result, delta)
}

fn unchanged_result(ttl_sec: u64, cursor: Cursor) -> PerSourceResult {
    PerSourceResult {
        status: SourceStatus::Ok,
        changed: false,
        cursor: cursor.clone(),
        prev_cursor: cursor,
        ttl_sec,
        error: None,
        buckets: Some(Buckets::default()),
    }
}

/// Classify a successfully fetched cycle.
///
/// Inputs must already be deduplicated ([`dedup_first_by_id`]) and
/// truncated to the source's item cap; `source_hash` is the adapter's
/// hash over exactly these items.
pub fn process_cycle(
    cycle: &SourceCycle<'_>,
    source_hash: &str,
) -> Result<(PerSourceResult, StateDelta), EngineError> {
    let prev_cursor = prev_cursor_of(cycle.prev);
    let prev_hash = cycle.prev.and_then(|s| s.last_hash.as_deref());

    // An empty fetch against known history is silence, not mass removal.
    if cycle.items.is_empty() && prev_hash.is_some() {
        let delta = StateDelta {
            last_success_at: Some(cycle.fetched_at.to_string()),
            ..StateDelta::default()
        };
        return Ok((unchanged_result(cycle.ttl_sec, prev_cursor), delta));
    }

    // Change-only muting: identical content hash short-circuits the cycle.
    if prev_hash == Some(source_hash) {
        let delta = StateDelta {
            last_hash: Some(source_hash.to_string()),
            last_cursor: Some(prev_cursor.as_str().to_string()),
            last_success_at: Some(cycle.fetched_at.to_string()),
            ..StateDelta::default()
        };
        return Ok((unchanged_result(cycle.ttl_sec, prev_cursor), delta));
    }

    // Changed path: every item becomes a delta item; quarantined items go
    // only to `flagged`, everything else to `new`. The `updated` and
    // `removed` buckets are structural in this evaluator version — item
    // level update detection needs a durable per-item hash map that the
    // cursor must never depend on.
    let mut buckets = Buckets::default();
    let mut cursor_items: Vec<Value> = Vec::with_capacity(cycle.items.len());

    for (index, item) in cycle.items.iter().enumerate() {
        let assessment = risk::evaluate(item, false, cycle.http_status);
        let item_hash = content_hash(item)?;
        let payload = cycle.payloads.get(index).cloned().flatten();

        cursor_items.push(serde_json::json!({
            "id": item.id,
            "url": item.url,
            "title": item.title.as_deref().unwrap_or(""),
            "content_hash": item_hash,
        }));

        let delta_item = DeltaItem {
            source: item.source.clone(),
            id: item.id.clone(),
            url: item.url.clone(),
            title: item.title.clone(),
            published_at: item.published_at.clone(),
            updated_at: item.updated_at.clone(),
            signals: Vec::new(),
            action_items: Vec::new(),
            summary: item
                .title
                .clone()
                .unwrap_or_else(|| "Update detected.".to_string()),
            risk: assessment.clone(),
            provenance: Provenance {
                fetched_at: cycle.fetched_at.to_string(),
                evidence_urls: vec![item.url.clone()],
                content_hash: item_hash,
            },
            source_payload: payload,
        };

        if assessment.is_flagged() {
            buckets.flagged.push(delta_item);
        } else {
            buckets.new.push(delta_item);
        }
    }

    cursor_items.sort_by(|a, b| {
        let a_id = a.get("id").and_then(Value::as_str).unwrap_or("");
        let b_id = b.get("id").and_then(Value::as_str).unwrap_or("");
        a_id.cmp(b_id)
    });

    // The canonical payload excludes wall-clock timing by construction.
    let payload = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "sources_included": [cycle.source],
        "items": cursor_items,
    });
    let cursor = Cursor::from_payload(&payload)?;

    let delta = StateDelta {
        last_hash: Some(source_hash.to_string()),
        last_cursor: Some(cursor.as_str().to_string()),
        last_success_at: Some(cycle.fetched_at.to_string()),
        ..StateDelta::default()
    };

    let result = PerSourceResult {
        status: SourceStatus::Ok,
        changed: true,
        cursor,
        prev_cursor,
        ttl_sec: cycle.ttl_sec,
        error: None,
        buckets: Some(buckets),
    };

    Ok((result, delta))
}

/// Canonical payload and cursor for the global feed.
pub fn global_cursor(
    results: &[(String, PerSourceResult)],
) -> Result<Cursor, EngineError> {
    let mut sources_included: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
    sources_included.sort_unstable();

    let sources: serde_json::Map<String, Value> = results
        .iter()
        .map(|(name, result)| {
            (
                name.clone(),
                serde_json::json!({
                    "changed": result.changed,
                    "cursor": result.cursor.as_str(),
                }),
            )
        })
        .collect();

    let payload = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "sources_included": sources_included,
        "sources": sources,
    });
    Cursor::from_payload(&payload)
}
