//! Best-effort field extraction from raw upstream items.
//!
//! Upstream shapes vary wildly (GitHub uses `id`/`tag_name`/`html_url`,
//! RSS uses `guid`/`link`, bespoke APIs use `post_id`), so identity, URL,
//! and time extraction each walk an ordered precedence list of candidate
//! keys. The lists are part of each adapter's contract.

use chrono::{DateTime, Utc};
use serde_json::Value;

use diffdelta_utils::canonical::sha256_str;
use diffdelta_utils::time::{parse_lenient, to_rfc3339_utc};

use crate::item::RawItem;

const ID_KEYS: &[&str] = &["id", "post_id", "postId", "guid", "tag_name", "name"];
const URL_KEYS: &[&str] = &["url", "html_url", "link"];
const CREATED_KEYS: &[&str] = &["published_at", "created_at", "published", "pubDate", "date"];
const UPDATED_KEYS: &[&str] = &["updated_at", "updated"];

/// Render a scalar as a key string. Empty strings, zero, null, and `false`
/// do not count as usable values.
fn usable_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => {
            if n.as_i64() == Some(0) || n.as_u64() == Some(0) || n.as_f64() == Some(0.0) {
                None
            } else {
                Some(n.to_string())
            }
        }
        _ => None,
    }
}

fn first_usable(raw: &RawItem, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| raw.get(*k).and_then(usable_scalar))
}

/// Extract a stable item id.
///
/// Falls back to the low 128 bits of SHA-256 over `"{url}\n{title}"` when
/// no upstream key is usable.
#[must_use]
pub fn best_effort_id(raw: &RawItem) -> String {
    if let Some(id) = first_usable(raw, ID_KEYS) {
        return id;
    }
    let url = first_usable(raw, URL_KEYS).unwrap_or_default();
    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default();
    sha256_str(&format!("{url}\n{title}"))[..32].to_string()
}

/// Extract the canonical URL. An item with no usable URL key normalizes
/// to an empty URL, which the risk evaluator scores as `missing_url`.
#[must_use]
pub fn best_effort_url(raw: &RawItem) -> String {
    first_usable(raw, URL_KEYS).unwrap_or_default()
}

/// Extract `(published_at, updated_at)` as RFC 3339 UTC strings.
///
/// Unparseable or absent published time substitutes `fetched_at` — only at
/// normalization, never retroactively in state. `updated_at` falls back to
/// `published_at` and is clamped to never precede it.
#[must_use]
pub fn best_effort_times(raw: &RawItem, fetched_at: DateTime<Utc>) -> (String, String) {
    let created = first_usable(raw, CREATED_KEYS)
        .as_deref()
        .and_then(parse_lenient)
        .unwrap_or(fetched_at);

    let updated = first_usable(raw, UPDATED_KEYS)
        .as_deref()
        .and_then(parse_lenient)
        .map(|dt| dt.max(created))
        .unwrap_or(created);

    (to_rfc3339_utc(created), to_rfc3339_utc(updated))
}

/// Truncate to at most `n` code points.
#[must_use]
pub fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Pick a non-blank string value from an ordered key list.
#[must_use]
pub fn first_string(raw: &RawItem, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        raw.get(*k)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
