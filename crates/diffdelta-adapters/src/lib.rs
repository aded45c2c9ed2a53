//! Source adapters: the pluggable boundary between heterogeneous upstream
//! publishers and the canonical item model.
//!
//! Every adapter exposes the same capability set — `fetch`, `normalize`,
//! `source_hash` — behind the [`SourceAdapter`] trait. Fetch performs
//! exactly one HTTP GET and reports all transport and decode failures
//! through the [`FetchOutcome`] error channel; it never raises to the
//! orchestrator. Normalization is deterministic and does no I/O.

mod extract;
mod html;
mod http;
mod item;
mod json;
mod moltbook;
mod rss;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use diffdelta_config::{AdapterKind, AdapterSettings};
use diffdelta_utils::canonical::hash_value;
use diffdelta_utils::error::EngineError;

pub use crate::html::HtmlAdapter;
pub use crate::http::{HttpClient, HttpResponse, RequestOptions, FETCH_TIMEOUT, USER_AGENT};
pub use crate::item::{FetchOutcome, NormalizedItem, RawItem};
pub use crate::json::JsonAdapter;
pub use crate::moltbook::MoltbookAdapter;
pub use crate::rss::RssAdapter;

pub use crate::extract::{best_effort_id, best_effort_times, best_effort_url, truncate_chars};

/// Normalized-projection keys stripped from raw items when deriving
/// `source_payload`.
const NORMALIZED_KEYS: &[&str] = &[
    "id",
    "post_id",
    "postId",
    "url",
    "title",
    "content",
    "created_at",
    "createdAt",
    "updated_at",
    "updatedAt",
];

/// Capability set every source adapter implements.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source id this adapter serves.
    fn source(&self) -> &str;

    fn settings(&self) -> &AdapterSettings;

    /// Perform the cycle's single upstream GET.
    async fn fetch(&self, http: &HttpClient) -> FetchOutcome;

    /// Project one raw item into the canonical model. Deterministic; no
    /// I/O; never fails.
    fn normalize(&self, raw: &RawItem, fetched_at: DateTime<Utc>) -> NormalizedItem;

    fn max_items(&self) -> usize {
        self.settings().max_items
    }

    /// Deterministic hash of this cycle's normalized content, driving the
    /// per-source change short circuit.
    fn source_hash(&self, items: &[NormalizedItem]) -> Result<String, EngineError> {
        source_hash(self.source(), items, self.max_items())
    }

    /// Opaque upstream remainder carried on delta items for provenance.
    ///
    /// An explicit `source_payload` key wins; otherwise the raw item minus
    /// its normalized projection, or nothing when that leaves no data.
    fn source_payload(&self, raw: &RawItem) -> Option<Value> {
        default_source_payload(raw)
    }
}

/// Hash of `{source, items: sort-by-id({id, url, title, content})}` over
/// canonical JSON, inputs truncated to `max_items` and whitespace-stripped.
pub fn source_hash(
    source: &str,
    items: &[NormalizedItem],
    max_items: usize,
) -> Result<String, EngineError> {
    let mut projected: Vec<Value> = items
        .iter()
        .take(max_items)
        .map(|item| {
            serde_json::json!({
                "id": item.id,
                "url": item.url,
                "title": item.title.as_deref().unwrap_or("").trim(),
                "content": item.content.trim(),
            })
        })
        .collect();
    projected.sort_by(|a, b| {
        let a_id = a.get("id").and_then(Value::as_str).unwrap_or("");
        let b_id = b.get("id").and_then(Value::as_str).unwrap_or("");
        a_id.cmp(b_id)
    });

    let payload = serde_json::json!({
        "source": source,
        "items": projected,
    });
    hash_value(&payload).map_err(|e| EngineError::canonical(&e))
}

pub(crate) fn default_source_payload(raw: &RawItem) -> Option<Value> {
    if let Some(explicit) = raw.get("source_payload") {
        if !explicit.is_null() {
            return Some(explicit.clone());
        }
    }

    let remainder: RawItem = raw
        .iter()
        .filter(|(k, _)| !NORMALIZED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if remainder.is_empty() {
        None
    } else {
        Some(Value::Object(remainder))
    }
}

/// Construct the adapter for a configured source.
#[must_use]
pub fn create_adapter(
    kind: AdapterKind,
    source: &str,
    settings: &AdapterSettings,
) -> Box<dyn SourceAdapter> {
    match kind {
        AdapterKind::Json => Box::new(JsonAdapter::new(source, settings.clone())),
        AdapterKind::Rss => Box::new(RssAdapter::new(source, settings.clone())),
        AdapterKind::Html => Box::new(HtmlAdapter::new(source, settings.clone())),
        AdapterKind::MoltbookLegacy => Box::new(MoltbookAdapter::new(source, settings.clone())),
    }
}
