//! Item types flowing between adapters and the diff engine.

use serde::Serialize;

/// Raw upstream item, preserved verbatim for provenance. Opaque to the
/// engine except for the normalized projection the adapter extracts.
pub type RawItem = serde_json::Map<String, serde_json::Value>;

/// The canonical projection of one upstream item.
///
/// Timestamps are RFC 3339 UTC strings with second precision and a `Z`
/// suffix; `updated_at >= published_at` is enforced at normalization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedItem {
    pub source: String,
    pub id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub published_at: String,
    pub updated_at: String,
    pub content: String,
}

/// Result of one adapter fetch. This is the error channel: adapters never
/// return `Err` to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Raw items, already truncated to `max_items`. Empty on failure.
    pub items: Vec<RawItem>,
    /// HTTP status, or 0 when the request never completed.
    pub status: u16,
    /// Transport or decode failure, formatted `"<class>: <msg>"` or
    /// `"HTTP <n>"`.
    pub error: Option<String>,
}

impl FetchOutcome {
    #[must_use]
    pub fn ok(items: Vec<RawItem>, status: u16) -> Self {
        Self {
            items,
            status,
            error: None,
        }
    }

    #[must_use]
    pub fn fail(status: u16, error: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            status,
            error: Some(error.into()),
        }
    }

    /// True when the fetch produced a usable item list.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.status == 200
    }
}
