//! JSON API adapter (GitHub releases and similar endpoints).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use diffdelta_config::AdapterSettings;

use crate::extract::{best_effort_id, best_effort_times, best_effort_url, first_string, truncate_chars};
use crate::http::{HttpClient, RequestOptions};
use crate::item::{FetchOutcome, NormalizedItem, RawItem};
use crate::SourceAdapter;

/// Container keys probed when the response is an object rather than a
/// bare list.
const CONTAINER_KEYS: &[&str] = &["items", "releases", "data", "results", "posts"];

const TITLE_KEYS: &[&str] = &["title", "name", "tag_name"];
const CONTENT_KEYS: &[&str] = &["body", "content", "description"];

pub struct JsonAdapter {
    source: String,
    settings: AdapterSettings,
}

impl JsonAdapter {
    #[must_use]
    pub fn new(source: &str, settings: AdapterSettings) -> Self {
        Self {
            source: source.to_string(),
            settings,
        }
    }
}

/// Pull an item list out of an arbitrary JSON response shape: a bare
/// list, an object with a known container key, or a single item.
pub(crate) fn extract_item_list(data: Value, max_items: usize) -> Vec<RawItem> {
    let values = match data {
        Value::Array(values) => values,
        Value::Object(object) => {
            let container = CONTAINER_KEYS
                .iter()
                .find_map(|k| object.get(*k).and_then(Value::as_array).cloned());
            match container {
                Some(values) => values,
                None => vec![Value::Object(object)],
            }
        }
        _ => Vec::new(),
    };

    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .take(max_items)
        .collect()
}

/// Shared normalization for JSON-shaped raw items (also used by the
/// Moltbook legacy adapter).
pub(crate) fn normalize_json_item(
    source: &str,
    raw: &RawItem,
    fetched_at: DateTime<Utc>,
) -> NormalizedItem {
    let id = best_effort_id(raw);
    let url = best_effort_url(raw);
    let (published_at, updated_at) = best_effort_times(raw, fetched_at);

    let title = first_string(raw, TITLE_KEYS).map(|t| truncate_chars(&t, 200));
    let content = first_string(raw, CONTENT_KEYS).unwrap_or_default();

    NormalizedItem {
        source: source.to_string(),
        id,
        url,
        title,
        published_at,
        updated_at,
        content,
    }
}

#[async_trait]
impl SourceAdapter for JsonAdapter {
    fn source(&self) -> &str {
        &self.source
    }

    fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    async fn fetch(&self, http: &HttpClient) -> FetchOutcome {
        let Some(api_url) = self.settings.api_url.as_deref() else {
            return FetchOutcome::fail(0, "No api_url specified");
        };

        let options = RequestOptions {
            accept_json: true,
            bearer_env: self.settings.api_key_env.clone(),
        };

        let response = match http.get(api_url, &options).await {
            Ok(response) => response,
            Err(msg) => return FetchOutcome::fail(0, msg),
        };

        if response.status != 200 {
            return FetchOutcome::fail(response.status, format!("HTTP {}", response.status));
        }

        let data: Value = match serde_json::from_slice(&response.body) {
            Ok(data) => data,
            Err(e) => return FetchOutcome::fail(0, format!("decode: {e}")),
        };

        FetchOutcome::ok(extract_item_list(data, self.settings.max_items), response.status)
    }

    fn normalize(&self, raw: &RawItem, fetched_at: DateTime<Utc>) -> NormalizedItem {
        normalize_json_item(&self.source, raw, fetched_at)
    }
}
