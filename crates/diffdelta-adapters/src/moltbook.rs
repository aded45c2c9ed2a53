//! Moltbook legacy adapter: a JSON API variant that serves
//! `{"posts": [...]}` envelopes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use diffdelta_config::AdapterSettings;

use crate::http::{HttpClient, RequestOptions};
use crate::item::{FetchOutcome, NormalizedItem, RawItem};
use crate::json::normalize_json_item;
use crate::{default_source_payload, SourceAdapter};

pub struct MoltbookAdapter {
    source: String,
    settings: AdapterSettings,
}

impl MoltbookAdapter {
    #[must_use]
    pub fn new(source: &str, settings: AdapterSettings) -> Self {
        Self {
            source: source.to_string(),
            settings,
        }
    }
}

/// Collapse a `submolt`/`community` container object to stable scalars.
///
/// Nested community objects carry mutable counters that would churn the
/// emitted payload every cycle; only `submolt_id` and `submolt_name`
/// survive. This policy is part of the content contract and must not be
/// relaxed.
fn flatten_community(raw: &RawItem) -> RawItem {
    let mut flattened = raw.clone();
    for key in ["submolt", "community"] {
        // Scalar community refs are already stable; only objects collapse.
        if !matches!(flattened.get(key), Some(Value::Object(_))) {
            continue;
        }
        if let Some(Value::Object(container)) = flattened.remove(key) {
            if let Some(id) = container.get("id") {
                flattened.insert("submolt_id".to_string(), id.clone());
            }
            if let Some(name) = container.get("name") {
                flattened.insert("submolt_name".to_string(), name.clone());
            }
        }
    }
    flattened
}

#[async_trait]
impl SourceAdapter for MoltbookAdapter {
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

        // Accept either {"posts": [...]} or a bare list; anything else is
        // a decode failure.
        let values = match data {
            Value::Object(ref object) if object.get("posts").map_or(false, Value::is_array) => {
                object.get("posts").and_then(Value::as_array).cloned().unwrap_or_default()
            }
            Value::Array(values) => values,
            other => {
                let shape = match other {
                    Value::Object(_) => "object",
                    Value::String(_) => "string",
                    Value::Number(_) => "number",
                    Value::Bool(_) => "bool",
                    Value::Null => "null",
                    Value::Array(_) => unreachable!(),
                };
                return FetchOutcome::fail(
                    response.status,
                    format!("decode: unexpected response shape: {shape}"),
                );
            }
        };

        let items = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .take(self.settings.max_items)
            .collect();

        FetchOutcome::ok(items, response.status)
    }

    fn normalize(&self, raw: &RawItem, fetched_at: DateTime<Utc>) -> NormalizedItem {
        normalize_json_item(&self.source, raw, fetched_at)
    }

    fn source_payload(&self, raw: &RawItem) -> Option<Value> {
        default_source_payload(&flatten_community(raw))
    }
}
