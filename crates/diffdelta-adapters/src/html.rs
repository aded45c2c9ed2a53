//! HTML page adapter driven by CSS selectors.
//!
//! Two extraction modes, selected by configuration: `selector_item` names a
//! per-item container whose title/content/date are picked out by the other
//! selectors; without it, `selector_title` alone is applied across the page
//! and each match becomes an item. Relative links are resolved against the
//! page URL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use diffdelta_config::AdapterSettings;

use crate::extract::{best_effort_id, best_effort_times, best_effort_url, first_string, truncate_chars};
use crate::http::{HttpClient, RequestOptions};
use crate::item::{FetchOutcome, NormalizedItem, RawItem};
use crate::SourceAdapter;

pub struct HtmlAdapter {
    source: String,
    settings: AdapterSettings,
}

impl HtmlAdapter {
    #[must_use]
    pub fn new(source: &str, settings: AdapterSettings) -> Self {
        Self {
            source: source.to_string(),
            settings,
        }
    }

    /// Synchronous extraction over the fetched document. Kept free of the
    /// async path so the parsed DOM never crosses an await point.
    fn extract_items(&self, page_url: &str, body: &str) -> Result<Vec<RawItem>, String> {
        let document = Html::parse_document(body);
        let base = Url::parse(page_url).ok();
        let link_selector = Selector::parse("a[href]").expect("static selector");

        let parse_selector = |spec: &str| -> Result<Selector, String> {
            Selector::parse(spec).map_err(|e| format!("decode: invalid selector '{spec}': {e:?}"))
        };

        let mut items = Vec::new();

        if let Some(item_spec) = self.settings.selector_item.as_deref() {
            let item_selector = parse_selector(item_spec)?;
            let title_selector = self
                .settings
                .selector_title
                .as_deref()
                .map(parse_selector)
                .transpose()?;
            let content_selector = self
                .settings
                .selector_content
                .as_deref()
                .map(parse_selector)
                .transpose()?;
            let date_selector = self
                .settings
                .selector_date
                .as_deref()
                .map(parse_selector)
                .transpose()?;

            for container in document.select(&item_selector).take(self.settings.max_items) {
                let mut raw = RawItem::new();

                if let Some(selector) = &title_selector {
                    raw.insert(
                        "title".to_string(),
                        Value::String(select_text(container, selector)),
                    );
                }
                if let Some(selector) = &content_selector {
                    raw.insert(
                        "content".to_string(),
                        Value::String(select_text(container, selector)),
                    );
                }
                if let Some(selector) = &date_selector {
                    raw.insert(
                        "published".to_string(),
                        Value::String(select_text(container, selector)),
                    );
                }

                if let Some(href) = first_href(container, &link_selector) {
                    raw.insert(
                        "link".to_string(),
                        Value::String(resolve_link(base.as_ref(), &href)),
                    );
                }

                let has_text = ["title", "content"].iter().any(|k| {
                    raw.get(*k)
                        .and_then(Value::as_str)
                        .map_or(false, |s| !s.is_empty())
                });
                if has_text {
                    items.push(raw);
                }
            }
        } else if let Some(title_spec) = self.settings.selector_title.as_deref() {
            let title_selector = parse_selector(title_spec)?;

            for element in document.select(&title_selector).take(self.settings.max_items) {
                let mut raw = RawItem::new();
                raw.insert("title".to_string(), Value::String(element_text(element)));

                if let Some(href) = first_href(element, &link_selector) {
                    raw.insert(
                        "link".to_string(),
                        Value::String(resolve_link(base.as_ref(), &href)),
                    );
                }

                items.push(raw);
            }
        }

        Ok(items)
    }
}

/// Concatenated, per-fragment-trimmed element text.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

fn select_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn first_href(scope: ElementRef<'_>, link_selector: &Selector) -> Option<String> {
    if let Some(href) = scope.value().attr("href") {
        return Some(href.to_string());
    }
    scope
        .select(link_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

fn resolve_link(base: Option<&Url>, href: &str) -> String {
    match base {
        Some(base) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

#[async_trait]
impl SourceAdapter for HtmlAdapter {
    fn source(&self) -> &str {
        &self.source
    }

    fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    async fn fetch(&self, http: &HttpClient) -> FetchOutcome {
        let Some(page_url) = self.settings.url.as_deref() else {
            return FetchOutcome::fail(0, "No url specified");
        };

        let response = match http.get(page_url, &RequestOptions::default()).await {
            Ok(response) => response,
            Err(msg) => return FetchOutcome::fail(0, msg),
        };

        if response.status != 200 {
            return FetchOutcome::fail(response.status, format!("HTTP {}", response.status));
        }

        let body = String::from_utf8_lossy(&response.body).into_owned();
        match self.extract_items(page_url, &body) {
            Ok(items) => FetchOutcome::ok(items, response.status),
            Err(msg) => FetchOutcome::fail(0, msg),
        }
    }

    fn normalize(&self, raw: &RawItem, fetched_at: DateTime<Utc>) -> NormalizedItem {
        let id = best_effort_id(raw);
        let url = best_effort_url(raw);
        let (published_at, updated_at) = best_effort_times(raw, fetched_at);

        let title = first_string(raw, &["title"]).map(|t| truncate_chars(&t, 200));
        let content = first_string(raw, &["content"]).unwrap_or_default();

        NormalizedItem {
            source: self.source.clone(),
            id,
            url,
            title,
            published_at,
            updated_at,
            content,
        }
    }
}
