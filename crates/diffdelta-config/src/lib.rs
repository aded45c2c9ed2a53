//! Fleet configuration: the `sources.config.json` model.
//!
//! The config file is a single JSON object `{"sources": {<id>: {...}}}`.
//! Source declaration order is significant — the orchestrator processes
//! sources in the order they appear — so the map is deserialized through
//! `serde_json`'s order-preserving map.
//!
//! Loading distinguishes two failure classes. Malformed files and invalid
//! source ids fail the load (the cycle cannot start). Per-source problems
//! that the cycle can survive — unknown adapter tag, missing `paths.latest`
//! on an enabled source — are *not* load failures; they surface as
//! `status=error` for that source while the rest of the fleet proceeds.

use std::fs;

use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use diffdelta_utils::error::ConfigError;

/// Source ids are lowercase alphanumerics and underscores.
static SOURCE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-z0-9_]+$").unwrap());

/// Reserved for the fleet-state global record; never a valid source id.
const RESERVED_GLOBAL: &str = "_global";

/// Default TTL advertised in feeds, seconds.
pub const DEFAULT_TTL_SEC: u64 = 60;

/// Hard cap on items per source; part of the source-hash truncation
/// contract, so values above it are clamped at load.
pub const MAX_ITEMS_CAP: usize = 50;

/// Adapter selection tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Json,
    Rss,
    Html,
    MoltbookLegacy,
}

impl AdapterKind {
    /// Parse an adapter tag, accepting the legacy aliases
    /// (`github_api`/`github_releases` → json, `moltbook` →
    /// moltbook-legacy).
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "json" | "github_api" | "github_releases" => Some(Self::Json),
            "rss" => Some(Self::Rss),
            "html" => Some(Self::Html),
            "moltbook-legacy" | "moltbook" => Some(Self::MoltbookLegacy),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Rss => "rss",
            Self::Html => "html",
            Self::MoltbookLegacy => "moltbook-legacy",
        }
    }
}

/// Adapter-specific settings bag. Unknown keys are tolerated and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterSettings {
    /// Feed TTL in seconds; clamped to ≥ 1.
    #[serde(default = "default_ttl")]
    pub ttl_sec: u64,

    /// Item cap; clamped to `MAX_ITEMS_CAP`.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Environment variable holding a bearer credential.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// JSON / Moltbook endpoint.
    #[serde(default)]
    pub api_url: Option<String>,

    /// RSS/Atom endpoint.
    #[serde(default)]
    pub feed_url: Option<String>,

    /// HTML page URL.
    #[serde(default)]
    pub url: Option<String>,

    /// CSS selector for per-item containers.
    #[serde(default)]
    pub selector_item: Option<String>,

    /// CSS selector for item titles.
    #[serde(default)]
    pub selector_title: Option<String>,

    /// CSS selector for item content.
    #[serde(default)]
    pub selector_content: Option<String>,

    /// CSS selector for item dates.
    #[serde(default)]
    pub selector_date: Option<String>,
}

fn default_ttl() -> u64 {
    DEFAULT_TTL_SEC
}

fn default_max_items() -> usize {
    MAX_ITEMS_CAP
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            ttl_sec: DEFAULT_TTL_SEC,
            max_items: MAX_ITEMS_CAP,
            api_key_env: None,
            api_url: None,
            feed_url: None,
            url: None,
            selector_item: None,
            selector_title: None,
            selector_content: None,
            selector_date: None,
        }
    }
}

/// Output paths for one source.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourcePaths {
    /// Relative path of the per-source feed, e.g.
    /// `diff/source/rss_demo/latest.json`. Required when enabled.
    #[serde(default)]
    pub latest: Option<String>,
}

/// Configuration for a single source. Immutable per cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Raw adapter tag; resolved through [`AdapterKind::parse`] at cycle
    /// time so an unknown tag degrades to a per-source error.
    #[serde(default)]
    pub adapter: Option<String>,

    #[serde(default)]
    pub config: AdapterSettings,

    #[serde(default)]
    pub paths: SourcePaths,
}

impl SourceConfig {
    /// Resolved adapter kind, if the tag is present and known.
    #[must_use]
    pub fn adapter_kind(&self) -> Option<AdapterKind> {
        self.adapter.as_deref().and_then(AdapterKind::parse)
    }
}

/// The whole fleet, in declaration order.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    sources: Vec<(String, SourceConfig)>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    sources: serde_json::Map<String, serde_json::Value>,
}

impl FleetConfig {
    /// Load and validate a config file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_string(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        Self::from_str_named(&content, path.as_str())
    }

    /// Parse from a JSON string; `origin` is used in error messages.
    pub fn from_str_named(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;

        let mut issues = Vec::new();
        let mut sources = Vec::with_capacity(raw.sources.len());

        for (id, value) in raw.sources {
            if !SOURCE_ID_RE.is_match(&id) {
                issues.push(format!(
                    "source '{id}': ids must match [a-z0-9_]+"
                ));
                continue;
            }
            if id == RESERVED_GLOBAL {
                issues.push(format!("source '{id}': reserved name"));
                continue;
            }

            match serde_json::from_value::<SourceConfig>(value) {
                Ok(mut config) => {
                    if config.config.ttl_sec == 0 {
                        warn!(source = %id, "ttl_sec 0 clamped to 1");
                        config.config.ttl_sec = 1;
                    }
                    if config.config.max_items == 0 || config.config.max_items > MAX_ITEMS_CAP {
                        warn!(
                            source = %id,
                            max_items = config.config.max_items,
                            "max_items clamped to {MAX_ITEMS_CAP}"
                        );
                        config.config.max_items =
                            config.config.max_items.clamp(1, MAX_ITEMS_CAP);
                    }
                    sources.push((id, config));
                }
                Err(e) => issues.push(format!("source '{id}': {e}")),
            }
        }

        if issues.is_empty() {
            Ok(Self { sources })
        } else {
            Err(ConfigError::Invalid { issues })
        }
    }

    /// Sources in declaration order.
    #[must_use]
    pub fn sources(&self) -> &[(String, SourceConfig)] {
        &self.sources
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }
}
