//! Output path layout.
//!
//! All published artifacts hang off a single root directory. The layout is
//! constructed once and threaded by value through the orchestrator — file
//! paths are never resolved through globals.

use camino::{Utf8Path, Utf8PathBuf};

/// Resolved output layout for one engine run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Default configuration path: `<root>/sources.config.json`.
    #[must_use]
    pub fn default_config(&self) -> Utf8PathBuf {
        self.root.join("sources.config.json")
    }

    /// Global feed: `<root>/diff/latest.json`. Written only on change.
    #[must_use]
    pub fn global_feed(&self) -> Utf8PathBuf {
        self.root.join("diff").join("latest.json")
    }

    /// Fleet state: `<root>/diff/_state.json`.
    #[must_use]
    pub fn fleet_state(&self) -> Utf8PathBuf {
        self.root.join("diff").join("_state.json")
    }

    /// Known issues: `<root>/known_issues.json`.
    #[must_use]
    pub fn known_issues(&self) -> Utf8PathBuf {
        self.root.join("known_issues.json")
    }

    /// Telemetry: `<root>/telemetry/latest.json`.
    #[must_use]
    pub fn telemetry(&self) -> Utf8PathBuf {
        self.root.join("telemetry").join("latest.json")
    }

    /// Resolve a per-source `paths.latest` value (relative to the root).
    #[must_use]
    pub fn source_feed(&self, latest: &str) -> Utf8PathBuf {
        self.root.join(latest)
    }
}
