//! Error taxonomy for the fleet engine.
//!
//! Kinds, not transport details: configuration errors are fatal to one
//! source, transport and decode failures flow through the adapter outcome
//! channel (they are *data*, not `Err`), and invariant violations abort the
//! cycle before anything is published.

use thiserror::Error;

/// Top-level error type returned by engine operations.
#[derive(Error, Debug)]
pub enum DiffDeltaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine invariant violation: {0}")]
    Engine(#[from] EngineError),

    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    Missing { path: String },

    #[error("Failed to read config file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid configuration:\n{}", issues.join("\n"))]
    Invalid { issues: Vec<String> },
}

/// Invariant violations. These are programmer errors: the engine must not
/// publish anything once one is detected.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cursor instability in {scope}: changed=false but cursor moved ({prev_cursor} -> {cursor})")]
    CursorInstability {
        scope: String,
        cursor: String,
        prev_cursor: String,
    },

    #[error("Bucket invariant violated in {scope}: {reason}")]
    BucketInvariant { scope: String, reason: String },

    #[error("Item invariant violated in {scope}: {reason}")]
    ItemInvariant { scope: String, reason: String },

    #[error("Narrative invariant violated in {scope}: {reason}")]
    NarrativeInvariant { scope: String, reason: String },

    #[error("Canonical encoding failed: {reason}")]
    Canonical { reason: String },
}

impl EngineError {
    /// Wrap a canonicalization failure with its cause chain flattened.
    #[must_use]
    pub fn canonical(err: &anyhow::Error) -> Self {
        Self::Canonical {
            reason: format!("{err:#}"),
        }
    }
}

/// Failures while writing published artifacts.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Failed to serialize document for {path}: {reason}")]
    Serialize { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Failed to read existing document {path}: {reason}")]
    Read { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_path() {
        let err = ConfigError::Missing {
            path: "/tmp/sources.config.json".into(),
        };
        assert!(err.to_string().contains("/tmp/sources.config.json"));
    }

    #[test]
    fn invalid_config_lists_all_issues() {
        let err = ConfigError::Invalid {
            issues: vec!["source 'A B': invalid id".into(), "source 'x': no adapter".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid id"));
        assert!(msg.contains("no adapter"));
    }

    #[test]
    fn cursor_instability_shows_both_cursors() {
        let err = EngineError::CursorInstability {
            scope: "rss_demo".into(),
            cursor: "sha256:aa".into(),
            prev_cursor: "sha256:bb".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sha256:aa"));
        assert!(msg.contains("sha256:bb"));
    }

    #[test]
    fn errors_roll_up_into_top_level() {
        let err: DiffDeltaError = ConfigError::Missing { path: "x".into() }.into();
        assert!(matches!(err, DiffDeltaError::Config(_)));
    }
}
