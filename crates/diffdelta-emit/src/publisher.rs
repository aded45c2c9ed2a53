//! Document publication.
//!
//! Feeds are written as 2-space-indented JSON with a trailing newline —
//! readable on disk, while every hash goes through canonical bytes, so
//! disk formatting never affects a cursor. Each write is atomic.

use camino::Utf8Path;
use serde::Serialize;

use diffdelta_utils::atomic_write::write_file_atomic;
use diffdelta_utils::error::EmitError;

/// Render a document the way it appears on disk.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    Ok(content)
}

/// Serialize and atomically publish one document.
pub fn write_json_document<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), EmitError> {
    let content = to_pretty_json(value).map_err(|e| EmitError::Serialize {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    write_file_atomic(path, &content).map_err(|e| EmitError::Write {
        path: path.to_string(),
        reason: format!("{e:#}"),
    })
}
