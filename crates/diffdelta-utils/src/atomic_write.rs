//! Atomic file publication: temp file + fsync + rename.
//!
//! Every document the engine emits goes through [`write_file_atomic`], so a
//! concurrent reader can never observe a partial write. The temp file is
//! created in the target's parent directory so the final rename stays on
//! one filesystem.

use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tempfile::NamedTempFile;

/// Atomically write `content` to `path`, creating parent directories.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;

    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temporary file for: {path}"))?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| format!("Failed to fsync temporary file for: {path}"))?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically rename into place: {path}"))?;

    Ok(())
}
