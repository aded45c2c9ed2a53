//! Canonical JSON encoding and SHA-256 hashing.
//!
//! Every hash in the protocol — content hashes, source hashes, cursors —
//! is SHA-256 over RFC 8785 (JCS) canonical JSON bytes: object keys sorted
//! at every level, `","`/`":"` separators with no whitespace, UTF-8
//! preserved without gratuitous escaping. Semantically equal values encode
//! to byte-identical output, so permuting input keys can never move a
//! cursor.
//!
//! NaN and infinities are unrepresentable: `serde_json` refuses to build a
//! `Value` from them, so they are rejected upstream of this module.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Encode a value as canonical JSON bytes (RFC 8785).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let json_value =
        serde_json::to_value(value).with_context(|| "Failed to serialize value to JSON")?;
    serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize JSON (RFC 8785)")
}

/// Hex-encoded SHA-256 over raw bytes.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex-encoded SHA-256 over a UTF-8 string.
#[must_use]
pub fn sha256_str(s: &str) -> String {
    sha256_hex(s.as_bytes())
}

/// Hex-encoded SHA-256 over the canonical JSON encoding of a value.
///
/// This is the composition every protocol hash goes through.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String> {
    Ok(sha256_hex(&canonical_json(value)?))
}
