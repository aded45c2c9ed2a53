//! Cursor algebra.
//!
//! A cursor is `"sha256:" + 64 hex` over the canonical JSON of a feed
//! payload; the all-zeros digest means "never observed". Cursors are
//! opaque to clients and to the engine itself — they are compared only by
//! string equality, never parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

use diffdelta_utils::canonical::hash_value;
use diffdelta_utils::error::EngineError;

const PREFIX: &str = "sha256:";
const ZERO_DIGEST: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// An opaque feed-state token. Equal cursors imply equal content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// The "never observed" sentinel.
    #[must_use]
    pub fn zero() -> Self {
        Self(format!("{PREFIX}{ZERO_DIGEST}"))
    }

    /// Derive a cursor from a canonical payload.
    pub fn from_payload<T: Serialize>(payload: &T) -> Result<Self, EngineError> {
        let digest = hash_value(payload).map_err(|e| EngineError::canonical(&e))?;
        Ok(Self(format!("{PREFIX}{digest}")))
    }

    /// Wrap a stored cursor string; empty or missing becomes the zero
    /// sentinel.
    #[must_use]
    pub fn from_stored(stored: Option<&str>) -> Self {
        match stored {
            Some(s) if !s.trim().is_empty() => Self(s.trim().to_string()),
            _ => Self::zero(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == Self::zero().0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
