//! Risk evaluator v0: integrity checks only.
//!
//! A pure function of the normalized item and the transport outcome. No
//! keyword scanning, no semantic analysis — those belong to later
//! evaluator versions, behind the same score/reasons shape.

use serde::{Deserialize, Serialize};

use diffdelta_adapters::NormalizedItem;

/// Items at or above this score are quarantined: they appear in the
/// `flagged` bucket and nowhere else.
pub const FLAG_THRESHOLD: f64 = 0.4;

/// Maximum number of reason codes carried on one item.
pub const MAX_REASONS: usize = 10;

/// Bounded risk assessment attached to every delta item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub score: f64,
    pub reasons: Vec<String>,
}

impl Risk {
    /// True when the item must be quarantined.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.score >= FLAG_THRESHOLD
    }
}

/// Score an item. Contributions are additive and capped at 1.0:
///
/// | condition                     | score | reason            |
/// |-------------------------------|-------|-------------------|
/// | missing/blank title           | +0.2  | `missing_title`   |
/// | missing/blank url             | +0.2  | `missing_url`     |
/// | missing/blank content         | +0.2  | `missing_content` |
/// | transport failed or non-200   | +0.5  | `fetch_error`     |
#[must_use]
pub fn evaluate(item: &NormalizedItem, fetch_failed: bool, http_status: u16) -> Risk {
    let mut score = 0.0_f64;
    let mut reasons = Vec::new();

    if item.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        reasons.push("missing_title".to_string());
        score += 0.2;
    }

    if item.url.trim().is_empty() {
        reasons.push("missing_url".to_string());
        score += 0.2;
    }

    if item.content.trim().is_empty() {
        reasons.push("missing_content".to_string());
        score += 0.2;
    }

    if fetch_failed || http_status != 200 {
        reasons.push("fetch_error".to_string());
        score += 0.5;
    }

    reasons.truncate(MAX_REASONS);
    Risk {
        score: score.min(1.0),
        reasons,
    }
}
