//! Feed invariant validation: the last gate before publication.
//!
//! The diff engine is built so these can never fire; the validator exists
//! because "built so" is not "checked". A violation aborts the cycle with
//! nothing written.

use std::collections::HashSet;

use diffdelta_utils::error::EngineError;

use crate::narrative::MAX_NARRATIVE_WORDS;
use crate::risk::{FLAG_THRESHOLD, MAX_REASONS};
use crate::types::{DeltaItem, FeedDocument};

const MAX_SUMMARY_CHARS: usize = 1200;

/// Check every feed invariant. `scope` names the document in errors.
pub fn validate_feed(scope: &str, feed: &FeedDocument) -> Result<(), EngineError> {
    if !feed.changed && feed.cursor != feed.prev_cursor {
        return Err(EngineError::CursorInstability {
            scope: scope.to_string(),
            cursor: feed.cursor.as_str().to_string(),
            prev_cursor: feed.prev_cursor.as_str().to_string(),
        });
    }

    if feed.ttl_sec < 1 {
        return Err(EngineError::ItemInvariant {
            scope: scope.to_string(),
            reason: "ttl_sec must be >= 1".to_string(),
        });
    }

    for (name, status) in &feed.sources {
        if !status.changed && status.cursor != status.prev_cursor {
            return Err(EngineError::CursorInstability {
                scope: format!("{scope}/sources/{name}"),
                cursor: status.cursor.as_str().to_string(),
                prev_cursor: status.prev_cursor.as_str().to_string(),
            });
        }
    }

    let flagged_ids: HashSet<(&str, &str)> = feed
        .buckets
        .flagged
        .iter()
        .map(|i| (i.source.as_str(), i.id.as_str()))
        .collect();

    for (bucket, items) in [
        ("new", &feed.buckets.new),
        ("updated", &feed.buckets.updated),
        ("removed", &feed.buckets.removed),
    ] {
        for item in items {
            if flagged_ids.contains(&(item.source.as_str(), item.id.as_str())) {
                return Err(EngineError::BucketInvariant {
                    scope: scope.to_string(),
                    reason: format!(
                        "item {}/{} appears in both '{bucket}' and 'flagged'",
                        item.source, item.id
                    ),
                });
            }
            if item.risk.score >= FLAG_THRESHOLD {
                return Err(EngineError::BucketInvariant {
                    scope: scope.to_string(),
                    reason: format!(
                        "item {}/{} with risk {} escaped quarantine into '{bucket}'",
                        item.source, item.id, item.risk.score
                    ),
                });
            }
        }
    }

    for item in feed
        .buckets
        .new
        .iter()
        .chain(&feed.buckets.updated)
        .chain(&feed.buckets.removed)
        .chain(&feed.buckets.flagged)
    {
        validate_item(scope, item)?;
    }

    let words = feed.batch_narrative.split_whitespace().count();
    if words > MAX_NARRATIVE_WORDS {
        return Err(EngineError::NarrativeInvariant {
            scope: scope.to_string(),
            reason: format!("{words} words exceeds the {MAX_NARRATIVE_WORDS}-word bound"),
        });
    }
    if !feed.batch_narrative.ends_with('.') {
        return Err(EngineError::NarrativeInvariant {
            scope: scope.to_string(),
            reason: "narrative must end with '.' or '...'".to_string(),
        });
    }

    Ok(())
}

fn validate_item(scope: &str, item: &DeltaItem) -> Result<(), EngineError> {
    let fail = |reason: String| EngineError::ItemInvariant {
        scope: scope.to_string(),
        reason,
    };

    if !(0.0..=1.0).contains(&item.risk.score) {
        return Err(fail(format!(
            "item {}/{}: risk score {} out of [0, 1]",
            item.source, item.id, item.risk.score
        )));
    }
    if item.risk.reasons.len() > MAX_REASONS {
        return Err(fail(format!(
            "item {}/{}: {} risk reasons exceeds {MAX_REASONS}",
            item.source,
            item.id,
            item.risk.reasons.len()
        )));
    }
    if item.summary.is_empty() {
        return Err(fail(format!("item {}/{}: empty summary", item.source, item.id)));
    }
    if item.summary.chars().count() > MAX_SUMMARY_CHARS {
        return Err(fail(format!(
            "item {}/{}: summary exceeds {MAX_SUMMARY_CHARS} code points",
            item.source, item.id
        )));
    }
    if item.provenance.evidence_urls.is_empty() {
        return Err(fail(format!(
            "item {}/{}: no evidence urls",
            item.source, item.id
        )));
    }

    Ok(())
}
