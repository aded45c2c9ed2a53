//! Feed assembly: per-source and global documents.

use std::collections::BTreeMap;

use diffdelta_utils::SCHEMA_VERSION;

use crate::cursor::Cursor;
use crate::narrative::{batch_narrative, NarrativeInput};
use crate::types::{Buckets, FeedDocument, PerSourceResult, SourceStatus};

/// Scope label for the global feed's narrative.
pub const GLOBAL_SCOPE: &str = "fleet";

/// TTL advertised on the global feed.
pub const GLOBAL_TTL_SEC: u64 = 60;

fn narrative_input<'a>(result: &'a PerSourceResult, buckets: &'a Buckets) -> NarrativeInput<'a> {
    match result.status {
        SourceStatus::Disabled => NarrativeInput::Disabled,
        SourceStatus::Error => NarrativeInput::Error {
            message: result.error.as_deref().unwrap_or("Unknown error"),
        },
        SourceStatus::Ok => {
            if result.changed {
                NarrativeInput::Changes { buckets }
            } else {
                NarrativeInput::NoChange
            }
        }
    }
}

/// Build the per-source feed document. Emitted for every configured
/// source every cycle — disabled and error sources get a schema-valid
/// document with empty buckets and a preserved cursor.
#[must_use]
pub fn source_feed(source: &str, result: &PerSourceResult, generated_at: &str) -> FeedDocument {
    let buckets = result.buckets.clone().unwrap_or_default();
    let narrative = batch_narrative(source, &narrative_input(result, &buckets));

    let mut sources = BTreeMap::new();
    sources.insert(source.to_string(), result.to_status());

    FeedDocument {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at: generated_at.to_string(),
        cursor: result.cursor.clone(),
        prev_cursor: result.prev_cursor.clone(),
        changed: result.changed,
        ttl_sec: result.ttl_sec,
        sources_included: vec![source.to_string()],
        batch_narrative: narrative,
        sources,
        buckets,
    }
}

/// Build the global aggregate over every source's result, in declaration
/// order. Buckets merge only from changed sources; the `sources` map
/// carries every source so clients can detect per-path skew.
#[must_use]
pub fn global_feed(
    results: &[(String, PerSourceResult)],
    cursor: Cursor,
    prev_cursor: Cursor,
    changed: bool,
    generated_at: &str,
) -> FeedDocument {
    let mut buckets = Buckets::default();
    for (_, result) in results {
        if result.changed {
            if let Some(source_buckets) = &result.buckets {
                buckets.extend_from(source_buckets);
            }
        }
    }

    let narrative = if changed {
        batch_narrative(GLOBAL_SCOPE, &NarrativeInput::Changes { buckets: &buckets })
    } else {
        batch_narrative(GLOBAL_SCOPE, &NarrativeInput::NoChange)
    };

    let mut sources_included: Vec<String> =
        results.iter().map(|(name, _)| name.clone()).collect();
    sources_included.sort_unstable();

    let sources: BTreeMap<_, _> = results
        .iter()
        .map(|(name, result)| (name.clone(), result.to_status()))
        .collect();

    FeedDocument {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at: generated_at.to_string(),
        cursor,
        prev_cursor,
        changed,
        ttl_sec: GLOBAL_TTL_SEC,
        sources_included,
        batch_narrative: narrative,
        sources,
        buckets,
    }
}
