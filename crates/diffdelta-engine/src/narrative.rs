//! Deterministic batch narratives.
//!
//! A narrative is derived only from bucket counts, a single leading title,
//! and the source status — never from content analysis. At most 30
//! whitespace-delimited words, with a `"..."` suffix when truncated.

use crate::types::Buckets;

/// Word cap on every narrative.
pub const MAX_NARRATIVE_WORDS: usize = 30;

/// Title excerpt length in the single-change form.
const TITLE_EXCERPT_CHARS: usize = 40;

/// What happened this cycle, narrative-wise.
pub enum NarrativeInput<'a> {
    Disabled,
    Error { message: &'a str },
    NoChange,
    Changes { buckets: &'a Buckets },
}

/// Render the narrative for one scope (a source id, or `fleet` for the
/// global feed).
#[must_use]
pub fn batch_narrative(scope: &str, input: &NarrativeInput<'_>) -> String {
    let text = match input {
        NarrativeInput::Disabled => format!("{scope}: Source disabled."),
        NarrativeInput::Error { message } => format!("{scope}: Error - {message}."),
        NarrativeInput::NoChange => format!("{scope}: No changes detected."),
        NarrativeInput::Changes { buckets } => changes_narrative(scope, buckets),
    };
    cap_words(&text, MAX_NARRATIVE_WORDS)
}

fn changes_narrative(scope: &str, buckets: &Buckets) -> String {
    let total = buckets.total_changes();
    let flagged = buckets.flagged.len();

    if total == 0 && flagged > 0 {
        let plural = if flagged == 1 { "item" } else { "items" };
        return format!("{scope}: {flagged} flagged {plural} detected.");
    }
    if total == 0 {
        return format!("{scope}: No changes detected.");
    }
    if total == 1 {
        let (kind, item) = if let Some(item) = buckets.new.first() {
            ("new", item)
        } else if let Some(item) = buckets.updated.first() {
            ("updated", item)
        } else {
            ("removed", &buckets.removed[0])
        };
        let label = item.title.as_deref().unwrap_or(item.summary.as_str());
        let excerpt: String = label.chars().take(TITLE_EXCERPT_CHARS).collect();
        return format!("{scope}: {kind} '{excerpt}'.");
    }

    let mut parts = Vec::new();
    if !buckets.new.is_empty() {
        parts.push(format!("{} new", buckets.new.len()));
    }
    if !buckets.updated.is_empty() {
        parts.push(format!("{} updated", buckets.updated.len()));
    }
    if !buckets.removed.is_empty() {
        parts.push(format!("{} removed", buckets.removed.len()));
    }

    let mut narrative = format!("{scope}: {total} changes ({})", parts.join(", "));
    if flagged > 0 {
        narrative.push_str(&format!(" {flagged} flagged"));
    }
    narrative.push('.');
    narrative
}

fn cap_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        text.to_string()
    } else {
        format!("{}...", words[..max_words].join(" "))
    }
}
