//! Known-issues emission.
//!
//! One document listing currently open issues. The file is rewritten only
//! when the issue *set* differs from what is on disk — timestamps alone
//! never cause a write, so an unchanging error does not bust downstream
//! caches every cycle. `first_seen_at` survives rewrites of the same
//! issue key.

use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use diffdelta_utils::canonical::hash_value;
use diffdelta_utils::error::EmitError;
use diffdelta_utils::SCHEMA_VERSION;

use crate::publisher::write_json_document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueScope {
    pub level: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownIssue {
    pub issue_key: String,
    pub status: String,
    pub severity: String,
    pub scope: IssueScope,
    pub summary: String,
    pub details: String,
    pub first_seen_at: String,
    pub last_updated_at: String,
    pub signals: Vec<String>,
    pub sources: Vec<String>,
    pub workarounds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownIssuesDoc {
    pub schema_version: String,
    pub generated_at: String,
    pub issues: Vec<KnownIssue>,
}

/// The issue recorded when a source's fetch fails.
#[must_use]
pub fn fetch_failed_issue(source: &str, error: &str, now: &str) -> KnownIssue {
    KnownIssue {
        issue_key: format!("{source}_fetch_failed"),
        status: "open".to_string(),
        severity: "error".to_string(),
        scope: IssueScope {
            level: "source".to_string(),
            reference: source.to_string(),
        },
        summary: format!("Fetch failed for {source}"),
        details: error.to_string(),
        first_seen_at: now.to_string(),
        last_updated_at: now.to_string(),
        signals: Vec::new(),
        sources: vec![source.to_string()],
        workarounds: Vec::new(),
    }
}

/// Timestamp-free fingerprint of an issue list.
fn fingerprint(issues: &[KnownIssue]) -> Result<String, EmitError> {
    let stripped: Vec<KnownIssue> = issues
        .iter()
        .map(|issue| KnownIssue {
            first_seen_at: String::new(),
            last_updated_at: String::new(),
            ..issue.clone()
        })
        .collect();
    hash_value(&stripped).map_err(|e| EmitError::Serialize {
        path: "known_issues".to_string(),
        reason: format!("{e:#}"),
    })
}

fn read_existing(path: &Utf8Path) -> Result<Option<KnownIssuesDoc>, EmitError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| EmitError::Read {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    // A corrupted known-issues file is replaced, not fatal.
    Ok(serde_json::from_str(&content).ok())
}

/// Reconcile the issue list with the document on disk.
///
/// Returns `true` when the file was (re)written.
pub fn update_known_issues(
    path: &Utf8Path,
    mut issues: Vec<KnownIssue>,
    generated_at: &str,
) -> Result<bool, EmitError> {
    issues.sort_by(|a, b| a.issue_key.cmp(&b.issue_key));

    let existing = read_existing(path)?;

    if let Some(existing_doc) = &existing {
        // Same issue set on disk: leave the file untouched.
        if fingerprint(&existing_doc.issues)? == fingerprint(&issues)? {
            return Ok(false);
        }
        // Carry first_seen_at forward across rewrites of the same key.
        for issue in &mut issues {
            if let Some(prior) = existing_doc
                .issues
                .iter()
                .find(|e| e.issue_key == issue.issue_key)
            {
                issue.first_seen_at = prior.first_seen_at.clone();
            }
        }
    }

    let doc = KnownIssuesDoc {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at: generated_at.to_string(),
        issues,
    };
    write_json_document(path, &doc)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn issues_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("known_issues.json")).unwrap()
    }

    #[test]
    fn first_write_creates_document() {
        let dir = TempDir::new().unwrap();
        let path = issues_path(&dir);

        let wrote = update_known_issues(&path, Vec::new(), "2026-06-01T00:00:00Z").unwrap();
        assert!(wrote);

        let doc: KnownIssuesDoc =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc.issues.is_empty());
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn unchanged_issue_set_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = issues_path(&dir);

        let issue = fetch_failed_issue("rss_demo", "HTTP 503", "2026-06-01T00:00:00Z");
        assert!(update_known_issues(&path, vec![issue.clone()], "2026-06-01T00:00:00Z").unwrap());

        let before = fs::read_to_string(&path).unwrap();

        // Same issue on a later cycle: different timestamps, same set.
        let later = fetch_failed_issue("rss_demo", "HTTP 503", "2026-06-01T01:00:00Z");
        let wrote =
            update_known_issues(&path, vec![later], "2026-06-01T01:00:00Z").unwrap();
        assert!(!wrote);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn first_seen_at_survives_detail_changes() {
        let dir = TempDir::new().unwrap();
        let path = issues_path(&dir);

        let original = fetch_failed_issue("s", "HTTP 503", "2026-06-01T00:00:00Z");
        update_known_issues(&path, vec![original], "2026-06-01T00:00:00Z").unwrap();

        // The failure mode changed, so the set differs and is rewritten.
        let evolved = fetch_failed_issue("s", "timeout: deadline elapsed", "2026-06-02T00:00:00Z");
        let wrote = update_known_issues(&path, vec![evolved], "2026-06-02T00:00:00Z").unwrap();
        assert!(wrote);

        let doc: KnownIssuesDoc =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.issues[0].first_seen_at, "2026-06-01T00:00:00Z");
        assert_eq!(doc.issues[0].details, "timeout: deadline elapsed");
    }

    #[test]
    fn resolved_issues_clear_the_document() {
        let dir = TempDir::new().unwrap();
        let path = issues_path(&dir);

        let issue = fetch_failed_issue("s", "HTTP 503", "2026-06-01T00:00:00Z");
        update_known_issues(&path, vec![issue], "2026-06-01T00:00:00Z").unwrap();

        let wrote = update_known_issues(&path, Vec::new(), "2026-06-02T00:00:00Z").unwrap();
        assert!(wrote);

        let doc: KnownIssuesDoc =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc.issues.is_empty());
    }

    #[test]
    fn issue_scope_serializes_ref_key() {
        let issue = fetch_failed_issue("s", "x", "2026-06-01T00:00:00Z");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["scope"]["ref"], "s");
        assert_eq!(json["issue_key"], "s_fetch_failed");
    }
}
