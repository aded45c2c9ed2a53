//! RFC 3339 UTC time helpers.
//!
//! Every timestamp the engine emits is UTC at second precision with a `Z`
//! suffix. Parsing is lenient (RFC 3339 first, RFC 2822 for feed dates) and
//! failure is reported as `None` — the substitution policy for unparseable
//! upstream times lives in the normalizer, not here.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current UTC time, truncated to whole seconds.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Format as RFC 3339 UTC with second precision and `Z` suffix.
#[must_use]
pub fn to_rfc3339_utc(dt: DateTime<Utc>) -> String {
    dt.trunc_subsecs(0).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an upstream timestamp string.
///
/// Accepts RFC 3339 (with `Z` or numeric offset) and RFC 2822 (RSS
/// `pubDate`). Anything else is `None`.
#[must_use]
pub fn parse_lenient(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_z_suffix_and_second_precision() {
        let dt = parse_lenient("2026-03-01T12:34:56.789Z").unwrap();
        assert_eq!(to_rfc3339_utc(dt), "2026-03-01T12:34:56Z");
    }

    #[test]
    fn parses_numeric_offsets_to_utc() {
        let dt = parse_lenient("2026-03-01T12:34:56+02:00").unwrap();
        assert_eq!(to_rfc3339_utc(dt), "2026-03-01T10:34:56Z");
    }

    #[test]
    fn parses_rfc2822_pubdate() {
        let dt = parse_lenient("Sun, 01 Mar 2026 12:34:56 GMT").unwrap();
        assert_eq!(to_rfc3339_utc(dt), "2026-03-01T12:34:56Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_lenient("yesterday").is_none());
        assert!(parse_lenient("").is_none());
        assert!(parse_lenient("   ").is_none());
    }

    #[test]
    fn now_is_whole_seconds() {
        let now = now_utc();
        assert_eq!(now.timestamp_subsec_nanos(), 0);
    }
}
