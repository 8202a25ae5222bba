//! RFC-3339 coercion for feed-supplied timestamps.
//!
//! `feed-rs` already applies its own lenient date parsing for the common RSS
//! (RFC-2822) and Atom (RFC-3339) cases, so by the time a timestamp reaches
//! this module it is usually already a valid [`DateTime<Utc>`]. This module
//! covers the remaining two situations the spec calls out explicitly: a raw
//! string that needs a tolerant reparse (including the non-standard `UT`
//! zone abbreviation), and the case where no usable timestamp exists at all.

use chrono::{DateTime, Utc};

/// Attempt to coerce an arbitrary date string into RFC-3339/UTC.
///
/// Tries, in order: strict RFC-3339, strict RFC-2822, then RFC-2822 with the
/// non-standard `UT` zone abbreviation rewritten to `UTC` (the one tolerance
/// scenario this pipeline is required to support).
pub fn coerce_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if trimmed.ends_with(" UT") {
        let rewritten = format!("{}C", trimmed);
        if let Ok(dt) = DateTime::parse_from_rfc2822(&rewritten) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    None
}

/// Resolve an entry timestamp, preferring the already-parsed `DateTime` and
/// falling back to a tolerant reparse of the raw source text when feed-rs
/// itself failed to parse it (e.g. the non-standard `UT` zone abbreviation).
pub fn resolve_timestamp(parsed: Option<DateTime<Utc>>, raw: Option<&str>) -> Option<DateTime<Utc>> {
    parsed.or_else(|| raw.and_then(coerce_rfc3339))
}

/// Resolve an optional timestamp to a concrete RFC-3339 instant, substituting
/// the current UTC time (and logging) when none is available.
pub fn rfc3339_or_now(dt: Option<DateTime<Utc>>, context: &str) -> DateTime<Utc> {
    match dt {
        Some(dt) => dt,
        None => {
            tracing::warn!(context = %context, "no usable timestamp, substituting current time");
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_rfc3339() {
        let dt = coerce_rfc3339("2024-01-01T12:00:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn parses_rfc2822() {
        let dt = coerce_rfc3339("Mon, 01 Jan 2024 12:00:00 GMT").unwrap();
        assert_eq!(dt.format("%Y-%m-%dT%H:%M:%S").to_string(), "2024-01-01T12:00:00");
    }

    #[test]
    fn coerces_ut_zone_abbreviation_to_utc() {
        let dt = coerce_rfc3339("Mon, 01 Jan 2024 12:00:00 UT").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn unparseable_input_returns_none() {
        assert!(coerce_rfc3339("not a date").is_none());
    }

    #[test]
    fn falls_back_to_now_when_absent() {
        let before = Utc::now();
        let dt = rfc3339_or_now(None, "test");
        assert!(dt >= before);
    }

    #[test]
    fn passes_through_when_present() {
        let dt = coerce_rfc3339("2024-06-01T00:00:00Z").unwrap();
        assert_eq!(rfc3339_or_now(Some(dt), "test"), dt);
    }

    #[test]
    fn resolve_timestamp_prefers_parsed_over_raw() {
        let parsed = coerce_rfc3339("2024-06-01T00:00:00Z").unwrap();
        let resolved = resolve_timestamp(Some(parsed), Some("Mon, 01 Jan 2024 12:00:00 UT"));
        assert_eq!(resolved, Some(parsed));
    }

    #[test]
    fn resolve_timestamp_falls_back_to_raw_coercion() {
        let resolved = resolve_timestamp(None, Some("Mon, 01 Jan 2024 12:00:00 UT"));
        assert_eq!(resolved.unwrap().to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn resolve_timestamp_none_when_both_absent() {
        assert_eq!(resolve_timestamp(None, None), None);
    }
}
