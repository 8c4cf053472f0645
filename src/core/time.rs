//! Shared timestamp/event-id helpers.
//!
//! The data model (`spec.md` §3) requires RFC 3339 timestamps, not bare
//! epoch seconds, because documents round-trip through the browser
//! workspace (see `SPEC_FULL.md` §3). ULIDs remain the event/id scheme.

use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;

/// Current instant as an RFC 3339 string, e.g. `2026-07-28T20:14:03.512Z`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Parse a previously-stamped RFC 3339 string back into a `DateTime<Utc>`.
/// Unparseable input (e.g. a hand-edited document) is treated as "infinitely
/// stale" rather than an error — callers computing freshness windows
/// (heartbeats, §4.H) should fail open toward "not fresh", not panic.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Seconds elapsed between a previously-stamped instant and now. Returns
/// `None` if the timestamp doesn't parse.
pub fn age_seconds(ts: &str) -> Option<i64> {
    let then = parse_rfc3339(ts)?;
    Some((Utc::now() - then).num_seconds().max(0))
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Parse a schedule item's `YYYY-MM-DD` due date. Unparseable/missing
/// dates are "unscheduled" per `spec.md` §4.E, not an error.
pub fn parse_due_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_rfc3339_round_trips() {
        let ts = now_rfc3339();
        assert!(parse_rfc3339(&ts).is_some());
    }

    #[test]
    fn new_event_id_is_unique_and_valid_ulid() {
        let a = new_event_id();
        let b = new_event_id();
        assert_ne!(a, b);
        assert!(Ulid::from_string(&a).is_ok());
    }

    #[test]
    fn age_seconds_none_for_garbage() {
        assert_eq!(age_seconds("not-a-timestamp"), None);
    }

    #[test]
    fn parse_due_date_rejects_bad_format() {
        assert!(parse_due_date("2026/02/05").is_none());
        assert!(parse_due_date("2026-02-05").is_some());
    }
}
