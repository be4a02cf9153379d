//! Timestamp codec for wire timestamps.
//!
//! The backend and older client builds emit modification timestamps in a
//! handful of formats. Parsing is a total function: every comparison inside
//! the sync engine runs on `DateTime<Utc>`, and a stamp that fails every
//! format resolves to the minimum representable instant. A record with a
//! corrupt or missing remote timestamp therefore always loses the
//! last-write-wins comparison and is overwritten by the device copy, never
//! the reverse.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Value assigned to unparseable timestamps.
pub const TIMESTAMP_SENTINEL: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Current instant, truncated to the codec's microsecond precision.
///
/// Mutation stamps must survive a wire or local-store round trip unchanged,
/// otherwise a re-read record would compare unequal to itself and the
/// engine would keep re-syncing it.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Accepted wire formats, tried in order. First success wins.
///
/// Each entry is (with explicit UTC offset, without offset); a trailing `Z`
/// and a missing offset both mean UTC.
const WIRE_FORMATS: [(&str, &str); 4] = [
    // ISO-8601 with fractional seconds
    ("%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f"),
    // ISO-8601 without fractional seconds
    ("%Y-%m-%dT%H:%M:%S%#z", "%Y-%m-%dT%H:%M:%S"),
    // Backend-native space-delimited, fractional seconds
    ("%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f"),
    // Backend-native space-delimited
    ("%Y-%m-%d %H:%M:%S%#z", "%Y-%m-%d %H:%M:%S"),
];

/// Parse a wire timestamp. Total: unparseable input yields the sentinel.
///
/// The result is truncated to microseconds, the precision the canonical
/// form carries. Without the truncation, a backend stamp with nanosecond
/// digits would compare newer than its own re-read canonical copy and the
/// record would be pulled again on every pass.
pub fn parse_timestamp(text: &str) -> DateTime<Utc> {
    let text = text.trim();
    for (with_offset, without_offset) in WIRE_FORMATS {
        if let Some(parsed) = try_parse(text, with_offset, without_offset) {
            return parsed.trunc_subsecs(6);
        }
    }
    TIMESTAMP_SENTINEL
}

/// Render the single canonical wire form: RFC 3339, microseconds, `Z`.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn try_parse(text: &str, with_offset: &str, without_offset: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_str(text, with_offset) {
        return Some(parsed.with_timezone(&Utc));
    }

    let bare = text.strip_suffix(['Z', 'z']).unwrap_or(text);
    NaiveDateTime::parse_from_str(bare, without_offset)
        .ok()
        .map(|naive| naive.and_utc())
}
