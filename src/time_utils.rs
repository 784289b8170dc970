// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp with any offset into UTC.
pub fn parse_rfc3339_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offsets_normalize_to_z() {
        let parsed = parse_rfc3339_utc("2025-01-01T10:00:00-08:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 18, 0, 0).unwrap());
        assert_eq!(format_utc_rfc3339(parsed), "2025-01-01T18:00:00Z");
    }

    #[test]
    fn non_rfc3339_is_rejected() {
        assert!(parse_rfc3339_utc("2025-01-01 10:00").is_none());
        assert!(parse_rfc3339_utc("").is_none());
    }
}
