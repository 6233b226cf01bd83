// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Fixed offset for `utc_offset_minutes`; out-of-range offsets mean UTC.
fn fixed_offset(utc_offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// Calendar date of `now` as seen at a fixed UTC offset (in minutes).
pub fn local_date(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    now.with_timezone(&fixed_offset(utc_offset_minutes)).date_naive()
}

/// `[start, end)` of the calendar month containing `date`, as RFC3339 UTC strings.
///
/// Bounds are midnight at the given UTC offset, converted back to UTC.
pub fn month_bounds_rfc3339(date: NaiveDate, utc_offset_minutes: i32) -> (String, String) {
    let first = date.with_day(1).unwrap_or(date);
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .unwrap_or(first);

    let offset_secs = fixed_offset(utc_offset_minutes).local_minus_utc();
    let to_utc = |d: NaiveDate| {
        let midnight = d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        format_utc_rfc3339(midnight - chrono::Duration::seconds(offset_secs.into()))
    };

    (to_utc(first), to_utc(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_date_applies_offset() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 2, 30, 0).unwrap();
        assert_eq!(local_date(now, 0), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        // UTC-7: still May 31st locally
        assert_eq!(
            local_date(now, -7 * 60),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );
    }

    #[test]
    fn test_month_bounds_wrap_year() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let (start, end) = month_bounds_rfc3339(date, 0);
        assert_eq!(start, "2024-12-01T00:00:00Z");
        assert_eq!(end, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn test_month_bounds_with_offset() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let (start, end) = month_bounds_rfc3339(date, 120);
        assert_eq!(start, "2024-05-31T22:00:00Z");
        assert_eq!(end, "2024-06-30T22:00:00Z");
    }

    #[test]
    fn test_out_of_range_offset_is_utc_everywhere() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 2, 30, 0).unwrap();
        assert_eq!(local_date(now, 5000), local_date(now, 0));

        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(month_bounds_rfc3339(date, 5000), month_bounds_rfc3339(date, 0));
    }
}
