//! Date window resolution for dashboard queries.
//!
//! Windows are anchored on the most recent timestamp in storage rather than
//! the wall clock, so a unit that stopped reporting still shows its last
//! day/week/month of data. Query bounds are whole UTC days: a "last 24 hours"
//! window ending at 2024-03-10T15:00Z filters `timestamp >= 2024-03-09 AND
//! timestamp <= 2024-03-10`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Symbolic range selected in the dashboard's `dateRange` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    Last24Hours,
    Last7Days,
    Last30Days,
    /// Anything else: use the explicit start date, if any.
    Custom,
}

impl RangeToken {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "last24hours" => RangeToken::Last24Hours,
            "last7days" => RangeToken::Last7Days,
            "last30days" => RangeToken::Last30Days,
            _ => RangeToken::Custom,
        }
    }

    /// Nominal length of the range, `None` for [`RangeToken::Custom`].
    pub fn duration(self) -> Option<Duration> {
        match self {
            RangeToken::Last24Hours => Some(Duration::hours(24)),
            RangeToken::Last7Days => Some(Duration::days(7)),
            RangeToken::Last30Days => Some(Duration::days(30)),
            RangeToken::Custom => None,
        }
    }
}

/// Window bounds before day truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Day-granular query bounds, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ResolvedWindow {
    pub fn to_days(self) -> DateWindow {
        DateWindow {
            start: self.start.date_naive(),
            end: self.end.date_naive(),
        }
    }
}

/// Parses a date query parameter. Returns `None` for empty or malformed input;
/// callers fall back to their defaults instead of reporting an error.
pub fn parse_date_param(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Computes the window for a request.
///
/// `end` is the explicit end date, else `latest`, else `now`. `start` follows
/// the range token; for a custom range it is the explicit start date (clamped
/// to `end`), falling back to 24 hours before `end`.
pub fn resolve_window(
    range: RangeToken,
    start_date: Option<&str>,
    end_date: Option<&str>,
    latest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ResolvedWindow {
    let end = end_date
        .and_then(parse_date_param)
        .or(latest)
        .unwrap_or(now);

    let start = match range.duration() {
        Some(span) => span_before(end, span),
        None => match start_date.and_then(parse_date_param) {
            Some(start) => start.min(end),
            None => span_before(end, Duration::hours(24)),
        },
    };

    ResolvedWindow { start, end }
}

// Dates near chrono's lower limit parse fine but cannot be stepped back from;
// such windows start at the earliest representable instant.
fn span_before(end: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    end.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_tokens_span_nominal_duration() {
        let latest = at(2024, 3, 10, 15, 30);
        let cases = [
            (RangeToken::Last24Hours, Duration::hours(24), day(2024, 3, 9)),
            (RangeToken::Last7Days, Duration::days(7), day(2024, 3, 3)),
            (RangeToken::Last30Days, Duration::days(30), day(2024, 2, 9)),
        ];

        for (token, span, start_day) in cases {
            let window = resolve_window(token, None, None, Some(latest), Utc::now());
            assert!(window.start <= window.end);
            assert_eq!(window.end - window.start, span);
            assert_eq!(window.end, latest);

            let days = window.to_days();
            assert_eq!(days.start, start_day);
            assert_eq!(days.end, day(2024, 3, 10));
        }
    }

    #[test]
    fn test_parse_range_token() {
        assert_eq!(RangeToken::parse("last24hours"), RangeToken::Last24Hours);
        assert_eq!(RangeToken::parse("last7days"), RangeToken::Last7Days);
        assert_eq!(RangeToken::parse("last30days"), RangeToken::Last30Days);
        assert_eq!(RangeToken::parse("custom"), RangeToken::Custom);
        assert_eq!(RangeToken::parse(""), RangeToken::Custom);
    }

    #[test]
    fn test_end_falls_back_to_now_without_data() {
        let before = Utc::now();
        let window = resolve_window(RangeToken::Last24Hours, None, None, None, Utc::now());
        let after = Utc::now();

        assert!(window.end >= before && window.end <= after);
        assert_eq!(window.end - window.start, Duration::hours(24));
    }

    #[test]
    fn test_explicit_end_overrides_latest() {
        let window = resolve_window(
            RangeToken::Last7Days,
            None,
            Some("2024-01-20"),
            Some(at(2024, 3, 10, 0, 0)),
            Utc::now(),
        );
        assert_eq!(window.end, at(2024, 1, 20, 0, 0));
        assert_eq!(window.to_days().start, day(2024, 1, 13));
    }

    #[test]
    fn test_malformed_end_date_is_ignored() {
        let latest = at(2024, 3, 10, 8, 0);
        let window = resolve_window(
            RangeToken::Last24Hours,
            None,
            Some("not-a-date"),
            Some(latest),
            Utc::now(),
        );
        assert_eq!(window.end, latest);
    }

    #[test]
    fn test_custom_range_uses_start_date() {
        let window = resolve_window(
            RangeToken::Custom,
            Some("2024-03-01T06:00:00Z"),
            None,
            Some(at(2024, 3, 10, 12, 0)),
            Utc::now(),
        );
        assert_eq!(window.start, at(2024, 3, 1, 6, 0));
        assert_eq!(
            window.to_days(),
            DateWindow {
                start: day(2024, 3, 1),
                end: day(2024, 3, 10),
            }
        );
    }

    #[test]
    fn test_range_token_wins_over_start_date() {
        let latest = at(2024, 3, 10, 12, 0);
        let window = resolve_window(
            RangeToken::Last24Hours,
            Some("2024-01-01"),
            None,
            Some(latest),
            Utc::now(),
        );
        assert_eq!(window.start, latest - Duration::hours(24));
    }

    #[test]
    fn test_unparseable_start_date_defaults_to_last_24_hours() {
        let latest = at(2024, 3, 10, 12, 0);
        let window = resolve_window(
            RangeToken::Custom,
            Some("31/02/2024"),
            None,
            Some(latest),
            Utc::now(),
        );
        assert_eq!(window.start, latest - Duration::hours(24));
        assert_eq!(window.end, latest);
    }

    #[test]
    fn test_start_after_end_is_clamped() {
        let window = resolve_window(
            RangeToken::Custom,
            Some("2024-05-01"),
            Some("2024-04-01"),
            None,
            Utc::now(),
        );
        assert_eq!(window.start, window.end);
        assert!(window.to_days().start <= window.to_days().end);
    }

    #[test]
    fn test_end_date_at_lower_limit_does_not_overflow() {
        let edge = DateTime::<Utc>::MIN_UTC;
        let raw = edge.format("%Y-%m-%d").to_string();
        assert_eq!(parse_date_param(&raw), Some(edge));

        for token in [
            RangeToken::Last24Hours,
            RangeToken::Last30Days,
            RangeToken::Custom,
        ] {
            let window = resolve_window(token, None, Some(&raw), None, Utc::now());
            assert_eq!(window.end, edge);
            assert_eq!(window.start, edge);
            assert!(window.to_days().start <= window.to_days().end);
        }
    }

    #[test]
    fn test_end_date_at_upper_limit() {
        let edge = DateTime::<Utc>::MAX_UTC.date_naive();
        let raw = edge.format("%Y-%m-%d").to_string();
        let window = resolve_window(RangeToken::Last7Days, None, Some(&raw), None, Utc::now());

        assert_eq!(window.end.date_naive(), edge);
        assert_eq!(window.end - window.start, Duration::days(7));
    }

    #[test]
    fn test_parse_date_param_formats() {
        assert_eq!(parse_date_param("2024-03-10"), Some(at(2024, 3, 10, 0, 0)));
        assert_eq!(
            parse_date_param("2024-03-10T04:05:00"),
            Some(at(2024, 3, 10, 4, 5))
        );
        assert_eq!(
            parse_date_param("2024-03-10 04:05:00.250"),
            Some(at(2024, 3, 10, 4, 5) + Duration::milliseconds(250))
        );
        assert_eq!(
            parse_date_param("2024-03-10T06:05:00+02:00"),
            Some(at(2024, 3, 10, 4, 5))
        );
        assert_eq!(parse_date_param(""), None);
        assert_eq!(parse_date_param("yesterday"), None);
        assert_eq!(parse_date_param("2024-13-01"), None);
    }
}
