use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{HseError, Result};

/// Hour (UTC) every report date is pinned to before any arithmetic.
///
/// Report dates carry no time of day; anchoring at midday keeps day
/// boundaries stable regardless of the host timezone or DST transitions.
pub const REPORT_ANCHOR_HOUR: u32 = 12;

/// Width of one forecasting window in days.
pub const WINDOW_DAYS: i64 = 7;

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a `DD-MM-YYYY` report date.
///
/// Each part may carry surrounding whitespace and any number of digits.
/// Returns `None` for empty input, the wrong number of parts, non-numeric
/// parts, or impossible calendar dates such as `31-02-2025`.
pub fn parse_report_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let mut parts = s.split('-');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let day: u32 = day.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Strict variant of [`parse_report_date`] for user-supplied values.
pub fn require_report_date(s: &str) -> Result<NaiveDate> {
    parse_report_date(s).ok_or_else(|| HseError::InvalidDate(s.to_string()))
}

/// Pin a calendar date to [`REPORT_ANCHOR_HOUR`] UTC.
pub fn anchored_timestamp(date: NaiveDate) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(REPORT_ANCHOR_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(noon).and_utc()
}

// ── Ordering ──────────────────────────────────────────────────────────────────

/// Order two raw report-date strings by calendar date.
///
/// Valid dates sort before unparseable ones; two unparseable values compare
/// equal so a stable sort keeps their original order.
pub fn compare_report_dates(a: &str, b: &str) -> Ordering {
    match (parse_report_date(a), parse_report_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── Windows ───────────────────────────────────────────────────────────────────

/// Zero-based index of the [`WINDOW_DAYS`]-wide window containing `date`,
/// counted from `start`. Dates before `start` clamp to window 0.
///
/// Both dates are compared as [`anchored_timestamp`]s.
pub fn window_index(start: NaiveDate, date: NaiveDate) -> usize {
    let days = (anchored_timestamp(date) - anchored_timestamp(start)).num_days();
    days.div_euclid(WINDOW_DAYS).max(0) as usize
}

/// First day of window `index`.
pub fn window_start(start: NaiveDate, index: usize) -> NaiveDate {
    start + Duration::days(index as i64 * WINDOW_DAYS)
}

/// Chart label for a window: `"<d>/<m>-<d>/<m>"` covering its seven days,
/// without zero padding, e.g. `"29/12-4/1"`.
pub fn window_label(first_day: NaiveDate) -> String {
    let last_day = first_day + Duration::days(WINDOW_DAYS - 1);
    format!(
        "{}/{}-{}/{}",
        first_day.day(),
        first_day.month(),
        last_day.day(),
        last_day.month()
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
