//! Free-text date/time tokens to absolute timestamps in the canonical zone.
//!
//! Times are `HMM` or `HHMM` (`215` is 02:15, `0215` too). Without an explicit
//! date the most recent occurrence of that clock time is used, so a death
//! reported at `2330` shortly after midnight lands on the previous day.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

use crate::tracker::errors::TrackerError;
use crate::tracker::types::Timestamp;

/// True when `tok` has the shape of a time token (3 or 4 ASCII digits).
pub fn looks_like_time(tok: &str) -> bool {
    (tok.len() == 3 || tok.len() == 4) && tok.chars().all(|c| c.is_ascii_digit())
}

/// Decode a time token into `(hour, minute)`.
pub fn parse_clock(tok: &str) -> Result<(u32, u32), TrackerError> {
    let s = tok.trim();
    if !looks_like_time(s) {
        return Err(TrackerError::InvalidTimeFormat(
            "Time must be HMM or HHMM".to_string(),
        ));
    }
    let split = s.len() - 2;
    let hour: u32 = s[..split]
        .parse()
        .map_err(|_| TrackerError::InvalidTimeFormat(format!("bad hour in '{}'", s)))?;
    let minute: u32 = s[split..]
        .parse()
        .map_err(|_| TrackerError::InvalidTimeFormat(format!("bad minute in '{}'", s)))?;
    if hour > 23 || minute > 59 {
        return Err(TrackerError::InvalidTimeFormat(
            "Invalid numeric time".to_string(),
        ));
    }
    Ok((hour, minute))
}

/// Date layouts accepted by [`parse_date`], as (separator, digit widths, chrono format).
const DATE_LAYOUTS: &[(char, [(usize, usize); 3], &str)] = &[
    ('-', [(4, 4), (1, 2), (1, 2)], "%Y-%m-%d"),
    ('/', [(4, 4), (1, 2), (1, 2)], "%Y/%m/%d"),
    ('/', [(1, 2), (1, 2), (4, 4)], "%m/%d/%Y"),
    ('/', [(1, 2), (1, 2), (2, 2)], "%m/%d/%y"),
];

fn matches_layout(tok: &str, sep: char, widths: &[(usize, usize); 3]) -> bool {
    let parts: Vec<&str> = tok.split(sep).collect();
    parts.len() == 3
        && parts.iter().zip(widths.iter()).all(|(p, (lo, hi))| {
            (*lo..=*hi).contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit())
        })
}

/// Parse `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY` or `MM/DD/YY`.
pub fn parse_date(tok: &str) -> Result<NaiveDate, TrackerError> {
    let s = tok.trim();
    for (sep, widths, fmt) in DATE_LAYOUTS {
        if matches_layout(s, *sep, widths) {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Ok(d);
            }
        }
    }
    Err(TrackerError::InvalidDateFormat(
        "Date must be YYYY-MM-DD or MM/DD/YYYY".to_string(),
    ))
}

/// Pin a wall-clock time to the zone. Repeated times (DST fall-back) take the
/// first occurrence; skipped times (spring-forward) use the offset in force
/// just before the transition, so 02:30 becomes 03:30 daylight time.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }
    let before = naive - Duration::hours(3);
    let offset = tz
        .from_local_datetime(&before)
        .earliest()
        .map(|dt| dt.offset().fix())
        .unwrap_or_else(|| tz.offset_from_utc_datetime(&naive).fix());
    tz.from_utc_datetime(&(naive - offset))
}

/// Resolve a time token (and optional date) to an absolute timestamp.
///
/// With an explicit date the two are combined as-is. Otherwise the clock time is
/// taken on `now`'s date and rolled back one calendar day if that is still in
/// the future.
pub fn parse_time(
    tok: &str,
    date: Option<NaiveDate>,
    now: DateTime<Tz>,
) -> Result<Timestamp, TrackerError> {
    let (hour, minute) = parse_clock(tok)?;
    let tz = now.timezone();

    if let Some(d) = date {
        let naive = d
            .and_hms_opt(hour, minute, 0)
            .ok_or_else(|| TrackerError::InvalidTimeFormat("Invalid numeric time".to_string()))?;
        return Ok(localize(&tz, naive).fixed_offset());
    }

    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| TrackerError::InvalidTimeFormat("Invalid numeric time".to_string()))?;
    let mut dt = localize(&tz, today);
    if dt > now {
        dt = localize(&tz, today - Duration::days(1));
    }
    Ok(dt.fixed_offset())
}

/// Current instant in the canonical zone.
pub fn now_in(tz: &Tz) -> DateTime<Tz> {
    chrono::Utc::now().with_timezone(tz)
}

/// Short human form used in replies (`2025-12-05 02:10`).
pub fn format_when(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
