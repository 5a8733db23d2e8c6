// src/timezone/mod.rs
mod clock;

pub use clock::{Clock, SystemClock};

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone, Timelike};
use std::time::Duration;

/// Default campus offset (India Standard Time).
pub const CAMPUS_UTC_OFFSET: &str = "+05:30";

const ONE_DAY: Duration = Duration::from_secs(86_400);

#[derive(Debug, thiserror::Error)]
pub enum TimezoneError {
    #[error("Invalid UTC offset '{0}', expected +HH:MM or -HH:MM")]
    InvalidOffset(String),
}

/// Parse a UTC offset such as `+05:30`, `-04:00` or `UTC`.
pub fn parse_offset(raw: &str) -> Result<FixedOffset, TimezoneError> {
    let raw = raw.trim();
    let invalid = || TimezoneError::InvalidOffset(raw.to_string());

    if raw.eq_ignore_ascii_case("utc") || raw == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// 00:00:00.000 on the same local day.
pub fn start_of_day(t: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    *t - ChronoDuration::seconds(t.num_seconds_from_midnight() as i64)
        - ChronoDuration::nanoseconds(t.nanosecond() as i64)
}

/// 23:59:59.999 on the same local day.
pub fn end_of_day(t: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    start_of_day(t) + ChronoDuration::days(1) - ChronoDuration::milliseconds(1)
}

/// The next local midnight strictly after `now`.
pub fn next_midnight(now: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    start_of_day(now) + ChronoDuration::days(1)
}

/// Delay from `now` until the next local midnight.
///
/// Always in `(0, 24h]`: at exactly 00:00:00.000 the next midnight is the
/// following day, so a chain re-armed right after firing never fires twice.
pub fn duration_until_next_midnight(now: &DateTime<FixedOffset>) -> Duration {
    (next_midnight(now) - *now).to_std().unwrap_or(ONE_DAY)
}

/// Whether two instants fall on the same calendar day in `offset`.
pub fn is_same_day<A: TimeZone, B: TimeZone>(a: &DateTime<A>, b: &DateTime<B>, offset: &FixedOffset) -> bool {
    a.with_timezone(offset).date_naive() == b.with_timezone(offset).date_naive()
}

/// `dd/mm/yyyy`
pub fn format_date(t: &DateTime<FixedOffset>) -> String {
    t.format("%d/%m/%Y").to_string()
}

/// `dd/mm/yyyy, hh:mm:ss am`
pub fn format_date_time(t: &DateTime<FixedOffset>) -> String {
    t.format("%d/%m/%Y, %I:%M:%S %P").to_string()
}

/// `YYYY-MM-DD`
pub fn to_date_string(t: &DateTime<FixedOffset>) -> String {
    t.format("%Y-%m-%d").to_string()
}
