//! Time-of-day parsing.
//!
//! Turns "8:00 AM" into an instant on the same local calendar day as a
//! reference instant. Parsing is permissive: out-of-range values roll over
//! into neighbouring hours/days, and text that yields no hour or minute is
//! treated like a missing schedule.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};

/// Parse `text` as "H:MM AM|PM" anchored to the calendar day of `now`.
///
/// Empty or missing text resolves to `now`, i.e. "due now".
pub fn parse_time_to_today(text: Option<&str>, now: DateTime<Local>) -> DateTime<Local> {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return now,
    };

    let Some((hours, minutes)) = split_clock(text) else {
        tracing::trace!(time = text, "unparseable time of day, treating as due now");
        return now;
    };

    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    let Some(naive) = offset_from(midnight, hours, minutes) else {
        return now;
    };

    resolve_local(&Local, &naive)
}

/// Wall-clock time in `tz`. A time skipped by a DST transition moves forward
/// past the gap; an ambiguous one takes the earlier instant.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| {
            naive
                .checked_add_signed(Duration::hours(1))
                .and_then(|later| tz.from_local_datetime(&later).earliest())
        })
        .unwrap_or_else(|| tz.from_utc_datetime(naive))
}

/// Split into 24-hour `(hours, minutes)` without range checks.
fn split_clock(text: &str) -> Option<(i64, i64)> {
    let mut parts = text.split(' ');
    let time = parts.next().unwrap_or_default();
    let modifier = parts.next();

    let mut clock = time.split(':');
    let mut hours = leading_int(clock.next()?)?;
    let minutes = leading_int(clock.next()?)?;

    match modifier {
        Some("PM") if hours < 12 => hours += 12,
        Some("AM") if hours == 12 => hours = 0,
        _ => {}
    }

    Some((hours, minutes))
}

/// Integer prefix of `s` ("08" → 8, "00AM" → 0, "x1" → None).
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;

    Some(if negative { -value } else { value })
}

fn offset_from(midnight: NaiveDateTime, hours: i64, minutes: i64) -> Option<NaiveDateTime> {
    let offset = Duration::try_hours(hours)?.checked_add(&Duration::try_minutes(minutes)?)?;
    midnight.checked_add_signed(offset)
}
