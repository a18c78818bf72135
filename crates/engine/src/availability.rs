//! Weekly availability overlap (§4.3 rule 7).
//!
//! Windows are expressed in each persona's local time zone; this module
//! normalizes both sides onto a shared Monday-00:00-UTC timeline before
//! computing the overlap, so the same wall-clock window in different time
//! zones is compared correctly.

use chrono::{DateTime, Datelike, Offset, Utc};
use chrono_tz::Tz;
use kindred_core::{Availability, AvailabilityWindow};

const MINUTES_PER_WEEK: i64 = 7 * 24 * 60;

/// Minutes to add to a local-time-of-day value to get UTC, at `now`.
fn utc_offset_minutes(now: DateTime<Utc>, tz_name: &str) -> i64 {
    match tz_name.parse::<Tz>() {
        Ok(tz) => {
            let local = now.with_timezone(&tz);
            -(local.offset().fix().local_minus_utc() as i64) / 60
        }
        Err(_) => 0,
    }
}

fn week_start(now: DateTime<Utc>) -> chrono::NaiveDate {
    let date = now.date_naive();
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Normalizes one availability window to a `[start, end)` range of
/// minutes-since-Monday-00:00-UTC. Windows that cross the week boundary are
/// not supported and are dropped (a persona should split such a window into
/// two entries).
fn normalize(window: &AvailabilityWindow, offset_minutes: i64) -> Option<(i64, i64)> {
    if window.end_minute <= window.start_minute {
        return None;
    }
    let day_base = window.weekday as i64 * 1440;
    let start = (day_base + window.start_minute as i64 - offset_minutes).rem_euclid(MINUTES_PER_WEEK);
    let end = start + (window.end_minute as i64 - window.start_minute as i64);
    Some((start, end))
}

/// Days (0=Monday..6=Sunday) excluded this week by an `available=false`
/// exception dated within the current Monday-Sunday window.
fn excluded_weekdays(now: DateTime<Utc>, availability: &Availability) -> Vec<u8> {
    let start = week_start(now);
    let end = start + chrono::Duration::days(6);
    availability
        .exceptions
        .iter()
        .filter(|ex| !ex.available && ex.date >= start && ex.date <= end)
        .map(|ex| ex.date.weekday().num_days_from_monday() as u8)
        .collect()
}

fn normalized_ranges(now: DateTime<Utc>, availability: &Availability, tz_name: &str) -> Vec<(i64, i64)> {
    let offset = utc_offset_minutes(now, tz_name);
    let excluded = excluded_weekdays(now, availability);
    availability
        .windows
        .iter()
        .filter(|w| !excluded.contains(&w.weekday))
        .filter_map(|w| normalize(w, offset))
        .collect()
}

/// Total overlap, in minutes, between two weekly availability schedules.
/// Returns 0 if either side has no availability at all (per rule 7).
pub fn weekly_overlap_minutes(
    now: DateTime<Utc>,
    a: Option<&Availability>,
    a_tz: &str,
    b: Option<&Availability>,
    b_tz: &str,
) -> u32 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0;
    };

    let ranges_a = normalized_ranges(now, a, a_tz);
    let ranges_b = normalized_ranges(now, b, b_tz);

    let mut total = 0i64;
    for &(a_start, a_end) in &ranges_a {
        for &(b_start, b_end) in &ranges_b {
            let overlap_start = a_start.max(b_start);
            let overlap_end = a_end.min(b_end);
            if overlap_end > overlap_start {
                total += overlap_end - overlap_start;
            }
        }
    }
    total.max(0) as u32
}
