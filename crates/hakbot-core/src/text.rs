//! Date, weekday and class-key helpers shared by the interpreter.
//!
//! Every date is computed in an explicit [`FixedOffset`] so results never
//! depend on the host's local timezone.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Weekday names in Monday→Friday order, as used for timetable keys.
pub const SCHOOL_DAYS: [&str; 5] = ["monday", "tuesday", "wednesday", "thursday", "friday"];

// Accepts "2-3", "2 3", "2학년 3반", "2학년3반". ASCII digits only.
static CLASS_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*[-\s학년]*\s*([0-9]+)\s*(?:반)?").unwrap());

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").unwrap());

/// Calendar date of `now` in the school's timezone.
pub fn local_date(now: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// ISO date ("YYYY-MM-DD") `offset_days` away from today in `tz`.
pub fn date_with_offset(offset_days: i64, now: DateTime<Utc>, tz: FixedOffset) -> String {
    let date = local_date(now, tz) + Duration::days(offset_days);
    format_date(date)
}

/// Today's ISO date in `tz`.
pub fn today(now: DateTime<Utc>, tz: FixedOffset) -> String {
    date_with_offset(0, now, tz)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Find a class key like "2-3" in free text, normalized to "<grade>-<class>".
pub fn extract_class_key(text: &str) -> Option<String> {
    CLASS_KEY_RE
        .captures(text)
        .map(|caps| format!("{}-{}", &caps[1], &caps[2]))
}

/// First "YYYY-MM-DD" literal in the text, if any.
pub fn extract_iso_date(text: &str) -> Option<&str> {
    ISO_DATE_RE.find(text).map(|m| m.as_str())
}

/// Map a day-of-week ordinal (Sunday = 0) to a school-day name.
///
/// Only 1..=5 are school days; anything else yields `default`.
pub fn weekday_name(ordinal_from_sunday: u32, default: &'static str) -> &'static str {
    match ordinal_from_sunday {
        1..=5 => SCHOOL_DAYS[(ordinal_from_sunday - 1) as usize],
        _ => default,
    }
}

/// Weekday name of the date `offset_days` from today in `tz`.
pub fn weekday_with_offset(
    offset_days: i64,
    now: DateTime<Utc>,
    tz: FixedOffset,
    default: &'static str,
) -> &'static str {
    let date = local_date(now, tz) + Duration::days(offset_days);
    weekday_name(date.weekday().num_days_from_sunday(), default)
}

/// Korean display label for a weekday name; unknown names pass through.
pub fn weekday_label_ko(name: &str) -> &str {
    match name {
        "monday" => "월요일",
        "tuesday" => "화요일",
        "wednesday" => "수요일",
        "thursday" => "목요일",
        "friday" => "금요일",
        "saturday" => "토요일",
        "sunday" => "일요일",
        other => other,
    }
}
