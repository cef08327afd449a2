//! Date and time normalization shared by the engine and the wire layer.
//!
//! Every parser here is lenient in the same way: malformed input yields `None`
//! and callers substitute defaults.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a strict `YYYY-MM-DD` date, nothing before or after.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_only = bytes
        .iter()
        .enumerate()
        .all(|(idx, b)| idx == 4 || idx == 7 || b.is_ascii_digit());
    if !digits_only {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Parses `HH:MM` or `HH:MM:SS` (24h). Empty strings are "no time".
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Accepts English weekday names or abbreviations in any case, or ISO numbers `1..=7`.
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let value = value.trim();
    if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() {
        return value.parse::<u8>().ok().and_then(weekday_from_iso);
    }
    value.parse::<Weekday>().ok()
}

pub fn weekday_from_iso(number: u8) -> Option<Weekday> {
    match number {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Adds calendar months, clamping the day to the target month's length.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total_months = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(months);
    let target_year = i32::try_from(total_months.div_euclid(12)).ok()?;
    let target_month = (total_months.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(target_year, target_month));
    NaiveDate::from_ymd_opt(target_year, target_month, day)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// The `nth` (1-based) `weekday` of the month, scanning forward from the 1st.
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, nth: u32) -> Option<NaiveDate> {
    if nth == 0 {
        return None;
    }
    let mut seen = 0;
    for day in 1..=days_in_month(year, month) {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        if date.weekday() == weekday {
            seen += 1;
            if seen == nth {
                return Some(date);
            }
        }
    }
    None
}

/// The last `weekday` of the month, scanning backward from the final day.
pub fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    (1..=days_in_month(year, month))
        .rev()
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .find(|date| date.weekday() == weekday)
}
