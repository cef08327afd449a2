use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::time;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// "Which one" of a weekday within a month.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MonthOrdinal {
    #[default]
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Last,
}

impl MonthOrdinal {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" | "1" | "1st" => Some(Self::First),
            "second" | "2" | "2nd" => Some(Self::Second),
            "third" | "3" | "3rd" => Some(Self::Third),
            "fourth" | "4" | "4th" => Some(Self::Fourth),
            "fifth" | "5" | "5th" => Some(Self::Fifth),
            "last" | "-1" => Some(Self::Last),
            _ => None,
        }
    }

    /// Resolves the ordinal inside the given month, if that month has such a day.
    pub fn resolve(self, year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
        let nth = match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
            Self::Fifth => 5,
            Self::Last => return time::last_weekday_of_month(year, month, weekday),
        };
        time::nth_weekday_of_month(year, month, weekday, nth)
    }
}

/// Start/end of one occurrence. Either side may be unset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl TimeRange {
    pub fn new(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Fills unset sides from `fallback`.
    pub fn or(self, fallback: TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.or(fallback.start),
            end: self.end.or(fallback.end),
        }
    }
}

/// Normalized recurrence rule. Construct through [`RecurrenceConfig::weekly`] /
/// [`RecurrenceConfig::monthly`] or from a [`crate::wire::RecurrenceDocument`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecurrenceConfig {
    /// `None` means the start date was missing or unparsable; expansion yields nothing.
    pub start_date: Option<NaiveDate>,
    pub until_date: Option<NaiveDate>,
    pub frequency: Frequency,
    pub interval: u32,
    pub weekdays: Vec<Weekday>,
    pub weekday_times: HashMap<Weekday, TimeRange>,
    pub month_ordinal: MonthOrdinal,
    /// `None` when the configured weekday was unresolvable; expansion falls back to Saturday.
    pub month_weekday: Option<Weekday>,
    pub default_times: TimeRange,
    /// Per-rule cap. It can lower the engine's `max_occurrences` but never raise it.
    pub max_occurrences: Option<usize>,
}

impl RecurrenceConfig {
    pub fn weekly(start_date: NaiveDate, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            start_date: Some(start_date),
            frequency: Frequency::Weekly,
            interval: 1,
            weekdays: weekdays.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn monthly(start_date: NaiveDate, ordinal: MonthOrdinal, weekday: Weekday) -> Self {
        Self {
            start_date: Some(start_date),
            frequency: Frequency::Monthly,
            interval: 1,
            month_ordinal: ordinal,
            month_weekday: Some(weekday),
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until_date = Some(until);
        self
    }

    pub fn with_default_times(mut self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        self.default_times = TimeRange::new(start, end);
        self
    }

    pub fn with_weekday_time(mut self, weekday: Weekday, range: TimeRange) -> Self {
        self.weekday_times.insert(weekday, range);
        self
    }

    pub fn effective_interval(&self) -> u32 {
        self.interval.max(1)
    }

    /// Inclusive upper bound: the configured until date, or six months after the start.
    pub fn effective_until(&self) -> Option<NaiveDate> {
        let start = self.start_date?;
        self.until_date
            .or_else(|| time::add_months(start, 6))
            .or_else(|| start.checked_add_signed(Duration::days(183)))
    }

    /// Selected weekdays as ISO numbers (Monday = 1), ascending, without repeats.
    pub fn weekday_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self
            .weekdays
            .iter()
            .map(|day| day.number_from_monday())
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers
    }

    pub fn times_for(&self, weekday: Weekday) -> TimeRange {
        match self.weekday_times.get(&weekday) {
            Some(range) => range.or(self.default_times),
            None => self.default_times,
        }
    }
}
