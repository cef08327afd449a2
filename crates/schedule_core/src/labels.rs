use std::fmt::{self, Write as _};

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

pub const DEFAULT_DATE_PATTERN: &str = "%A, %B %d, %Y";
pub const DEFAULT_TIME_PATTERN: &str = "%H:%M";

/// Display strategy for occurrence labels. Front-ends with their own locale
/// rules implement this and hand it to the engine.
pub trait LabelFormatter: Send + Sync {
    fn date_label(&self, date: NaiveDate) -> String;
    fn time_label(&self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> String;
}

/// Whether `pattern` renders a calendar date. Rejects unknown specifiers and
/// time-of-day fields.
pub fn is_date_pattern(pattern: &str) -> bool {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|sample| render(sample.format(pattern)))
        .is_some()
}

/// Whether `pattern` renders a time of day. Rejects unknown specifiers and
/// calendar fields.
pub fn is_time_pattern(pattern: &str) -> bool {
    NaiveTime::from_hms_opt(12, 0, 0)
        .and_then(|sample| render(sample.format(pattern)))
        .is_some()
}

fn render(item: impl fmt::Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{item}").ok()?;
    Some(out)
}

/// chrono format patterns for both labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLabels {
    date_pattern: String,
    time_pattern: String,
}

impl PatternLabels {
    /// Patterns that cannot render their value type are replaced by the defaults.
    pub fn new(date_pattern: impl Into<String>, time_pattern: impl Into<String>) -> Self {
        let mut date_pattern = date_pattern.into();
        if !is_date_pattern(&date_pattern) {
            warn!(pattern = %date_pattern, "unusable date label pattern, using default");
            date_pattern = DEFAULT_DATE_PATTERN.to_string();
        }
        let mut time_pattern = time_pattern.into();
        if !is_time_pattern(&time_pattern) {
            warn!(pattern = %time_pattern, "unusable time label pattern, using default");
            time_pattern = DEFAULT_TIME_PATTERN.to_string();
        }
        Self {
            date_pattern,
            time_pattern,
        }
    }

    pub fn date_pattern(&self) -> &str {
        &self.date_pattern
    }

    pub fn time_pattern(&self) -> &str {
        &self.time_pattern
    }
}

impl Default for PatternLabels {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_PATTERN, DEFAULT_TIME_PATTERN)
    }
}

impl LabelFormatter for PatternLabels {
    fn date_label(&self, date: NaiveDate) -> String {
        render(date.format(&self.date_pattern))
            .unwrap_or_else(|| date.format(DEFAULT_DATE_PATTERN).to_string())
    }

    fn time_label(&self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> String {
        let fmt = |time: NaiveTime| {
            render(time.format(&self.time_pattern))
                .unwrap_or_else(|| time.format(DEFAULT_TIME_PATTERN).to_string())
        };
        match (start, end) {
            (Some(start), Some(end)) => format!("{} – {}", fmt(start), fmt(end)),
            (Some(single), None) | (None, Some(single)) => fmt(single),
            (None, None) => String::new(),
        }
    }
}
