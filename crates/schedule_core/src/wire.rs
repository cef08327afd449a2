//! JSON shapes exchanged with the editing form.
//!
//! The form posts whatever its inputs currently hold, so every field is
//! optional and loosely typed here. A field of the wrong JSON type reads as
//! absent and malformed list or map entries are dropped, so any JSON object
//! is a document. Conversion into [`RecurrenceConfig`] is total; anything
//! unusable falls back to the documented defaults.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ScheduleResult;
use crate::exception::{ExceptionList, ScheduleException};
use crate::recurrence::{Frequency, MonthOrdinal, RecurrenceConfig, TimeRange};
use crate::time;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurrenceDocument {
    #[serde(alias = "start_date", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(
        alias = "start_time",
        alias = "defaultStartTime",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    #[serde(
        alias = "end_time",
        alias = "defaultEndTime",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Value>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub weekdays: Option<Vec<Value>>,
    #[serde(
        alias = "weekday_times",
        alias = "weekdayTimeOverrides",
        deserialize_with = "lenient_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub weekday_times: Option<BTreeMap<String, WeekdayTimes>>,
    #[serde(alias = "month_ordinal", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub month_ordinal: Option<String>,
    #[serde(alias = "month_weekday", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub month_weekday: Option<String>,
    #[serde(
        alias = "until_date",
        alias = "until",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub until_date: Option<String>,
    #[serde(alias = "max_occurrences", skip_serializing_if = "Option::is_none")]
    pub max_occurrences: Option<Value>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<Vec<RawException>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeekdayTimes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Older form revisions stored bare date strings; newer ones store objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawException {
    Date(String),
    Entry {
        #[serde(default)]
        date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl RawException {
    fn into_exception(self) -> Option<ScheduleException> {
        let (date, reason) = match self {
            Self::Date(date) => (Some(date), None),
            Self::Entry { date, reason } => (date, reason),
        };
        let key = date.unwrap_or_default();
        let Some(date) = time::parse_date(&key) else {
            debug!(%key, "dropping exception with unparsable date");
            return None;
        };
        Some(ScheduleException { date, reason })
    }
}

impl From<&ScheduleException> for RawException {
    fn from(entry: &ScheduleException) -> Self {
        Self::Entry {
            date: Some(time::format_date(entry.date)),
            reason: entry.reason.clone(),
        }
    }
}

impl RecurrenceDocument {
    pub fn from_json(json: &str) -> ScheduleResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> ScheduleResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_config(&self) -> RecurrenceConfig {
        let weekdays = self
            .weekdays
            .iter()
            .flatten()
            .filter_map(weekday_from_value)
            .collect();

        let weekday_times = self
            .weekday_times
            .iter()
            .flatten()
            .filter_map(|(key, times)| {
                let weekday = time::parse_weekday(key)?;
                let range = TimeRange::new(
                    times.start.as_deref().and_then(time::parse_time),
                    times.end.as_deref().and_then(time::parse_time),
                );
                (!range.is_empty()).then_some((weekday, range))
            })
            .collect();

        RecurrenceConfig {
            start_date: self.start_date.as_deref().and_then(time::parse_date),
            until_date: self.until_date.as_deref().and_then(time::parse_date),
            frequency: self
                .frequency
                .as_deref()
                .and_then(Frequency::parse)
                .unwrap_or_default(),
            interval: self
                .interval
                .as_ref()
                .and_then(positive_integer)
                .unwrap_or(1),
            weekdays,
            weekday_times,
            month_ordinal: self
                .month_ordinal
                .as_deref()
                .and_then(MonthOrdinal::parse)
                .unwrap_or_default(),
            month_weekday: self.month_weekday.as_deref().and_then(time::parse_weekday),
            default_times: TimeRange::new(
                self.start_time.as_deref().and_then(time::parse_time),
                self.end_time.as_deref().and_then(time::parse_time),
            ),
            max_occurrences: self
                .max_occurrences
                .as_ref()
                .and_then(positive_integer)
                .map(|value| value as usize),
        }
    }

    pub fn to_exceptions(&self) -> ExceptionList {
        ExceptionList::normalize(
            self.exceptions
                .iter()
                .flatten()
                .cloned()
                .filter_map(RawException::into_exception),
        )
    }

    /// Replaces the stored exceptions with a normalized list, ready to be saved.
    pub fn set_exceptions(&mut self, list: &ExceptionList) {
        self.exceptions = Some(list.entries().iter().map(RawException::from).collect());
    }
}

/// Any value of the wrong shape reads as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Keeps the entries that deserialize; a non-array reads as `None`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    let total = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if kept.len() < total {
        debug!(dropped = total - kept.len(), "dropping malformed list entries");
    }
    Ok(Some(kept))
}

/// Keeps the entries that deserialize. PHP encodes an empty map as `[]`, so a
/// non-object reads as `None`.
fn lenient_map<'de, D, T>(deserializer: D) -> Result<Option<BTreeMap<String, T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        entries
            .into_iter()
            .filter_map(|(key, value)| Some((key, serde_json::from_value(value).ok()?)))
            .collect(),
    ))
}

fn positive_integer(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(number).ok().filter(|n| *n >= 1)
}

fn weekday_from_value(value: &Value) -> Option<chrono::Weekday> {
    match value {
        Value::String(text) => time::parse_weekday(text),
        Value::Number(number) => number
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(time::weekday_from_iso),
        _ => None,
    }
}
