//! Date-keyed exceptions layered over generated occurrences.
//!
//! An [`ExceptionList`] is always sorted by date with at most one entry per
//! date. An entry without a reason means the occurrence is excluded; an entry
//! with a reason means it is cancelled and the reason is shown publicly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MAX_REASON_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleException {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScheduleException {
    pub fn excluded(date: NaiveDate) -> Self {
        Self { date, reason: None }
    }

    pub fn cancelled(date: NaiveDate, reason: &str) -> Self {
        Self {
            date,
            reason: clean_reason(reason),
        }
    }

    pub fn state(&self) -> OccurrenceState {
        match &self.reason {
            Some(reason) => OccurrenceState::Cancelled {
                reason: reason.clone(),
            },
            None => OccurrenceState::Excluded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum OccurrenceState {
    Active,
    Excluded,
    Cancelled { reason: String },
}

/// Trims, collapses whitespace runs and caps the length. Blank input yields `None`.
pub fn clean_reason(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    let capped: String = collapsed.chars().take(MAX_REASON_CHARS).collect();
    Some(capped.trim_end().to_string())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "Vec<ScheduleException>", from = "Vec<ScheduleException>")]
pub struct ExceptionList {
    entries: Vec<ScheduleException>,
}

impl ExceptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalized list from arbitrary entries.
    ///
    /// Duplicate dates collapse into one entry: a later reason replaces an
    /// earlier one, but a later entry without a reason never drops an earlier
    /// reason. Blank reasons become "no reason".
    pub fn normalize(raw: impl IntoIterator<Item = ScheduleException>) -> Self {
        let mut entries: Vec<ScheduleException> = Vec::new();
        for entry in raw {
            let reason = entry.reason.as_deref().and_then(clean_reason);
            match entries.iter_mut().find(|existing| existing.date == entry.date) {
                Some(existing) => {
                    if reason.is_some() {
                        existing.reason = reason;
                    }
                }
                None => entries.push(ScheduleException {
                    date: entry.date,
                    reason,
                }),
            }
        }
        entries.sort_by_key(|entry| entry.date);
        Self { entries }
    }

    pub fn entries(&self) -> &[ScheduleException] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ScheduleException> {
        self.entries
            .binary_search_by_key(&date, |entry| entry.date)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    pub fn state_of(&self, date: NaiveDate) -> OccurrenceState {
        self.get(date)
            .map(ScheduleException::state)
            .unwrap_or(OccurrenceState::Active)
    }

    /// Returns a copy with `entry` replacing whatever was stored for its date.
    pub(crate) fn with_entry(&self, entry: ScheduleException) -> Self {
        let mut entries = self.entries.clone();
        match entries.binary_search_by_key(&entry.date, |existing| existing.date) {
            Ok(idx) => entries[idx] = entry,
            Err(idx) => entries.insert(idx, entry),
        }
        Self { entries }
    }

    pub(crate) fn without(&self, date: NaiveDate) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.date != date)
                .cloned()
                .collect(),
        }
    }
}

impl From<Vec<ScheduleException>> for ExceptionList {
    fn from(raw: Vec<ScheduleException>) -> Self {
        Self::normalize(raw)
    }
}

impl From<ExceptionList> for Vec<ScheduleException> {
    fn from(list: ExceptionList) -> Self {
        list.entries
    }
}

impl FromIterator<ScheduleException> for ExceptionList {
    fn from_iter<T: IntoIterator<Item = ScheduleException>>(iter: T) -> Self {
        Self::normalize(iter)
    }
}
