//! User actions against a single generated occurrence.
//!
//! Every action returns a fresh normalized list; the receiver is left untouched
//! so a rejected action never leaves partial state behind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};
use crate::exception::{clean_reason, ExceptionList, ScheduleException};
use crate::time;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum OccurrenceAction {
    Exclude {
        date: String,
    },
    Cancel {
        date: String,
        #[serde(default)]
        reason: String,
    },
    #[serde(alias = "keep")]
    Restore {
        date: String,
    },
}

impl OccurrenceAction {
    pub fn date_key(&self) -> &str {
        match self {
            Self::Exclude { date } | Self::Cancel { date, .. } | Self::Restore { date } => date,
        }
    }

    pub fn date(&self) -> ScheduleResult<NaiveDate> {
        parse_key(self.date_key())
    }
}

fn parse_key(key: &str) -> ScheduleResult<NaiveDate> {
    time::parse_date(key).ok_or_else(|| ScheduleError::InvalidDate(key.to_string()))
}

impl ExceptionList {
    /// Marks `date` as silently removed, discarding any earlier reason.
    pub fn exclude(&self, date: NaiveDate) -> ExceptionList {
        self.with_entry(ScheduleException::excluded(date))
    }

    /// Marks `date` as cancelled with a public reason. Blank reasons are rejected.
    pub fn cancel(&self, date: NaiveDate, reason: &str) -> ScheduleResult<ExceptionList> {
        let reason = clean_reason(reason).ok_or(ScheduleError::EmptyReason)?;
        Ok(self.with_entry(ScheduleException {
            date,
            reason: Some(reason),
        }))
    }

    /// Drops any exception for `date`, making the occurrence active again.
    pub fn restore(&self, date: NaiveDate) -> ExceptionList {
        self.without(date)
    }

    /// Applies an action keyed by an ISO date string.
    pub fn apply(&self, action: &OccurrenceAction) -> ScheduleResult<ExceptionList> {
        let date = action.date()?;
        match action {
            OccurrenceAction::Exclude { .. } => Ok(self.exclude(date)),
            OccurrenceAction::Cancel { reason, .. } => self.cancel(date, reason),
            OccurrenceAction::Restore { .. } => Ok(self.restore(date)),
        }
    }
}
