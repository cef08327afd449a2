use chrono::NaiveDate;
use thiserror::Error;

/// Failures surfaced by reconciliation and the JSON boundary. Expansion itself never fails.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("a cancellation needs a non-empty reason")]
    EmptyReason,

    #[error("no generated occurrence on {0}")]
    UnknownOccurrence(NaiveDate),

    #[error("malformed schedule document: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
