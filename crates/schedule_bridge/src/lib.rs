use anyhow::{Context, Result};
use napi_derive::napi;
use schedule_core::{
    engine::EngineOptions,
    labels::{PatternLabels, DEFAULT_DATE_PATTERN, DEFAULT_TIME_PATTERN},
    session::SessionSnapshot,
    OccurrenceAction,
    RecurrenceDocument, ScheduleEngine, ScheduleError, ScheduleSession,
};
use serde_json::json;

#[napi(object)]
#[derive(Clone, Debug, Default)]
pub struct PreviewOptions {
    pub max_occurrences: Option<u32>,
    pub iteration_cap: Option<u32>,
    pub date_pattern: Option<String>,
    pub time_pattern: Option<String>,
}

#[napi(object)]
pub struct OccurrenceActionParams {
    pub document: serde_json::Value,
    pub action: serde_json::Value,
    pub options: Option<PreviewOptions>,
}

#[napi]
pub fn ping() -> String {
    "schedule-bridge".to_owned()
}

/// Expands the form's current recurrence document into occurrence descriptors.
#[napi]
pub fn expand_schedule(
    document: serde_json::Value,
    options: Option<PreviewOptions>,
) -> napi::Result<serde_json::Value> {
    let session = build_session(document, options.as_ref()).map_err(to_napi_error)?;
    Ok(snapshot_to_json(&session.snapshot()))
}

/// Applies exclude / cancel / restore to one occurrence and returns the
/// document with its exceptions rewritten, plus the refreshed preview.
#[napi]
pub fn apply_occurrence_action(
    params: OccurrenceActionParams,
) -> napi::Result<serde_json::Value> {
    let OccurrenceActionParams {
        document,
        action,
        options,
    } = params;
    let mut doc = RecurrenceDocument::from_value(document)
        .context("failed to read recurrence document")
        .map_err(to_napi_error)?;
    let action: OccurrenceAction = serde_json::from_value(action)
        .context("failed to read occurrence action")
        .map_err(to_napi_error)?;

    let mut session = ScheduleSession::builder()
        .document(&doc)
        .engine(build_engine(options.as_ref()))
        .build();
    session.apply(&action).map_err(action_error)?;
    doc.set_exceptions(session.exceptions());

    let mut payload = snapshot_to_json(&session.snapshot());
    payload["document"] = serde_json::to_value(&doc).map_err(|err| to_napi_error(err.into()))?;
    Ok(payload)
}

/// Dedupes and sorts a raw exceptions array the way the engine stores it.
#[napi]
pub fn normalize_exceptions(exceptions: serde_json::Value) -> napi::Result<serde_json::Value> {
    let doc = RecurrenceDocument::from_value(json!({ "exceptions": exceptions }))
        .context("failed to read exceptions")
        .map_err(to_napi_error)?;
    serde_json::to_value(doc.to_exceptions()).map_err(|err| to_napi_error(err.into()))
}

fn build_session(
    document: serde_json::Value,
    options: Option<&PreviewOptions>,
) -> Result<ScheduleSession> {
    let doc =
        RecurrenceDocument::from_value(document).context("failed to read recurrence document")?;
    Ok(ScheduleSession::builder()
        .document(&doc)
        .engine(build_engine(options))
        .build())
}

fn build_engine(options: Option<&PreviewOptions>) -> ScheduleEngine {
    let Some(options) = options else {
        return ScheduleEngine::default();
    };
    let defaults = EngineOptions::default();
    let engine = ScheduleEngine::new(EngineOptions {
        max_occurrences: options
            .max_occurrences
            .map(|value| value as usize)
            .unwrap_or(defaults.max_occurrences),
        iteration_cap: options.iteration_cap.unwrap_or(defaults.iteration_cap),
    });
    if options.date_pattern.is_none() && options.time_pattern.is_none() {
        return engine;
    }
    tracing::debug!(
        date = ?options.date_pattern,
        time = ?options.time_pattern,
        "using custom label patterns"
    );
    engine.with_labels(PatternLabels::new(
        options
            .date_pattern
            .clone()
            .unwrap_or_else(|| DEFAULT_DATE_PATTERN.to_string()),
        options
            .time_pattern
            .clone()
            .unwrap_or_else(|| DEFAULT_TIME_PATTERN.to_string()),
    ))
}

fn action_error(err: ScheduleError) -> napi::Error {
    let status = match err {
        ScheduleError::EmptyReason
        | ScheduleError::InvalidDate(_)
        | ScheduleError::UnknownOccurrence(_) => napi::Status::InvalidArg,
        ScheduleError::Json(_) => napi::Status::GenericFailure,
    };
    napi::Error::new(status, err.to_string())
}

fn to_napi_error(err: anyhow::Error) -> napi::Error {
    napi::Error::new(napi::Status::GenericFailure, format!("{err:#}"))
}

fn snapshot_to_json(snapshot: &SessionSnapshot) -> serde_json::Value {
    json!({
        "occurrences": snapshot.expansion.occurrences,
        "warnings": snapshot.expansion.warnings,
        "stop": snapshot.expansion.stop,
        "exceptions": snapshot.exceptions,
    })
}
