use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    engine::{EngineOptions, Expansion, OccurrenceDescriptor, ScheduleEngine},
    error::{ScheduleError, ScheduleResult},
    exception::{ExceptionList, OccurrenceState},
    reconcile::OccurrenceAction,
    recurrence::RecurrenceConfig,
    wire::RecurrenceDocument,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub exceptions: ExceptionList,
    #[serde(flatten)]
    pub expansion: Expansion,
}

/// One open recurrence editor: the rule being edited, its exceptions and
/// the engine that previews them. Every change re-runs the engine.
#[derive(Debug)]
pub struct ScheduleSession {
    config: RecurrenceConfig,
    exceptions: ExceptionList,
    engine: ScheduleEngine,
    expansion: Expansion,
}

pub struct ScheduleSessionBuilder {
    config: RecurrenceConfig,
    exceptions: ExceptionList,
    engine: Option<ScheduleEngine>,
}

impl ScheduleSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: RecurrenceConfig::default(),
            exceptions: ExceptionList::new(),
            engine: None,
        }
    }

    pub fn recurrence(mut self, config: RecurrenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn exceptions(mut self, exceptions: ExceptionList) -> Self {
        self.exceptions = exceptions;
        self
    }

    pub fn document(self, document: &RecurrenceDocument) -> Self {
        self.recurrence(document.to_config())
            .exceptions(document.to_exceptions())
    }

    pub fn engine(mut self, engine: ScheduleEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn options(self, options: EngineOptions) -> Self {
        self.engine(ScheduleEngine::new(options))
    }

    pub fn build(self) -> ScheduleSession {
        let engine = self.engine.unwrap_or_default();
        let expansion = engine.expand_report(&self.config, &self.exceptions);
        ScheduleSession {
            config: self.config,
            exceptions: self.exceptions,
            engine,
            expansion,
        }
    }
}

impl Default for ScheduleSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleSession {
    pub fn builder() -> ScheduleSessionBuilder {
        ScheduleSessionBuilder::new()
    }

    pub fn config(&self) -> &RecurrenceConfig {
        &self.config
    }

    pub fn exceptions(&self) -> &ExceptionList {
        &self.exceptions
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    pub fn occurrences(&self) -> &[OccurrenceDescriptor] {
        &self.expansion.occurrences
    }

    pub fn occurrence(&self, date: NaiveDate) -> Option<&OccurrenceDescriptor> {
        self.occurrences()
            .binary_search_by_key(&date, |occurrence| occurrence.date)
            .ok()
            .map(|idx| &self.expansion.occurrences[idx])
    }

    pub fn state_of(&self, date: NaiveDate) -> OccurrenceState {
        self.exceptions.state_of(date)
    }

    /// Replaces the rule; exceptions are kept as they are.
    pub fn set_config(&mut self, config: RecurrenceConfig) {
        self.config = config;
        self.refresh();
    }

    /// Applies one user action. Excluding or cancelling a date the rule does
    /// not generate is rejected; restoring is always allowed so stale entries
    /// can be cleaned up.
    #[instrument(skip(self), fields(date = action.date_key()))]
    pub fn apply(&mut self, action: &OccurrenceAction) -> ScheduleResult<&ExceptionList> {
        let date = action.date()?;
        if !matches!(action, OccurrenceAction::Restore { .. }) && self.occurrence(date).is_none() {
            return Err(ScheduleError::UnknownOccurrence(date));
        }
        self.exceptions = self.exceptions.apply(action)?;
        self.refresh();
        tracing::debug!(exceptions = self.exceptions.len(), "exception list updated");
        Ok(&self.exceptions)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            exceptions: self.exceptions.clone(),
            expansion: self.expansion.clone(),
        }
    }

    fn refresh(&mut self) {
        self.expansion = self.engine.expand_report(&self.config, &self.exceptions);
    }
}
