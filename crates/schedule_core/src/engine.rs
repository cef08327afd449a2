//! Recurrence expansion.
//!
//! The engine turns a [`RecurrenceConfig`] plus an [`ExceptionList`] into an
//! ordered, bounded list of [`OccurrenceDescriptor`]s. It is total: malformed
//! or half-edited configurations degrade to an empty or truncated list, never
//! to an error.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::exception::ExceptionList;
use crate::labels::{LabelFormatter, PatternLabels};
use crate::recurrence::{Frequency, RecurrenceConfig, TimeRange};
use crate::time;

pub const DEFAULT_MAX_OCCURRENCES: usize = 120;
pub const DEFAULT_ITERATION_CAP: u32 = 520;

/// Weekday used for monthly rules whose weekday could not be resolved.
pub const FALLBACK_MONTH_WEEKDAY: Weekday = Weekday::Sat;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceDescriptor {
    pub date: NaiveDate,
    pub date_label: String,
    pub time_label: String,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
}

impl OccurrenceDescriptor {
    pub fn is_cancelled(&self) -> bool {
        self.disabled && self.reason.is_some()
    }

    pub fn is_excluded(&self) -> bool {
        self.disabled && self.reason.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    pub max_occurrences: usize,
    /// Upper bound on week or month cycles walked per expansion.
    pub iteration_cap: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScheduleWarning {
    MissingStartDate,
    NoWeekdays,
    MonthWeekdayDefaulted,
    OrdinalUnresolved { year: i32, month: u32 },
}

/// Why expansion stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// Nothing could be generated from the configuration.
    Empty,
    UntilReached,
    OccurrenceCap,
    IterationCap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Expansion {
    pub occurrences: Vec<OccurrenceDescriptor>,
    pub warnings: Vec<ScheduleWarning>,
    pub stop: StopReason,
}

struct Slot {
    date: NaiveDate,
    times: TimeRange,
}

struct Generation {
    slots: Vec<Slot>,
    warnings: Vec<ScheduleWarning>,
    stop: StopReason,
}

impl Generation {
    fn empty(warning: ScheduleWarning) -> Self {
        Self {
            slots: Vec::new(),
            warnings: vec![warning],
            stop: StopReason::Empty,
        }
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity.min(DEFAULT_MAX_OCCURRENCES)),
            warnings: Vec::new(),
            stop: StopReason::IterationCap,
        }
    }
}

enum Step {
    Continue,
    Stop(StopReason),
}

/// Bounds shared by both frequencies for one expansion call.
struct Window {
    start: NaiveDate,
    until: NaiveDate,
    max: usize,
}

impl Window {
    fn offer(&self, generation: &mut Generation, date: NaiveDate, times: TimeRange) -> Step {
        if date < self.start {
            return Step::Continue;
        }
        if date > self.until {
            return Step::Stop(StopReason::UntilReached);
        }
        generation.slots.push(Slot { date, times });
        if generation.slots.len() >= self.max {
            return Step::Stop(StopReason::OccurrenceCap);
        }
        Step::Continue
    }
}

pub struct ScheduleEngine {
    options: EngineOptions,
    labels: Box<dyn LabelFormatter>,
}

impl Default for ScheduleEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl fmt::Debug for ScheduleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScheduleEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options: EngineOptions {
                max_occurrences: options.max_occurrences.max(1),
                iteration_cap: options.iteration_cap.max(1),
            },
            labels: Box::new(PatternLabels::default()),
        }
    }

    pub fn with_labels(mut self, labels: impl LabelFormatter + 'static) -> Self {
        self.labels = Box::new(labels);
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn expand(
        &self,
        config: &RecurrenceConfig,
        exceptions: &ExceptionList,
    ) -> Vec<OccurrenceDescriptor> {
        self.expand_report(config, exceptions).occurrences
    }

    pub fn expand_report(&self, config: &RecurrenceConfig, exceptions: &ExceptionList) -> Expansion {
        let generation = self.generate(config);

        let unresolved = generation
            .warnings
            .iter()
            .filter(|warning| matches!(warning, ScheduleWarning::OrdinalUnresolved { .. }))
            .count();
        if unresolved > 0 {
            warn!(
                unresolved,
                ordinal = ?config.month_ordinal,
                "monthly rule has no matching day in some months"
            );
        }
        if generation.stop == StopReason::IterationCap {
            warn!(cap = self.options.iteration_cap, "schedule expansion hit the iteration cap");
        }

        let occurrences: Vec<OccurrenceDescriptor> = generation
            .slots
            .into_iter()
            .map(|slot| self.describe(slot, exceptions))
            .collect();

        debug!(
            count = occurrences.len(),
            disabled = occurrences.iter().filter(|o| o.disabled).count(),
            stop = ?generation.stop,
            "expanded schedule"
        );

        Expansion {
            occurrences,
            warnings: generation.warnings,
            stop: generation.stop,
        }
    }

    fn describe(&self, slot: Slot, exceptions: &ExceptionList) -> OccurrenceDescriptor {
        let exception = exceptions.get(slot.date);
        OccurrenceDescriptor {
            date: slot.date,
            date_label: self.labels.date_label(slot.date),
            time_label: self.labels.time_label(slot.times.start, slot.times.end),
            disabled: exception.is_some(),
            reason: exception.and_then(|entry| entry.reason.clone()),
            start_time: slot.times.start,
            end_time: slot.times.end,
        }
    }

    fn generate(&self, config: &RecurrenceConfig) -> Generation {
        let (Some(start), Some(until)) = (config.start_date, config.effective_until()) else {
            debug!("no usable start date, nothing to expand");
            return Generation::empty(ScheduleWarning::MissingStartDate);
        };
        let window = Window {
            start,
            until,
            max: config
                .max_occurrences
                .map_or(self.options.max_occurrences, |cap| {
                    cap.min(self.options.max_occurrences)
                })
                .max(1),
        };
        match config.frequency {
            Frequency::Weekly => self.generate_weekly(config, &window),
            Frequency::Monthly => self.generate_monthly(config, &window),
        }
    }

    fn generate_weekly(&self, config: &RecurrenceConfig, window: &Window) -> Generation {
        let numbers = config.weekday_numbers();
        if numbers.is_empty() {
            debug!("weekly rule without weekdays");
            return Generation::empty(ScheduleWarning::NoWeekdays);
        }

        let step = Duration::weeks(i64::from(config.effective_interval()));
        let mut generation = Generation::with_capacity(window.max);
        let mut anchor = time::week_start(window.start);

        for _ in 0..self.options.iteration_cap {
            for &number in &numbers {
                let Some(candidate) =
                    anchor.checked_add_signed(Duration::days(i64::from(number) - 1))
                else {
                    generation.stop = StopReason::UntilReached;
                    return generation;
                };
                let times = config.times_for(candidate.weekday());
                if let Step::Stop(reason) = window.offer(&mut generation, candidate, times) {
                    generation.stop = reason;
                    return generation;
                }
            }
            match anchor.checked_add_signed(step) {
                Some(next) => anchor = next,
                None => {
                    generation.stop = StopReason::UntilReached;
                    return generation;
                }
            }
        }
        generation
    }

    fn generate_monthly(&self, config: &RecurrenceConfig, window: &Window) -> Generation {
        let mut generation = Generation::with_capacity(window.max);
        let weekday = match config.month_weekday {
            Some(weekday) => weekday,
            None => {
                debug!(fallback = ?FALLBACK_MONTH_WEEKDAY, "monthly rule without weekday");
                generation.warnings.push(ScheduleWarning::MonthWeekdayDefaulted);
                FALLBACK_MONTH_WEEKDAY
            }
        };

        let interval = config.effective_interval();
        let mut cursor = time::first_of_month(window.start);

        for _ in 0..self.options.iteration_cap {
            if cursor > window.until {
                generation.stop = StopReason::UntilReached;
                return generation;
            }
            match config
                .month_ordinal
                .resolve(cursor.year(), cursor.month(), weekday)
            {
                Some(candidate) => {
                    if let Step::Stop(reason) =
                        window.offer(&mut generation, candidate, config.default_times)
                    {
                        generation.stop = reason;
                        return generation;
                    }
                }
                None => {
                    debug!(year = cursor.year(), month = cursor.month(), "ordinal unresolved");
                    generation.warnings.push(ScheduleWarning::OrdinalUnresolved {
                        year: cursor.year(),
                        month: cursor.month(),
                    });
                }
            }
            match time::add_months(cursor, interval) {
                Some(next) => cursor = next,
                None => {
                    generation.stop = StopReason::UntilReached;
                    return generation;
                }
            }
        }
        generation
    }
}

/// Expands with default options and labels.
pub fn expand(config: &RecurrenceConfig, exceptions: &ExceptionList) -> Vec<OccurrenceDescriptor> {
    ScheduleEngine::default().expand(config, exceptions)
}
