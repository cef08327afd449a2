use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use schedule_core::{
    engine::{Expansion, ScheduleWarning, StopReason},
    labels::{
        is_date_pattern, is_time_pattern, PatternLabels, DEFAULT_DATE_PATTERN,
        DEFAULT_TIME_PATTERN,
    },
    time, EngineOptions, OccurrenceAction, OccurrenceDescriptor, RecurrenceDocument,
    ScheduleEngine, ScheduleSession,
};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewConfig {
    pub(crate) engine: EngineOptions,
    pub(crate) date_pattern: String,
    pub(crate) time_pattern: String,
}

impl PreviewConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Unparsable or non-positive numbers and unrenderable patterns keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(max) = lookup("SCHEDULE_MAX_OCCURRENCES") {
            if let Ok(value) = max.trim().parse::<usize>() {
                if value > 0 {
                    config.engine.max_occurrences = value;
                }
            }
        }
        if let Some(cap) = lookup("SCHEDULE_ITERATION_CAP") {
            if let Ok(value) = cap.trim().parse::<u32>() {
                if value > 0 {
                    config.engine.iteration_cap = value;
                }
            }
        }
        if let Some(pattern) = lookup("SCHEDULE_DATE_FORMAT") {
            if !pattern.trim().is_empty() && is_date_pattern(&pattern) {
                config.date_pattern = pattern;
            }
        }
        if let Some(pattern) = lookup("SCHEDULE_TIME_FORMAT") {
            if !pattern.trim().is_empty() && is_time_pattern(&pattern) {
                config.time_pattern = pattern;
            }
        }
        config
    }

    fn engine(&self) -> ScheduleEngine {
        ScheduleEngine::new(self.engine).with_labels(PatternLabels::new(
            self.date_pattern.clone(),
            self.time_pattern.clone(),
        ))
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            engine: EngineOptions::default(),
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
            time_pattern: DEFAULT_TIME_PATTERN.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewRequest {
    pub path: PathBuf,
    pub action: Option<OccurrenceAction>,
}

pub const USAGE: &str =
    "usage: schedule_preview <document.json> [exclude <date> | cancel <date> <reason...> | restore <date>]";

impl PreviewRequest {
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let path = args.next().map(PathBuf::from).ok_or_else(|| anyhow!(USAGE))?;
        let Some(verb) = args.next() else {
            return Ok(Self { path, action: None });
        };
        let date = args
            .next()
            .ok_or_else(|| anyhow!("`{verb}` needs a date\n{USAGE}"))?;
        let action = match verb.as_str() {
            "exclude" => OccurrenceAction::Exclude { date },
            "cancel" => OccurrenceAction::Cancel {
                date,
                reason: args.collect::<Vec<_>>().join(" "),
            },
            "restore" | "keep" => OccurrenceAction::Restore { date },
            other => bail!("unknown action `{other}`\n{USAGE}"),
        };
        Ok(Self {
            path,
            action: Some(action),
        })
    }
}

pub struct WeekGroup {
    pub week_start: NaiveDate,
    pub label: String,
    pub occurrences: Vec<OccurrenceDescriptor>,
}

/// Groups an ascending occurrence list by ISO week.
pub fn group_by_week(occurrences: &[OccurrenceDescriptor]) -> Vec<WeekGroup> {
    let mut groups: Vec<WeekGroup> = Vec::new();
    for occurrence in occurrences {
        let week_start = time::week_start(occurrence.date);
        match groups.last_mut() {
            Some(group) if group.week_start == week_start => {
                group.occurrences.push(occurrence.clone())
            }
            _ => groups.push(WeekGroup {
                week_start,
                label: week_start.format("%G-W%V").to_string(),
                occurrences: vec![occurrence.clone()],
            }),
        }
    }
    groups
}

pub fn render(expansion: &Expansion) -> String {
    let mut out = String::new();
    for group in group_by_week(&expansion.occurrences) {
        let _ = writeln!(out, "{} (week of {})", group.label, group.week_start);
        for occurrence in &group.occurrences {
            let _ = writeln!(out, "  {}", describe_occurrence(occurrence));
        }
    }
    for warning in &expansion.warnings {
        let _ = writeln!(out, "warning: {}", describe_warning(warning));
    }
    let _ = writeln!(
        out,
        "{} occurrence{} ({})",
        expansion.occurrences.len(),
        if expansion.occurrences.len() == 1 { "" } else { "s" },
        describe_stop(expansion.stop)
    );
    out
}

fn describe_occurrence(occurrence: &OccurrenceDescriptor) -> String {
    let mut line = occurrence.date_label.clone();
    if !occurrence.time_label.is_empty() {
        line.push_str("  ");
        line.push_str(&occurrence.time_label);
    }
    match (&occurrence.reason, occurrence.disabled) {
        (Some(reason), _) => line.push_str(&format!("  [cancelled: {reason}]")),
        (None, true) => line.push_str("  [excluded]"),
        (None, false) => {}
    }
    line
}

fn describe_warning(warning: &ScheduleWarning) -> String {
    match warning {
        ScheduleWarning::MissingStartDate => "start date is missing or not YYYY-MM-DD".to_string(),
        ScheduleWarning::NoWeekdays => "weekly rule has no weekdays selected".to_string(),
        ScheduleWarning::MonthWeekdayDefaulted => {
            "month weekday not recognised, using Saturday".to_string()
        }
        ScheduleWarning::OrdinalUnresolved { year, month } => {
            format!("no matching day in {year}-{month:02}")
        }
    }
}

fn describe_stop(stop: StopReason) -> &'static str {
    match stop {
        StopReason::Empty => "nothing to preview",
        StopReason::UntilReached => "until date reached",
        StopReason::OccurrenceCap => "occurrence limit reached",
        StopReason::IterationCap => "iteration limit reached",
    }
}

pub fn load_document(path: &Path) -> Result<RecurrenceDocument> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    RecurrenceDocument::from_json(&raw)
        .with_context(|| format!("unable to parse {}", path.display()))
}

pub fn run(config: &PreviewConfig, request: &PreviewRequest) -> Result<String> {
    info!(path = %request.path.display(), "loading recurrence document");
    let document = load_document(&request.path)?;
    let mut session = ScheduleSession::builder()
        .document(&document)
        .engine(config.engine())
        .build();

    if let Some(action) = &request.action {
        let exceptions = session
            .apply(action)
            .with_context(|| format!("unable to apply {action:?}"))?;
        debug!(count = exceptions.len(), "exceptions after action");
        let mut updated = document.clone();
        updated.set_exceptions(session.exceptions());
        let mut rendered = render(session.expansion());
        rendered.push_str("\nupdated exceptions:\n");
        rendered.push_str(&serde_json::to_string_pretty(&updated.exceptions)?);
        rendered.push('\n');
        return Ok(rendered);
    }

    Ok(render(session.expansion()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn write_document(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("schedule.json");
        fs::write(&path, contents).expect("write fixture");
        path
    }

    #[test]
    fn env_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("SCHEDULE_MAX_OCCURRENCES", "12"),
            ("SCHEDULE_ITERATION_CAP", "zero"),
            ("SCHEDULE_DATE_FORMAT", "%Y-%m-%d"),
        ]
        .into_iter()
        .collect();
        let config = PreviewConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.engine.max_occurrences, 12);
        assert_eq!(config.engine.iteration_cap, EngineOptions::default().iteration_cap);
        assert_eq!(config.date_pattern, "%Y-%m-%d");
        assert_eq!(config.time_pattern, DEFAULT_TIME_PATTERN);
    }

    #[test]
    fn env_patterns_that_cannot_render_are_ignored() {
        let vars: HashMap<&str, &str> = [
            ("SCHEDULE_DATE_FORMAT", "%Q"),
            ("SCHEDULE_TIME_FORMAT", "%Y"),
        ]
        .into_iter()
        .collect();
        let config = PreviewConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.date_pattern, DEFAULT_DATE_PATTERN);
        assert_eq!(config.time_pattern, DEFAULT_TIME_PATTERN);

        let vars: HashMap<&str, &str> = [("SCHEDULE_DATE_FORMAT", "%Y-%m-%d %H:%M")]
            .into_iter()
            .collect();
        let config = PreviewConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.date_pattern, DEFAULT_DATE_PATTERN);
    }

    #[test]
    fn parses_action_arguments() {
        let args = ["s.json", "cancel", "2024-01-08", "Leader", "absent"].map(String::from);
        let request = PreviewRequest::from_args(args).unwrap();
        assert_eq!(
            request.action,
            Some(OccurrenceAction::Cancel {
                date: "2024-01-08".into(),
                reason: "Leader absent".into()
            })
        );
        assert!(PreviewRequest::from_args(["s.json", "delete", "2024-01-08"].map(String::from))
            .is_err());
        assert!(PreviewRequest::from_args(Vec::<String>::new()).is_err());
    }

    #[test]
    fn renders_weeks_with_states() {
        let temp = tempdir().expect("tempdir");
        let path = write_document(
            temp.path(),
            r#"{
                "startDate": "2024-01-01",
                "untilDate": "2024-01-14",
                "startTime": "19:00",
                "weekdays": ["monday", "wednesday"],
                "exceptions": [{"date": "2024-01-03", "reason": "Holiday"}, "2024-01-08"]
            }"#,
        );
        let config = PreviewConfig {
            date_pattern: "%a %Y-%m-%d".to_string(),
            ..PreviewConfig::default()
        };
        let request = PreviewRequest { path, action: None };
        let output = run(&config, &request).expect("run preview");
        let expected = "\
2024-W01 (week of 2024-01-01)
  Mon 2024-01-01  19:00
  Wed 2024-01-03  19:00  [cancelled: Holiday]
2024-W02 (week of 2024-01-08)
  Mon 2024-01-08  19:00  [excluded]
  Wed 2024-01-10  19:00
4 occurrences (until date reached)
";
        assert_eq!(output, expected);
    }

    #[test]
    fn action_output_lists_updated_exceptions() {
        let temp = tempdir().expect("tempdir");
        let path = write_document(
            temp.path(),
            r#"{"startDate": "2024-01-01", "weekdays": ["monday"], "untilDate": "2024-01-31"}"#,
        );
        let request = PreviewRequest {
            path,
            action: Some(OccurrenceAction::Exclude {
                date: "2024-01-15".into(),
            }),
        };
        let output = run(&PreviewConfig::default(), &request).expect("run preview");
        assert!(output.contains("[excluded]"));
        assert!(output.contains("\"date\": \"2024-01-15\""));
    }

    #[test]
    fn missing_start_is_reported() {
        let temp = tempdir().expect("tempdir");
        let path = write_document(temp.path(), r#"{"weekdays": ["monday"]}"#);
        let output = run(
            &PreviewConfig::default(),
            &PreviewRequest { path, action: None },
        )
        .expect("run preview");
        assert!(output.contains("warning: start date is missing"));
        assert!(output.ends_with("0 occurrences (nothing to preview)\n"));
    }
}
