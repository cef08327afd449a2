use chrono::NaiveDate;
use schedule_core::{
    expand, ExceptionList, OccurrenceAction, RecurrenceDocument, ScheduleError, ScheduleSession,
};
use serde_json::json;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn weekly_document() -> RecurrenceDocument {
    RecurrenceDocument::from_value(json!({
        "startDate": "2024-01-01",
        "startTime": "19:00",
        "endTime": "21:00",
        "frequency": "weekly",
        "interval": 1,
        "weekdays": ["monday", "wednesday"]
    }))
    .expect("weekly document")
}

#[test]
fn weekly_preview_from_form_payload() {
    let doc = weekly_document();
    let occurrences = expand(&doc.to_config(), &doc.to_exceptions());
    let first: Vec<_> = occurrences.iter().take(4).map(|o| o.date).collect();
    assert_eq!(
        first,
        vec![ymd(2024, 1, 1), ymd(2024, 1, 3), ymd(2024, 1, 8), ymd(2024, 1, 10)]
    );
    assert!(occurrences.iter().all(|o| o.date <= ymd(2024, 7, 1)));
    assert!(occurrences.iter().all(|o| o.time_label == "19:00 – 21:00"));
}

#[test]
fn monthly_first_saturday_and_last_friday() {
    let first_saturday = RecurrenceDocument::from_value(json!({
        "startDate": "2024-01-01",
        "frequency": "monthly",
        "monthOrdinal": "first",
        "monthWeekday": "saturday"
    }))
    .unwrap();
    let out = expand(&first_saturday.to_config(), &ExceptionList::new());
    assert_eq!(out[0].date, ymd(2024, 1, 6));
    assert_eq!(out[1].date, ymd(2024, 2, 3));

    let last_friday = RecurrenceDocument::from_value(json!({
        "startDate": "2024-02-01",
        "frequency": "monthly",
        "monthOrdinal": "last",
        "monthWeekday": "friday"
    }))
    .unwrap();
    let out = expand(&last_friday.to_config(), &ExceptionList::new());
    assert_eq!(out[0].date, ymd(2024, 2, 23));
}

#[test]
fn holiday_exception_is_overlaid() {
    let mut doc = weekly_document();
    doc.exceptions = Some(vec![serde_json::from_value(
        json!({ "date": "2024-01-03", "reason": "Holiday" }),
    )
    .unwrap()]);
    let out = expand(&doc.to_config(), &doc.to_exceptions());
    let holiday = out.iter().find(|o| o.date == ymd(2024, 1, 3)).unwrap();
    assert!(holiday.disabled);
    assert_eq!(holiday.reason.as_deref(), Some("Holiday"));
    let monday = out.iter().find(|o| o.date == ymd(2024, 1, 1)).unwrap();
    assert!(!monday.disabled);
    assert_eq!(monday.reason, None);
}

#[test]
fn exclude_then_cancel_keeps_one_entry() {
    let mut session = ScheduleSession::builder()
        .document(&weekly_document())
        .build();
    session
        .apply(&OccurrenceAction::Exclude {
            date: "2024-01-08".into(),
        })
        .unwrap();
    let exceptions = session
        .apply(&OccurrenceAction::Cancel {
            date: "2024-01-08".into(),
            reason: "Storm".into(),
        })
        .unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions.entries()[0].date, ymd(2024, 1, 8));
    assert_eq!(exceptions.entries()[0].reason.as_deref(), Some("Storm"));
}

#[test]
fn cancel_requires_reason() {
    let mut session = ScheduleSession::builder()
        .document(&weekly_document())
        .build();
    for reason in ["", "   "] {
        let err = session
            .apply(&OccurrenceAction::Cancel {
                date: "2024-01-10".into(),
                reason: reason.into(),
            })
            .unwrap_err();
        assert!(matches!(err, ScheduleError::EmptyReason));
    }
    assert!(session.exceptions().is_empty());

    session
        .apply(&OccurrenceAction::Cancel {
            date: "2024-01-10".into(),
            reason: "Leader absent".into(),
        })
        .unwrap();
    let occurrence = session.occurrence(ymd(2024, 1, 10)).unwrap();
    assert_eq!(occurrence.reason.as_deref(), Some("Leader absent"));
}

#[test]
fn saved_document_round_trips() {
    let mut doc = weekly_document();
    let mut session = ScheduleSession::builder().document(&doc).build();
    session
        .apply(&OccurrenceAction::Cancel {
            date: "2024-01-15".into(),
            reason: "Hall closed".into(),
        })
        .unwrap();
    doc.set_exceptions(session.exceptions());

    let saved = serde_json::to_string(&doc).unwrap();
    let reloaded = RecurrenceDocument::from_json(&saved).unwrap();
    let out = expand(&reloaded.to_config(), &reloaded.to_exceptions());
    assert_eq!(out, session.occurrences());
}
