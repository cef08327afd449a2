//! Property tests for expansion and reconciliation invariants.

use chrono::{Duration, NaiveDate, Weekday};
use proptest::prelude::*;

use schedule_core::{
    EngineOptions, ExceptionList, MonthOrdinal, RecurrenceConfig, ScheduleEngine,
    ScheduleException,
};

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn arb_weekday() -> impl Strategy<Value = Weekday> {
    (1u8..=7).prop_map(|n| schedule_core::time::weekday_from_iso(n).unwrap())
}

fn arb_ordinal() -> impl Strategy<Value = MonthOrdinal> {
    prop_oneof![
        Just(MonthOrdinal::First),
        Just(MonthOrdinal::Second),
        Just(MonthOrdinal::Third),
        Just(MonthOrdinal::Fourth),
        Just(MonthOrdinal::Fifth),
        Just(MonthOrdinal::Last),
    ]
}

/// Weekly or monthly rules, with repeats in the weekday list and optional until dates.
fn arb_config() -> impl Strategy<Value = RecurrenceConfig> {
    let weekly = (
        arb_date(),
        prop::collection::vec(arb_weekday(), 0..10),
        0u32..6,
        prop::option::of(0i64..2000),
    )
        .prop_map(|(start, weekdays, interval, until)| {
            let mut config = RecurrenceConfig::weekly(start, weekdays).with_interval(interval);
            config.until_date = until.map(|days| start + Duration::days(days));
            config
        });
    let monthly = (
        arb_date(),
        arb_ordinal(),
        arb_weekday(),
        0u32..6,
        prop::option::of(0i64..4000),
    )
        .prop_map(|(start, ordinal, weekday, interval, until)| {
            let mut config =
                RecurrenceConfig::monthly(start, ordinal, weekday).with_interval(interval);
            config.until_date = until.map(|days| start + Duration::days(days));
            config
        });
    prop_oneof![weekly, monthly]
}

fn arb_exceptions() -> impl Strategy<Value = Vec<ScheduleException>> {
    prop::collection::vec(
        (arb_date(), prop::option::of("[a-z ]{0,12}")).prop_map(|(date, reason)| {
            ScheduleException { date, reason }
        }),
        0..20,
    )
}

proptest! {
    #[test]
    fn expansion_is_deterministic(config in arb_config(), raw in arb_exceptions()) {
        let exceptions = ExceptionList::normalize(raw);
        let engine = ScheduleEngine::default();
        prop_assert_eq!(engine.expand(&config, &exceptions), engine.expand(&config, &exceptions));
    }

    #[test]
    fn dates_strictly_ascending(config in arb_config()) {
        let out = ScheduleEngine::default().expand(&config, &ExceptionList::new());
        for pair in out.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn output_is_bounded(config in arb_config(), max in 1usize..200) {
        let engine = ScheduleEngine::new(EngineOptions { max_occurrences: max, ..EngineOptions::default() });
        let out = engine.expand(&config, &ExceptionList::new());
        prop_assert!(out.len() <= max);
        if let (Some(start), Some(until)) = (config.start_date, config.effective_until()) {
            prop_assert!(out.iter().all(|o| o.date >= start && o.date <= until));
        }
    }

    #[test]
    fn overlay_matches_exception_list(config in arb_config(), raw in arb_exceptions()) {
        let exceptions = ExceptionList::normalize(raw);
        let out = ScheduleEngine::default().expand(&config, &exceptions);
        for occurrence in &out {
            match exceptions.get(occurrence.date) {
                Some(entry) => {
                    prop_assert!(occurrence.disabled);
                    prop_assert_eq!(&occurrence.reason, &entry.reason);
                }
                None => {
                    prop_assert!(!occurrence.disabled);
                    prop_assert!(occurrence.reason.is_none());
                }
            }
        }
    }

    #[test]
    fn normalized_lists_are_sorted_and_unique(raw in arb_exceptions()) {
        let list = ExceptionList::normalize(raw);
        for pair in list.entries().windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
        prop_assert!(list.entries().iter().all(|e| e.reason.as_deref() != Some("")));
    }

    #[test]
    fn restore_undoes_exclude_and_cancel(raw in arb_exceptions(), date in arb_date(), reason in "[a-z]{1,10}") {
        let list = ExceptionList::normalize(raw.into_iter().filter(|e| e.date != date));
        prop_assert_eq!(&list.exclude(date).restore(date), &list);
        prop_assert_eq!(&list.cancel(date, &reason).unwrap().restore(date), &list);
    }
}
