use cadence_core::calendar::WorkingDays;
use cadence_core::config::EngineConfig;
use cadence_core::conflict::{detect_conflicts, find_conflicts_in, snapshots_in_window, ConflictConfig};
use cadence_core::models::*;
use cadence_core::recurrence::{apply_exceptions, expand, next_occurrence, previous_occurrence, RecurrenceManager};
use cadence_core::rrule;
use cadence_core::series::apply_edit;
use cadence_core::store::{ExceptionStore, InMemoryExceptionStore};
use cadence_core::validation::validate;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rstest::rstest;
use uuid::Uuid;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Weekly series on Tuesdays, one hour long, starting Tuesday 2025-07-01.
fn weekly_tuesday(hour: u32) -> CalendarEvent {
    let start = utc(2025, 7, 1, hour, 0);
    CalendarEvent::new("Standup", start, start + Duration::hours(1))
        .repeating(RecurrencePattern::weekly().on_days(&[2]), EndCondition::Never)
}

fn expand_with(event: &CalendarEvent, exceptions: &[RecurrenceException], window: &DateWindow) -> Vec<Occurrence> {
    apply_exceptions(expand(event, window, 500, None), exceptions)
}

// ============================================================================
// Reference Scenarios
// ============================================================================

#[test_log::test]
fn test_daily_series_fills_the_window() {
    let start = utc(2025, 7, 1, 9, 0);
    let event = CalendarEvent::new("Daily", start, start + Duration::minutes(30))
        .repeating(RecurrencePattern::daily(), EndCondition::Never);

    let occurrences = expand(&event, &DateWindow::days(date(2025, 7, 1), date(2025, 7, 10)), 10, None);

    assert_eq!(occurrences.len(), 10);
    for (i, occurrence) in occurrences.iter().enumerate() {
        assert_eq!(occurrence.sequence, i);
        assert_eq!(occurrence.actual_start, start + Duration::days(i as i64));
        assert!(!occurrence.is_exception);
    }
}

#[test]
fn test_weekly_count_stops_after_six() {
    let start = utc(2025, 7, 7, 10, 0);
    let event = CalendarEvent::new("Gym", start, start + Duration::hours(1))
        .repeating(RecurrencePattern::weekly().on_days(&[1, 3, 5]), EndCondition::Count(6));

    let occurrences = expand(&event, &DateWindow::days(date(2025, 7, 1), date(2025, 7, 31)), 500, None);

    assert_eq!(occurrences.len(), 6);
    assert!(occurrences
        .iter()
        .all(|o| [1, 3, 5].contains(&o.actual_start.weekday().num_days_from_sunday())));
    assert_eq!(occurrences.last().unwrap().actual_start, utc(2025, 7, 18, 10, 0));
}

#[test]
fn test_deleted_tuesday_is_missing() {
    let event = weekly_tuesday(14);
    let deleted = utc(2025, 7, 8, 14, 0);
    let exceptions = vec![RecurrenceException::delete(event.id, deleted)];

    let window = DateWindow::days(date(2025, 7, 1), date(2025, 8, 31));
    let occurrences = expand_with(&event, &exceptions, &window);

    assert_eq!(occurrences.len(), 8);
    assert!(occurrences.iter().all(|o| o.actual_start != deleted));
    assert!(occurrences.iter().all(|o| o.actual_start.weekday() == chrono::Weekday::Tue));
    assert_eq!(
        occurrences.iter().map(|o| o.sequence).collect::<Vec<_>>(),
        (0..8).collect::<Vec<_>>()
    );
}

#[test]
fn test_modified_occurrence_keeps_original_key() {
    let event = weekly_tuesday(10);
    let original = utc(2025, 7, 8, 10, 0);
    let changes = EventOverride::retime(utc(2025, 7, 8, 11, 0), utc(2025, 7, 8, 12, 0)).with_title("Rescheduled");
    let exceptions = vec![RecurrenceException::modified(event.id, original, changes)];

    let occurrences = expand_with(&event, &exceptions, &DateWindow::days(date(2025, 7, 1), date(2025, 7, 31)));
    let modified = occurrences.iter().find(|o| o.original_start == original).unwrap();

    assert_eq!(modified.actual_start, utc(2025, 7, 8, 11, 0));
    assert_eq!(modified.actual_end, utc(2025, 7, 8, 12, 0));
    assert!(modified.is_exception);
    assert_eq!(modified.title(), "Rescheduled");
    assert!(occurrences
        .iter()
        .filter(|o| o.original_start != original)
        .all(|o| o.title() == "Standup" && !o.is_exception));
}

#[rstest]
#[case(utc(2025, 7, 1, 9, 30), utc(2025, 7, 1, 10, 30), 0, true)]
#[case(utc(2025, 7, 1, 10, 15), utc(2025, 7, 1, 10, 45), 30, true)]
#[case(utc(2025, 7, 1, 10, 35), utc(2025, 7, 1, 11, 0), 30, false)]
#[case(utc(2025, 7, 1, 10, 0), utc(2025, 7, 1, 11, 0), 0, false)]
fn test_overlap_and_buffer(
    #[case] b_start: DateTime<Utc>,
    #[case] b_end: DateTime<Utc>,
    #[case] buffer: i64,
    #[case] expect_conflict: bool,
) {
    let a = CalendarEvent::new("A", utc(2025, 7, 1, 9, 0), utc(2025, 7, 1, 10, 0));
    let b = CalendarEvent::new("B", b_start, b_end);

    let conflicts = detect_conflicts(&a, &[b], &ConflictConfig::default().with_buffer(buffer));

    assert_eq!(!conflicts.is_empty(), expect_conflict);
    if expect_conflict {
        assert_eq!(conflicts[0].conflict_type, ConflictType::Overlap);
        assert_eq!(conflicts[0].counterpart_event.title, "B");
    }
}

#[test]
fn test_end_before_start_is_invalid_but_expands_to_nothing() {
    let start = utc(2025, 7, 1, 9, 0);
    let bounds = RecurrenceBounds::new(start).with_end(EndCondition::EndDate(start - Duration::days(3)));
    let pattern = RecurrencePattern::daily();

    let report = validate(&pattern, &bounds);
    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|e| e.field == "end_condition" && e.message.contains("end date")));

    let event = CalendarEvent::new("Broken", start, start + Duration::hours(1)).with_recurrence(pattern, bounds);
    let occurrences = expand(&event, &DateWindow::days(date(2025, 6, 1), date(2025, 8, 1)), 500, None);
    assert!(occurrences.is_empty());
}

// ============================================================================
// Engine Workflows
// ============================================================================

#[test]
fn test_expansion_is_deterministic() {
    let event = weekly_tuesday(9);
    let exceptions = vec![
        RecurrenceException::delete(event.id, utc(2025, 7, 15, 9, 0)),
        RecurrenceException::moved(event.id, utc(2025, 7, 22, 9, 0), utc(2025, 7, 23, 9, 0)),
    ];
    let window = DateWindow::days(date(2025, 7, 1), date(2025, 9, 30));

    let first = expand_with(&event, &exceptions, &window);
    let second = expand_with(&event, &exceptions, &window);
    assert_eq!(first, second);
}

#[test]
fn test_removing_exception_restores_occurrence() {
    let event = weekly_tuesday(9);
    let window = DateWindow::days(date(2025, 7, 1), date(2025, 7, 31));
    let key = utc(2025, 7, 15, 9, 0);
    let baseline = expand_with(&event, &[], &window);

    let mut store = InMemoryExceptionStore::new();
    store
        .add_exception(RecurrenceException::moved(event.id, key, key + Duration::hours(3)))
        .unwrap();
    let moved = expand_with(&event, &store.find_exceptions(event.id), &window);
    assert_ne!(moved, baseline);

    store.remove_exception(event.id, key).unwrap();
    let restored = expand_with(&event, &store.find_exceptions(event.id), &window);
    assert_eq!(restored, baseline);
}

#[test]
fn test_manager_navigation_respects_exceptions() {
    let event = weekly_tuesday(9);
    let deleted = utc(2025, 7, 15, 9, 0);
    let manager = RecurrenceManager::new(event, vec![RecurrenceException::delete(Uuid::nil(), deleted)]);
    // exceptions for other events are dropped, so the deleted slot survives here
    let manager = manager.unwrap();
    assert_eq!(manager.next_occurrence_after(utc(2025, 7, 9, 0, 0)).unwrap().actual_start, deleted);

    let event = manager.event().clone();
    let exceptions = vec![RecurrenceException::delete(event.id, deleted)];
    let next = next_occurrence(&event, &exceptions, utc(2025, 7, 9, 0, 0)).unwrap();
    assert_eq!(next.actual_start, utc(2025, 7, 22, 9, 0));
    let previous = previous_occurrence(&event, &exceptions, utc(2025, 7, 21, 0, 0)).unwrap();
    assert_eq!(previous.actual_start, utc(2025, 7, 8, 9, 0));
}

#[test]
fn test_working_days_skip_weekends_and_holidays() {
    let start = utc(2025, 12, 22, 8, 0);
    let event = CalendarEvent::new("Shift", start, start + Duration::hours(8))
        .repeating(RecurrencePattern::daily(), EndCondition::Count(5));
    let manager = RecurrenceManager::new(event, vec![])
        .unwrap()
        .with_skip_policy(WorkingDays::weekdays_only().with_holiday(date(2025, 12, 25)));

    let days: Vec<u32> = manager
        .generate_occurrences_between(start, start + Duration::days(30))
        .iter()
        .map(|o| o.actual_start.day())
        .collect();

    assert_eq!(days, vec![22, 23, 24, 26, 29]);
}

#[test]
fn test_this_and_future_edit_splits_series() {
    let event = weekly_tuesday(9);
    let split_at = utc(2025, 7, 22, 9, 0);
    let changes = EventOverride::default().with_title("Planning");

    let outcome = apply_edit(&event, &[], split_at, EditScope::ThisAndFuture, &changes).unwrap();
    let tail = outcome.split_off.expect("future edits produce a new series");
    let window = DateWindow::days(date(2025, 7, 1), date(2025, 8, 31));

    let head: Vec<_> = expand(&outcome.updated.event, &window, 500, None);
    assert_eq!(head.last().unwrap().actual_start, utc(2025, 7, 15, 9, 0));

    let future = expand(&tail.event, &window, 500, None);
    assert_eq!(future.first().unwrap().actual_start, split_at);
    assert!(future.iter().all(|o| o.title() == "Planning"));
    assert_eq!(head.len() + future.len(), expand(&event, &window, 500, None).len());
}

#[test]
fn test_calendar_wide_conflict_scan() {
    let event = weekly_tuesday(9).with_attendees(["ana@example.com"]);
    let review = CalendarEvent::new("Review", utc(2025, 7, 8, 9, 30), utc(2025, 7, 8, 10, 30))
        .with_attendees(["ANA@example.com"]);
    let lunch = CalendarEvent::new("Lunch", utc(2025, 7, 8, 12, 0), utc(2025, 7, 8, 13, 0));
    let window = DateWindow::days(date(2025, 7, 1), date(2025, 7, 14));

    let snapshots = snapshots_in_window(&[event, review, lunch], &[], &window, &EngineConfig::default(), None);
    assert_eq!(snapshots.len(), 4);

    let conflicts = find_conflicts_in(&snapshots, &ConflictConfig::default());
    assert_eq!(conflicts.len(), 1);
    let (first, conflict) = &conflicts[0];
    assert_eq!(first.start, utc(2025, 7, 8, 9, 0));
    assert_eq!(conflict.conflict_type, ConflictType::DoubleBooking);
    assert_eq!(conflict.overlap_minutes, 30);
}

// ============================================================================
// Cross-check Against the rrule Crate
// ============================================================================

#[rstest]
#[case("FREQ=DAILY;INTERVAL=3")]
#[case("FREQ=WEEKLY;BYDAY=MO,WE,FR")]
#[case("FREQ=WEEKLY;BYDAY=TU;COUNT=5")]
#[case("FREQ=MONTHLY;BYMONTHDAY=31")]
#[case("FREQ=MONTHLY;BYMONTHDAY=15;INTERVAL=2")]
#[case("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29")]
fn test_expansion_matches_rrule_crate(#[case] rule: &str) {
    let anchor = utc(2024, 1, 1, 9, 0);
    let parsed = rrule::parse_rule(rule).unwrap();
    let event = CalendarEvent::new("Reference", anchor, anchor + Duration::hours(1))
        .repeating(parsed.pattern, parsed.end_condition.unwrap_or(EndCondition::Never));

    let ours: Vec<DateTime<Utc>> = expand(&event, &DateWindow::starting_at(anchor, 365 * 50), 12, None)
        .iter()
        .map(|o| o.actual_start)
        .collect();

    let set: ::rrule::RRuleSet = format!("DTSTART:20240101T090000Z\nRRULE:{rule}").parse().unwrap();
    let reference: Vec<DateTime<Utc>> = set.into_iter().take(12).map(|dt| dt.with_timezone(&Utc)).collect();

    assert_eq!(ours, reference, "rule {rule}");
}

// ============================================================================
// Properties
// ============================================================================

fn any_frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::None),
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::MonthlyByDate),
        Just(Frequency::MonthlyByWeekday),
        Just(Frequency::YearlyByDate),
        Just(Frequency::YearlyByWeekday),
    ]
}

fn expressible_pattern() -> impl Strategy<Value = RecurrencePattern> {
    (
        any_frequency().prop_filter("needs a frequency", |f| *f != Frequency::None),
        1..=12i32,
        proptest::collection::btree_set(0u8..7, 0..4),
        proptest::option::of(1u32..=31),
        proptest::option::of(0u32..12),
    )
        .prop_map(|(frequency, interval, days, day_of_month, month)| RecurrencePattern {
            frequency,
            interval,
            days_of_week: (!days.is_empty()).then(|| days.into_iter().collect()),
            day_of_month,
            month,
            custom_rule: None,
        })
}

proptest! {
    #[test]
    fn prop_expansion_is_bounded(
        frequency in any_frequency(),
        interval in -3..=10i32,
        days in proptest::collection::vec(0u8..9, 0..5),
        max in 1usize..60,
        offset_days in 0i64..4000,
    ) {
        let anchor = utc(2025, 1, 31, 8, 0);
        let pattern = RecurrencePattern { frequency, interval, days_of_week: Some(days), ..RecurrencePattern::default() };
        let event = CalendarEvent::new("Prop", anchor, anchor + Duration::minutes(45))
            .repeating(pattern, EndCondition::Never);
        let window = DateWindow::starting_at(anchor + Duration::days(offset_days), 3650);

        let occurrences = expand(&event, &window, max, None);
        prop_assert!(occurrences.len() <= max);
        prop_assert!(occurrences.windows(2).all(|w| w[0].original_start < w[1].original_start));
        prop_assert!(occurrences.iter().all(|o| window.contains(o.actual_start)));
    }

    #[test]
    fn prop_overlap_is_symmetric(
        a_offset in 0i64..600,
        a_len in 0i64..240,
        b_offset in 0i64..600,
        b_len in 0i64..240,
    ) {
        let base = utc(2025, 7, 1, 8, 0);
        let a_start = base + Duration::minutes(a_offset);
        let b_start = base + Duration::minutes(b_offset);
        let a = CalendarEvent::new("A", a_start, a_start + Duration::minutes(a_len));
        let b = CalendarEvent::new("B", b_start, b_start + Duration::minutes(b_len));
        let config = ConflictConfig::default();

        let forward = detect_conflicts(&a, std::slice::from_ref(&b), &config);
        let backward = detect_conflicts(&b, std::slice::from_ref(&a), &config);
        prop_assert_eq!(forward.is_empty(), backward.is_empty());
    }

    #[test]
    fn prop_rrule_generation_is_stable(pattern in expressible_pattern(), count in proptest::option::of(1u32..100)) {
        let anchor = utc(2025, 3, 11, 9, 0);
        let end = count.map_or(EndCondition::Never, EndCondition::Count);
        let bounds = RecurrenceBounds::new(anchor).with_end(end);

        let text = rrule::generate(&pattern, &bounds);
        let parsed = rrule::parse_rule(&text).unwrap();
        let reparsed_bounds = RecurrenceBounds::new(anchor).with_end(parsed.end_condition.unwrap_or(EndCondition::Never));

        prop_assert_eq!(rrule::generate(&parsed.pattern, &reparsed_bounds), text);
    }
}
