//! Edits applied to one occurrence of a recurring event, scoped to that occurrence,
//! to it and every later one, or to the whole series.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{CalendarEvent, EditScope, EndCondition, EventOverride, RecurrenceException};
use crate::recurrence::navigator::{count_before, occurs_at};

/// A master event together with the exceptions that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesState {
    pub event: CalendarEvent,
    pub exceptions: Vec<RecurrenceException>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    /// The edited (or truncated) original series
    pub updated: SeriesState,
    /// The new series created by a "this and future" split
    pub split_off: Option<SeriesState>,
}

/// Applies `changes` to the occurrence originally starting at `occurrence_start`.
///
/// # Behavior
/// - `ThisOccurrence`: records a `Modify` exception, the master is unchanged
/// - `EntireSeries`: updates the master in place; exceptions follow a start shift
/// - `ThisAndFuture`: truncates the master before the occurrence and starts a new
///   series there with the changes applied. Splitting at the first occurrence edits the
///   entire series instead.
///
/// `occurrence_start` must be produced by the series pattern, otherwise `InvalidInput`.
pub fn apply_edit(
    master: &CalendarEvent,
    exceptions: &[RecurrenceException],
    occurrence_start: DateTime<Utc>,
    scope: EditScope,
    changes: &EventOverride,
) -> Result<EditOutcome, CoreError> {
    if !master.is_recurring() {
        return Err(CoreError::NotRecurring(master.id));
    }
    if !occurs_at(master, occurrence_start) {
        return Err(CoreError::InvalidInput(format!(
            "{} is not an occurrence of event {}",
            occurrence_start, master.id
        )));
    }

    let own: Vec<RecurrenceException> = exceptions
        .iter()
        .filter(|e| e.event_id == master.id)
        .cloned()
        .collect();

    debug!(event_id = %master.id, %occurrence_start, %scope, "applying series edit");
    match scope {
        EditScope::ThisOccurrence => edit_occurrence(master, own, occurrence_start, changes),
        EditScope::EntireSeries => edit_series(master, own, occurrence_start, changes),
        EditScope::ThisAndFuture if count_before(master, occurrence_start) == 0 => {
            edit_series(master, own, occurrence_start, changes)
        }
        EditScope::ThisAndFuture => split_series(master, own, occurrence_start, changes),
    }
}

fn edit_occurrence(
    master: &CalendarEvent,
    mut exceptions: Vec<RecurrenceException>,
    occurrence_start: DateTime<Utc>,
    changes: &EventOverride,
) -> Result<EditOutcome, CoreError> {
    if changes.is_empty() {
        return Err(CoreError::InvalidInput("no changes given for the occurrence".into()));
    }

    exceptions.retain(|e| e.original_start != occurrence_start);
    exceptions.push(RecurrenceException::modified(master.id, occurrence_start, changes.clone()));
    exceptions.sort_by_key(|e| e.original_start);

    Ok(EditOutcome {
        updated: SeriesState {
            event: master.clone(),
            exceptions,
        },
        split_off: None,
    })
}

fn edit_series(
    master: &CalendarEvent,
    exceptions: Vec<RecurrenceException>,
    occurrence_start: DateTime<Utc>,
    changes: &EventOverride,
) -> Result<EditOutcome, CoreError> {
    let (shift, duration) = retiming(master, occurrence_start, changes)?;

    let mut event = master.clone();
    event.start = shifted(master.start, shift)?;
    event.end = shifted(event.start, duration)?;
    if let Some(recurrence) = event.recurrence.as_mut() {
        recurrence.bounds.start_date = shifted(recurrence.bounds.start_date, shift)?;
    }
    apply_fields(&mut event, changes);

    let exceptions: Vec<RecurrenceException> = exceptions
        .into_iter()
        .map(|mut e| {
            shifted(e.original_start, shift).map(|start| {
                e.original_start = start;
                e
            })
        })
        .collect::<Result<_, CoreError>>()?;

    Ok(EditOutcome {
        updated: SeriesState { event, exceptions },
        split_off: None,
    })
}

fn split_series(
    master: &CalendarEvent,
    exceptions: Vec<RecurrenceException>,
    occurrence_start: DateTime<Utc>,
    changes: &EventOverride,
) -> Result<EditOutcome, CoreError> {
    let (shift, duration) = retiming(master, occurrence_start, changes)?;
    let before = count_before(master, occurrence_start);

    let mut old = master.clone();
    let mut new = master.clone();
    new.id = Uuid::now_v7();
    new.start = shifted(occurrence_start, shift)?;
    new.end = shifted(new.start, duration)?;
    apply_fields(&mut new, changes);

    if let (Some(old_rec), Some(new_rec)) = (old.recurrence.as_mut(), new.recurrence.as_mut()) {
        let (old_end, new_end) = match old_rec.bounds.end_condition {
            EndCondition::Count(n) => (EndCondition::Count(before), EndCondition::Count(n.saturating_sub(before))),
            other => (EndCondition::EndDate(shifted(occurrence_start, -Duration::seconds(1))?), other),
        };
        old_rec.bounds.end_condition = old_end;
        new_rec.bounds.start_date = new.start;
        new_rec.bounds.end_condition = new_end;
    }

    let (kept, moved): (Vec<_>, Vec<_>) = exceptions
        .into_iter()
        .partition(|e| e.original_start < occurrence_start);
    let moved: Vec<RecurrenceException> = moved
        .into_iter()
        .map(|mut e| {
            e.event_id = new.id;
            shifted(e.original_start, shift).map(|start| {
                e.original_start = start;
                e
            })
        })
        .collect::<Result<_, CoreError>>()?;

    debug!(old = %old.id, new = %new.id, before, "split series");
    Ok(EditOutcome {
        updated: SeriesState {
            event: old,
            exceptions: kept,
        },
        split_off: Some(SeriesState {
            event: new,
            exceptions: moved,
        }),
    })
}

/// Start shift and new duration implied by the changes for an occurrence.
fn retiming(
    master: &CalendarEvent,
    occurrence_start: DateTime<Utc>,
    changes: &EventOverride,
) -> Result<(Duration, Duration), CoreError> {
    let new_start = changes.start.unwrap_or(occurrence_start);
    let duration = match changes.end {
        Some(end) if end < new_start => {
            return Err(CoreError::InvalidInput("new end is before the new start".into()));
        }
        Some(end) => end - new_start,
        None => master.duration(),
    };
    Ok((new_start - occurrence_start, duration))
}

fn shifted(at: DateTime<Utc>, delta: Duration) -> Result<DateTime<Utc>, CoreError> {
    at.checked_add_signed(delta)
        .ok_or_else(|| CoreError::InvalidInput(format!("{at} moved by {delta} is out of range")))
}

fn apply_fields(event: &mut CalendarEvent, changes: &EventOverride) {
    if let Some(title) = &changes.title {
        event.title = title.clone();
    }
    if let Some(description) = &changes.description {
        event.description = Some(description.clone());
    }
    if let Some(location) = &changes.location {
        event.location = Some(location.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateWindow, ExceptionAction, Occurrence, RecurrencePattern};
    use crate::recurrence::{apply_exceptions, expand};
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, d, 9, 0, 0).unwrap()
    }

    fn daily(end: EndCondition) -> CalendarEvent {
        CalendarEvent::new("Standup", day(1), day(1) + Duration::minutes(15))
            .repeating(RecurrencePattern::daily(), end)
    }

    fn window() -> DateWindow {
        DateWindow::new(day(1), day(31))
    }

    fn expand_state(state: &SeriesState) -> Vec<Occurrence> {
        apply_exceptions(expand(&state.event, &window(), 500, None), &state.exceptions)
    }

    mod occurrence_scope_tests {
        use super::*;

        #[test]
        fn test_this_occurrence_adds_modify_exception() {
            let master = daily(EndCondition::Count(5));
            let changes = EventOverride::default().with_title("Demo day");
            let outcome = apply_edit(&master, &[], day(3), EditScope::ThisOccurrence, &changes).unwrap();

            assert_eq!(outcome.updated.event, master);
            assert!(outcome.split_off.is_none());
            assert_eq!(outcome.updated.exceptions.len(), 1);
            assert!(matches!(outcome.updated.exceptions[0].action, ExceptionAction::Modify(_)));

            let titles: Vec<String> = expand_state(&outcome.updated).iter().map(|o| o.title().to_string()).collect();
            assert_eq!(titles[2], "Demo day");
        }

        #[test]
        fn test_this_occurrence_replaces_existing_exception() {
            let master = daily(EndCondition::Count(5));
            let existing = vec![RecurrenceException::delete(master.id, day(3))];
            let changes = EventOverride::default().with_title("Restored");
            let outcome = apply_edit(&master, &existing, day(3), EditScope::ThisOccurrence, &changes).unwrap();
            assert_eq!(outcome.updated.exceptions.len(), 1);
            assert_eq!(expand_state(&outcome.updated).len(), 5);
        }

        #[test]
        fn test_empty_changes_rejected_for_single_occurrence() {
            let master = daily(EndCondition::Count(5));
            let result = apply_edit(&master, &[], day(3), EditScope::ThisOccurrence, &EventOverride::default());
            assert!(matches!(result, Err(CoreError::InvalidInput(_))));
        }

        #[test]
        fn test_unknown_occurrence_is_rejected() {
            let master = daily(EndCondition::Count(5));
            let changes = EventOverride::default().with_title("x");
            let off_slot = day(3) + Duration::minutes(1);
            assert!(matches!(
                apply_edit(&master, &[], off_slot, EditScope::ThisOccurrence, &changes),
                Err(CoreError::InvalidInput(_))
            ));
            assert!(matches!(
                apply_edit(&master, &[], day(6), EditScope::ThisOccurrence, &changes),
                Err(CoreError::InvalidInput(_))
            ));
        }
    }

    mod series_scope_tests {
        use super::*;

        #[test]
        fn test_entire_series_shift_rekeys_exceptions() {
            let master = daily(EndCondition::Count(5));
            let exceptions = vec![RecurrenceException::delete(master.id, day(4))];
            let changes = EventOverride {
                start: Some(day(2) + Duration::hours(1)),
                ..Default::default()
            };
            let outcome = apply_edit(&master, &exceptions, day(2), EditScope::EntireSeries, &changes).unwrap();

            let updated = &outcome.updated;
            assert_eq!(updated.event.start, day(1) + Duration::hours(1));
            assert_eq!(updated.event.duration(), Duration::minutes(15));
            assert_eq!(updated.exceptions[0].original_start, day(4) + Duration::hours(1));

            let starts: Vec<_> = expand_state(updated).iter().map(|o| o.actual_start).collect();
            assert_eq!(starts.len(), 4);
            assert!(!starts.contains(&(day(4) + Duration::hours(1))));
        }

        #[test]
        fn test_future_at_first_occurrence_edits_whole_series() {
            let master = daily(EndCondition::Never);
            let changes = EventOverride::default().with_title("Daily sync");
            let outcome = apply_edit(&master, &[], day(1), EditScope::ThisAndFuture, &changes).unwrap();
            assert!(outcome.split_off.is_none());
            assert_eq!(outcome.updated.event.id, master.id);
            assert_eq!(outcome.updated.event.title, "Daily sync");
        }

        #[test]
        fn test_split_without_changes_keeps_every_occurrence() {
            let master = daily(EndCondition::EndDate(day(20)));
            let exceptions = vec![
                RecurrenceException::delete(master.id, day(3)),
                RecurrenceException::delete(master.id, day(12)),
            ];
            let original: Vec<_> = apply_exceptions(expand(&master, &window(), 500, None), &exceptions)
                .iter()
                .map(|o| o.actual_start)
                .collect();

            let outcome =
                apply_edit(&master, &exceptions, day(10), EditScope::ThisAndFuture, &EventOverride::default()).unwrap();
            let tail = outcome.split_off.as_ref().unwrap();
            assert_ne!(tail.event.id, master.id);
            assert_eq!(outcome.updated.exceptions.len(), 1);
            assert_eq!(tail.exceptions.len(), 1);
            assert_eq!(tail.exceptions[0].event_id, tail.event.id);

            let mut combined: Vec<_> = expand_state(&outcome.updated)
                .into_iter()
                .chain(expand_state(tail))
                .map(|o| o.actual_start)
                .collect();
            combined.sort();
            assert_eq!(combined, original);
        }

        #[test]
        fn test_split_counted_series_divides_the_count() {
            let master = daily(EndCondition::Count(10));
            let changes = EventOverride::default().with_title("Later standup");
            let outcome = apply_edit(&master, &[], day(4), EditScope::ThisAndFuture, &changes).unwrap();

            let head = &outcome.updated;
            let tail = outcome.split_off.as_ref().unwrap();
            assert_eq!(head.event.recurrence.as_ref().unwrap().bounds.end_condition, EndCondition::Count(3));
            assert_eq!(tail.event.recurrence.as_ref().unwrap().bounds.end_condition, EndCondition::Count(7));
            assert_eq!(expand_state(head).len(), 3);
            assert!(expand_state(tail).iter().all(|o| o.title() == "Later standup"));
        }

        #[test]
        fn test_split_with_time_change_shifts_tail() {
            let master = daily(EndCondition::Count(6));
            let exceptions = vec![RecurrenceException::delete(master.id, day(5))];
            let changes = EventOverride::retime(day(4) + Duration::hours(2), day(4) + Duration::hours(3));
            let outcome = apply_edit(&master, &exceptions, day(4), EditScope::ThisAndFuture, &changes).unwrap();

            let tail = outcome.split_off.unwrap();
            assert_eq!(tail.event.start, day(4) + Duration::hours(2));
            assert_eq!(tail.event.duration(), Duration::hours(1));
            assert_eq!(tail.exceptions[0].original_start, day(5) + Duration::hours(2));

            let starts: Vec<_> = expand_state(&tail).iter().map(|o| o.actual_start).collect();
            assert_eq!(starts, vec![day(4) + Duration::hours(2), day(6) + Duration::hours(2)]);
        }

        #[test]
        fn test_end_before_start_is_rejected() {
            let master = daily(EndCondition::Count(6));
            let changes = EventOverride::retime(day(4), day(4) - Duration::hours(1));
            assert!(matches!(
                apply_edit(&master, &[], day(4), EditScope::EntireSeries, &changes),
                Err(CoreError::InvalidInput(_))
            ));
        }

        #[test]
        fn test_shift_past_end_of_time_is_rejected() {
            let master = daily(EndCondition::Never);
            let changes = EventOverride {
                start: Some(DateTime::<Utc>::MAX_UTC - Duration::minutes(1)),
                ..EventOverride::default()
            };
            for (scope, at) in [(EditScope::ThisAndFuture, day(3)), (EditScope::EntireSeries, day(1))] {
                assert!(matches!(
                    apply_edit(&master, &[], at, scope, &changes),
                    Err(CoreError::InvalidInput(_))
                ));
            }
        }

        #[test]
        fn test_single_event_is_not_recurring() {
            let single = CalendarEvent::new("Once", day(1), day(1) + Duration::hours(1));
            let changes = EventOverride::default().with_title("x");
            assert!(matches!(
                apply_edit(&single, &[], day(1), EditScope::EntireSeries, &changes),
                Err(CoreError::NotRecurring(_))
            ));
        }
    }
}
