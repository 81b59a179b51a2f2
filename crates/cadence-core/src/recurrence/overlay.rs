//! Applies recurrence exceptions on top of raw occurrences.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::models::{saturating_add, ExceptionAction, Occurrence, RecurrenceException};

/// Exceptions keyed by the original start they apply to.
pub(crate) type ExceptionIndex<'a> = HashMap<DateTime<Utc>, &'a RecurrenceException>;

/// Builds the lookup map. When two exceptions share a key the later one wins.
pub(crate) fn index_exceptions(exceptions: &[RecurrenceException]) -> ExceptionIndex<'_> {
    let mut index = HashMap::with_capacity(exceptions.len());
    for exception in exceptions {
        index.insert(exception.original_start, exception);
    }
    index
}

/// Applies exceptions to an expansion and re-sequences the survivors `0..n`.
///
/// Deleted occurrences vanish. Moved and modified occurrences keep their
/// `original_start` and are flagged with `is_exception`. Exceptions whose key matches
/// no raw occurrence are ignored. Output order follows the raw order, so a moved
/// occurrence stays in its original slot even if its new start sorts elsewhere.
#[tracing::instrument(level = "debug", skip_all, fields(raw = raw.len(), exceptions = exceptions.len()))]
pub fn apply_exceptions(raw: Vec<Occurrence>, exceptions: &[RecurrenceException]) -> Vec<Occurrence> {
    let index = index_exceptions(exceptions);
    apply_index(raw, &index)
}

pub(crate) fn apply_index(raw: Vec<Occurrence>, index: &ExceptionIndex<'_>) -> Vec<Occurrence> {
    let mut result = Vec::with_capacity(raw.len());
    let mut matched = 0usize;

    for occurrence in raw {
        let exception = index.get(&occurrence.original_start).copied();
        if exception.is_some() {
            matched += 1;
        }
        if let Some(mut survivor) = apply_exception(occurrence, exception) {
            survivor.sequence = result.len();
            result.push(survivor);
        }
    }

    if matched < index.len() {
        debug!(unmatched = index.len() - matched, "exceptions outside this expansion");
    }
    result
}

/// Applies at most one exception to a single occurrence. `None` means deleted.
pub fn apply_exception(occurrence: Occurrence, exception: Option<&RecurrenceException>) -> Option<Occurrence> {
    let Some(exception) = exception else {
        return Some(occurrence);
    };

    match &exception.action {
        ExceptionAction::Delete => None,
        ExceptionAction::Move { new_start } => Some(retime(occurrence, *new_start, None)),
        ExceptionAction::Modify(changes) => {
            let start = changes.start.unwrap_or(occurrence.actual_start);
            let mut modified = retime(occurrence, start, changes.end);
            let event = &mut modified.source_event;
            if let Some(title) = &changes.title {
                event.title = title.clone();
            }
            if let Some(description) = &changes.description {
                event.description = Some(description.clone());
            }
            if let Some(location) = &changes.location {
                event.location = Some(location.clone());
            }
            Some(modified)
        }
    }
}

/// Places the occurrence at `start`; without an explicit end the original duration is kept.
fn retime(mut occurrence: Occurrence, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Occurrence {
    let duration = occurrence.actual_end - occurrence.actual_start;
    let end = end.unwrap_or_else(|| saturating_add(start, duration));

    occurrence.actual_start = start;
    occurrence.actual_end = end;
    occurrence.source_event.start = start;
    occurrence.source_event.end = end;
    occurrence.is_exception = true;
    occurrence
}
