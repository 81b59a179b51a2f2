//! Scheduling conflict detection.
//!
//! Two events conflict when their half-open intervals `[start, end)` intersect. A buffer
//! widens the *candidate* on both sides, so back-to-back events only collide when a
//! buffer is configured. Malformed events (end before start) never conflict.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::calendar::SkipPolicy;
use crate::config::EngineConfig;
use crate::models::{
    CalendarEvent, ConflictType, DateWindow, EventConflict, Occurrence, OccurrenceConflicts,
    RecurrenceException,
};
use crate::recurrence::{apply_exceptions, expand};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Minutes of padding required around the candidate
    pub buffer_minutes: i64,
    pub detect_overlap: bool,
    /// Report overlaps sharing an attendee as double bookings
    pub detect_double_booking: bool,
    /// Report overlaps in the same location (with no shared attendee) as resource conflicts
    pub detect_resource_conflicts: bool,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            buffer_minutes: 0,
            detect_overlap: true,
            detect_double_booking: true,
            detect_resource_conflicts: false,
        }
    }
}

impl ConflictConfig {
    pub fn with_buffer(mut self, minutes: i64) -> Self {
        self.buffer_minutes = minutes;
        self
    }

    fn buffer(&self) -> Duration {
        Duration::try_minutes(self.buffer_minutes.max(0)).unwrap_or_else(Duration::zero)
    }
}

/// Conflicts between `candidate` and each event in `existing`.
///
/// Events sharing the candidate's id are skipped, so a calendar may be passed in
/// whole even when it contains the candidate itself.
#[tracing::instrument(level = "debug", skip_all, fields(candidate = %candidate.id, existing = existing.len()))]
pub fn detect_conflicts(
    candidate: &CalendarEvent,
    existing: &[CalendarEvent],
    config: &ConflictConfig,
) -> Vec<EventConflict> {
    if !config.detect_overlap {
        return Vec::new();
    }

    let conflicts: Vec<EventConflict> = existing
        .iter()
        .filter(|other| other.id != candidate.id)
        .filter_map(|other| conflict_between(candidate, other, config))
        .collect();

    debug!(found = conflicts.len(), "conflict scan finished");
    conflicts
}

/// Expands a (possibly recurring) candidate inside `window` and checks every
/// occurrence against `existing`. Only occurrences with at least one conflict are
/// returned.
///
/// Exceptions belonging to other events are ignored; dates removed by `skip` are not
/// occurrences and cannot conflict.
pub fn detect_recurring_conflicts(
    candidate: &CalendarEvent,
    exceptions: &[RecurrenceException],
    existing: &[CalendarEvent],
    window: &DateWindow,
    engine: &EngineConfig,
    skip: Option<&dyn SkipPolicy>,
) -> Vec<OccurrenceConflicts> {
    let occurrences = if candidate.is_recurring() {
        expand_with_exceptions(candidate, exceptions, window, engine, skip)
    } else if intersects_window(candidate, window) {
        vec![Occurrence::from_master(candidate, candidate.start, 0)]
    } else {
        Vec::new()
    };

    conflicts_for_occurrences(occurrences, existing, &engine.conflict)
}

pub(crate) fn conflicts_for_occurrences(
    occurrences: Vec<Occurrence>,
    existing: &[CalendarEvent],
    config: &ConflictConfig,
) -> Vec<OccurrenceConflicts> {
    occurrences
        .into_iter()
        .filter_map(|occurrence| {
            let conflicts = detect_conflicts(&occurrence.source_event, existing, config);
            (!conflicts.is_empty()).then_some(OccurrenceConflicts {
                occurrence,
                conflicts,
            })
        })
        .collect()
}

/// Every conflicting pair inside one list, each unordered pair reported once.
///
/// The first element of each result is the earlier-starting event of the pair; the
/// conflict's counterpart is the other one.
pub fn find_conflicts_in<'a>(
    events: &'a [CalendarEvent],
    config: &ConflictConfig,
) -> Vec<(&'a CalendarEvent, EventConflict)> {
    if !config.detect_overlap {
        return Vec::new();
    }

    let mut sorted: Vec<&CalendarEvent> = events.iter().filter(|e| e.end >= e.start).collect();
    sorted.sort_by_key(|e| (e.start, e.end));
    let buffer = config.buffer();

    let mut found = Vec::new();
    for (i, candidate) in sorted.iter().enumerate() {
        let reach = candidate.end.checked_add_signed(buffer).unwrap_or(candidate.end);
        for other in sorted[i + 1..].iter().take_while(|o| o.start < reach) {
            if other.id == candidate.id {
                continue;
            }
            if let Some(conflict) = conflict_between(candidate, other, config) {
                found.push((*candidate, conflict));
            }
        }
    }

    debug!(events = events.len(), found = found.len(), "pairwise conflict scan finished");
    found
}

/// Snapshots of every event as it appears inside `window`: recurring masters are
/// expanded with their exceptions applied and `skip` honoured, single events are kept
/// when they intersect.
pub fn snapshots_in_window(
    events: &[CalendarEvent],
    exceptions: &[RecurrenceException],
    window: &DateWindow,
    engine: &EngineConfig,
    skip: Option<&dyn SkipPolicy>,
) -> Vec<CalendarEvent> {
    let mut snapshots = Vec::new();
    for event in events {
        if event.is_recurring() {
            let occurrences = expand_with_exceptions(event, exceptions, window, engine, skip);
            snapshots.extend(occurrences.into_iter().map(|o| o.source_event));
        } else if intersects_window(event, window) {
            snapshots.push(event.clone());
        }
    }
    snapshots
}

fn expand_with_exceptions(
    event: &CalendarEvent,
    exceptions: &[RecurrenceException],
    window: &DateWindow,
    engine: &EngineConfig,
    skip: Option<&dyn SkipPolicy>,
) -> Vec<Occurrence> {
    let own: Vec<RecurrenceException> = exceptions
        .iter()
        .filter(|e| e.event_id == event.id)
        .cloned()
        .collect();
    apply_exceptions(expand(event, window, engine.max_occurrences, skip), &own)
}

/// Plain interval intersection; malformed intervals never intersect.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start <= a_end && b_start <= b_end && a_start < b_end && b_start < a_end
}

fn intersects_window(event: &CalendarEvent, window: &DateWindow) -> bool {
    event.start <= window.to && event.end >= window.from
}

fn conflict_between(
    candidate: &CalendarEvent,
    other: &CalendarEvent,
    config: &ConflictConfig,
) -> Option<EventConflict> {
    if candidate.end < candidate.start || other.end < other.start {
        return None;
    }

    let buffer = config.buffer();
    let padded_start = candidate.start.checked_sub_signed(buffer).unwrap_or(candidate.start);
    let padded_end = candidate.end.checked_add_signed(buffer).unwrap_or(candidate.end);
    if !intervals_overlap(padded_start, padded_end, other.start, other.end) {
        return None;
    }

    let overlap_minutes = (candidate.end.min(other.end) - candidate.start.max(other.start))
        .num_minutes()
        .max(0);
    let shared = shared_attendees(candidate, other);

    let conflict_type = if config.detect_double_booking && !shared.is_empty() {
        ConflictType::DoubleBooking
    } else if config.detect_resource_conflicts && shared.is_empty() && same_location(candidate, other) {
        ConflictType::ResourceConflict
    } else {
        ConflictType::Overlap
    };

    let mut details = if overlap_minutes > 0 {
        format!("Overlaps '{}' by {} minutes", other.title, overlap_minutes)
    } else {
        format!("Within the {} minute buffer of '{}'", config.buffer_minutes, other.title)
    };
    match conflict_type {
        ConflictType::DoubleBooking => {
            details.push_str(&format!("; shared attendees: {}", shared.join(", ")));
        }
        ConflictType::ResourceConflict => {
            let room = other.location.as_deref().unwrap_or_default().trim();
            details.push_str(&format!("; both booked in {room}"));
        }
        ConflictType::Overlap => {}
    }

    let free_at = other.end.checked_add_signed(buffer).unwrap_or(other.end);
    let suggestion = format!(
        "Move '{}' to start at {} or later",
        candidate.title,
        free_at.format("%Y-%m-%d %H:%M UTC")
    );

    Some(EventConflict {
        conflict_type,
        counterpart_event: other.clone(),
        overlap_minutes,
        details,
        suggestion,
    })
}

fn shared_attendees(a: &CalendarEvent, b: &CalendarEvent) -> Vec<String> {
    let theirs: HashSet<String> = b.attendees.iter().map(|a| a.identity()).collect();
    let mut shared: Vec<String> = a
        .attendees
        .iter()
        .map(|a| a.identity())
        .filter(|id| !id.is_empty() && theirs.contains(id))
        .collect();
    shared.sort();
    shared.dedup();
    shared
}

fn same_location(a: &CalendarEvent, b: &CalendarEvent) -> bool {
    match (a.location.as_deref(), b.location.as_deref()) {
        (Some(x), Some(y)) => {
            let (x, y) = (x.trim(), y.trim());
            !x.is_empty() && x.eq_ignore_ascii_case(y)
        }
        _ => false,
    }
}
