//! Next/previous occurrence lookup without expanding a full window.
//!
//! Both directions compare against an occurrence's *original* start, so an occurrence
//! moved across the reference instant is still found on the side its pattern slot
//! lies on. Deleted occurrences are stepped over.

use chrono::{DateTime, Utc};

use super::generator::{ResolvedRule, MAX_SCAN_STEPS};
use super::overlay::{apply_exception, index_exceptions, ExceptionIndex};
use crate::calendar::SkipPolicy;
use crate::models::{CalendarEvent, ExceptionAction, Occurrence, RecurrenceException};

/// Candidate periods a single navigation walks before reporting "none".
pub const NAVIGATION_CEILING: usize = 1000;

pub struct Navigator<'a> {
    event: &'a CalendarEvent,
    exceptions: ExceptionIndex<'a>,
    skip: Option<&'a dyn SkipPolicy>,
    ceiling: usize,
}

impl<'a> Navigator<'a> {
    pub fn new(event: &'a CalendarEvent, exceptions: &'a [RecurrenceException]) -> Self {
        Self {
            event,
            exceptions: index_exceptions(exceptions),
            skip: None,
            ceiling: NAVIGATION_CEILING,
        }
    }

    pub fn with_skip_policy(mut self, policy: &'a dyn SkipPolicy) -> Self {
        self.skip = Some(policy);
        self
    }

    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// First surviving occurrence whose original start is strictly after `from`.
    pub fn next(&self, from: DateTime<Utc>) -> Option<Occurrence> {
        let Some(rule) = self.rule() else {
            return self.single(|start| start > from);
        };

        rule.candidates(self.skip, self.ceiling)
            .fast_forward_to(from)
            .filter(|start| *start > from)
            .find_map(|start| self.materialize(start))
    }

    /// Last surviving occurrence whose original start is strictly before `from`.
    pub fn previous(&self, from: DateTime<Utc>) -> Option<Occurrence> {
        let Some(rule) = self.rule() else {
            return self.single(|start| start < from);
        };

        if rule.is_counted() {
            // the count budget is spent from the anchor forward
            let last = rule
                .candidates(self.skip, MAX_SCAN_STEPS)
                .take_while(|start| *start < from)
                .filter(|start| !self.is_deleted(*start))
                .last()?;
            return self.materialize(last);
        }

        let stepper = &rule.stepper;
        let mut top = stepper.period_containing(from);
        if let Some(limit) = rule.limit() {
            top = top.min(stepper.period_containing(limit));
        }

        let mut period = top;
        let mut steps = 0;
        while period >= 0 && steps < self.ceiling {
            steps += 1;
            for start in stepper.period(period).into_iter().rev() {
                if start >= from || !rule.admits(start, self.skip) {
                    continue;
                }
                if let Some(occurrence) = self.materialize(start) {
                    return Some(occurrence);
                }
            }
            period -= 1;
        }
        None
    }

    fn rule(&self) -> Option<ResolvedRule> {
        self.event.recurrence.as_ref().and_then(ResolvedRule::resolve)
    }

    fn single(&self, side: impl Fn(DateTime<Utc>) -> bool) -> Option<Occurrence> {
        if self.event.is_recurring() || !side(self.event.start) {
            return None;
        }
        Some(Occurrence::from_master(self.event, self.event.start, 0))
    }

    fn is_deleted(&self, start: DateTime<Utc>) -> bool {
        self.exceptions
            .get(&start)
            .is_some_and(|e| matches!(e.action, ExceptionAction::Delete))
    }

    fn materialize(&self, start: DateTime<Utc>) -> Option<Occurrence> {
        let occurrence = Occurrence::from_master(self.event, start, 0);
        apply_exception(occurrence, self.exceptions.get(&start).copied())
    }
}

/// Next surviving occurrence strictly after `from`.
pub fn next_occurrence(
    event: &CalendarEvent,
    exceptions: &[RecurrenceException],
    from: DateTime<Utc>,
) -> Option<Occurrence> {
    Navigator::new(event, exceptions).next(from)
}

/// Previous surviving occurrence strictly before `from`.
pub fn previous_occurrence(
    event: &CalendarEvent,
    exceptions: &[RecurrenceException],
    from: DateTime<Utc>,
) -> Option<Occurrence> {
    Navigator::new(event, exceptions).previous(from)
}

/// Whether the raw pattern (ignoring exceptions) produces an occurrence at `at`.
pub(crate) fn occurs_at(event: &CalendarEvent, at: DateTime<Utc>) -> bool {
    let Some(rule) = event.recurrence.as_ref().and_then(ResolvedRule::resolve) else {
        return !event.is_recurring() && event.start == at;
    };
    rule.candidates(None, MAX_SCAN_STEPS)
        .fast_forward_to(at)
        .find(|start| *start >= at)
        == Some(at)
}

/// Raw occurrences strictly before `at`.
pub(crate) fn count_before(event: &CalendarEvent, at: DateTime<Utc>) -> u32 {
    let Some(rule) = event.recurrence.as_ref().and_then(ResolvedRule::resolve) else {
        return 0;
    };
    let count = rule
        .candidates(None, MAX_SCAN_STEPS)
        .take_while(|start| *start < at)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}
