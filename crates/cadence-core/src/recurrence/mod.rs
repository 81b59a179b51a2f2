//! Recurrence expansion: generator, exception overlay and navigator, plus the
//! per-event [`RecurrenceManager`] that bundles them.

pub mod generator;
pub mod navigator;
pub mod overlay;

pub use generator::{expand, MAX_SCAN_STEPS};
pub use navigator::{next_occurrence, previous_occurrence, Navigator, NAVIGATION_CEILING};
pub use overlay::{apply_exception, apply_exceptions};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::analyzer::{self, RecurrenceAnalysis};
use crate::calendar::SkipPolicy;
use crate::config::EngineConfig;
use crate::conflict;
use crate::error::CoreError;
use crate::models::{
    saturating_add_days, CalendarEvent, DateWindow, Occurrence, OccurrenceConflicts, RecurrenceException,
};
use crate::validation::{self, ValidationReport};

/// RecurrenceManager: all occurrence calculations for one master event.
///
/// Responsibilities:
/// 1. Hold the master event and the exceptions that belong to it
/// 2. Generate exception-aware occurrences between arbitrary instants
/// 3. Navigate to the next or previous occurrence around an instant
/// 4. Preview, validate, analyze and conflict-check the series
///
/// The manager is immutable after construction.
pub struct RecurrenceManager {
    event: CalendarEvent,
    exceptions: Vec<RecurrenceException>,
    config: EngineConfig,
    skip_policy: Option<Box<dyn SkipPolicy + Send + Sync>>,
}

impl std::fmt::Debug for RecurrenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecurrenceManager")
            .field("event", &self.event.id)
            .field("exceptions", &self.exceptions.len())
            .field("config", &self.config)
            .field("skip_policy", &self.skip_policy.is_some())
            .finish()
    }
}

impl RecurrenceManager {
    /// Creates a new RecurrenceManager for a master event.
    ///
    /// # Arguments
    /// * `event` - The master event; must carry a recurrence
    /// * `exceptions` - Exceptions for this series; entries for other events are dropped
    ///
    /// # Returns
    /// * `Result<Self, CoreError>` - `NotRecurring` if the event does not repeat
    pub fn new(event: CalendarEvent, exceptions: Vec<RecurrenceException>) -> Result<Self, CoreError> {
        if !event.is_recurring() {
            return Err(CoreError::NotRecurring(event.id));
        }

        let total = exceptions.len();
        let exceptions: Vec<RecurrenceException> =
            exceptions.into_iter().filter(|e| e.event_id == event.id).collect();
        if exceptions.len() < total {
            warn!(
                event_id = %event.id,
                dropped = total - exceptions.len(),
                "ignoring exceptions that belong to other events"
            );
        }

        Ok(Self {
            event,
            exceptions,
            config: EngineConfig::default(),
            skip_policy: None,
        })
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Dates matching the policy are dropped from every calculation.
    pub fn with_skip_policy<P>(mut self, policy: P) -> Self
    where
        P: SkipPolicy + Send + Sync + 'static,
    {
        self.skip_policy = Some(Box::new(policy));
        self
    }

    pub fn event(&self) -> &CalendarEvent {
        &self.event
    }

    pub fn exceptions(&self) -> &[RecurrenceException] {
        &self.exceptions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn skip(&self) -> Option<&dyn SkipPolicy> {
        self.skip_policy.as_deref().map(|p| p as &dyn SkipPolicy)
    }

    /// Generates occurrences between `start` and `end`, both inclusive.
    ///
    /// # Behavior
    /// - Expand the raw series, capped at `max_occurrences`
    /// - Apply exceptions:
    ///   - Delete: remove the occurrence
    ///   - Move/Modify: substitute the new times and fields, keep `original_start`
    /// - Re-sequence the survivors from zero
    pub fn generate_occurrences_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Occurrence> {
        let window = DateWindow::new(start, end);
        let raw = expand(&self.event, &window, self.config.max_occurrences, self.skip());
        apply_exceptions(raw, &self.exceptions)
    }

    /// Occurrences in the configured default window starting at `from`.
    pub fn upcoming(&self, from: DateTime<Utc>) -> Vec<Occurrence> {
        let end = saturating_add_days(from, self.config.default_window_days);
        self.generate_occurrences_between(from, end)
    }

    /// Finds the next occurrence strictly after the given time.
    ///
    /// Deleted occurrences are skipped; `None` once the series has ended or nothing is
    /// found within the navigation ceiling.
    pub fn next_occurrence_after(&self, after: DateTime<Utc>) -> Option<Occurrence> {
        self.navigator().next(after)
    }

    /// Finds the last occurrence strictly before the given time.
    pub fn previous_occurrence_before(&self, before: DateTime<Utc>) -> Option<Occurrence> {
        self.navigator().previous(before)
    }

    fn navigator(&self) -> Navigator<'_> {
        let navigator = Navigator::new(&self.event, &self.exceptions).with_ceiling(self.config.navigation_ceiling);
        match self.skip() {
            Some(policy) => navigator.with_skip_policy(policy),
            None => navigator,
        }
    }

    /// Preview upcoming occurrences for this series.
    ///
    /// # Arguments
    /// * `from` - Start time for preview
    /// * `count` - Maximum number of occurrences to return
    ///
    /// Looks ahead `preview_days` (one year by default).
    pub fn preview_occurrences(&self, from: DateTime<Utc>, count: usize) -> Vec<Occurrence> {
        let end = saturating_add_days(from, self.config.preview_days);
        let mut occurrences = self.generate_occurrences_between(from, end);
        occurrences.truncate(count);
        debug!(event_id = %self.event.id, shown = occurrences.len(), "preview");
        occurrences
    }

    pub fn validate(&self) -> ValidationReport {
        match &self.event.recurrence {
            Some(recurrence) => validation::validate(&recurrence.pattern, &recurrence.bounds),
            None => ValidationReport::default(),
        }
    }

    pub fn analyze(&self, now: DateTime<Utc>) -> RecurrenceAnalysis {
        analyzer::analyze(&self.event, &self.exceptions, now)
    }

    /// Occurrences inside `window` that collide with any of `existing`.
    pub fn conflicts_with(&self, existing: &[CalendarEvent], window: &DateWindow) -> Vec<OccurrenceConflicts> {
        let occurrences = self.generate_occurrences_between(window.from, window.to);
        conflict::conflicts_for_occurrences(occurrences, existing, &self.config.conflict)
    }
}
