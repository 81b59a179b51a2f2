//! Exception storage keyed by master event id.
//!
//! The engine itself never reads from a store; callers fetch the exceptions for a master
//! event and pass them in explicitly.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{ExceptionAction, RecurrenceException};

pub trait ExceptionStore {
    /// Stores an exception, replacing any existing one at the same original start.
    fn add_exception(&mut self, exception: RecurrenceException) -> Result<(), CoreError>;

    /// All exceptions of a master event, ordered by original start.
    fn find_exceptions(&self, event_id: Uuid) -> Vec<RecurrenceException>;

    fn remove_exception(&mut self, event_id: Uuid, original_start: DateTime<Utc>) -> Result<RecurrenceException, CoreError>;

    /// Validates every exception first; nothing is stored if any one is invalid.
    fn add_bulk_exceptions(&mut self, exceptions: Vec<RecurrenceException>) -> Result<usize, CoreError>;

    /// Removes what exists and returns how many were removed; absent keys are not an error.
    fn remove_bulk_exceptions(&mut self, event_id: Uuid, original_starts: &[DateTime<Utc>]) -> usize;

    /// Drops every exception of a master event, returning how many there were.
    fn clear(&mut self, event_id: Uuid) -> usize;
}

/// Rejects exceptions that could never change an occurrence.
pub fn validate_exception(exception: &RecurrenceException) -> Result<(), CoreError> {
    match &exception.action {
        ExceptionAction::Delete => Ok(()),
        ExceptionAction::Move { new_start } if *new_start == exception.original_start => {
            Err(CoreError::InvalidException(format!(
                "move of occurrence {} targets the same instant",
                exception.original_start
            )))
        }
        ExceptionAction::Move { .. } => Ok(()),
        ExceptionAction::Modify(changes) if changes.is_empty() => Err(CoreError::InvalidException(format!(
            "modification of occurrence {} changes nothing",
            exception.original_start
        ))),
        ExceptionAction::Modify(changes) => match (changes.start, changes.end) {
            (Some(start), Some(end)) if end < start => Err(CoreError::InvalidException(format!(
                "modified occurrence {} would end before it starts",
                exception.original_start
            ))),
            _ => Ok(()),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryExceptionStore {
    exceptions: HashMap<Uuid, BTreeMap<DateTime<Utc>, RecurrenceException>>,
}

impl InMemoryExceptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a flat list, e.g. the `exceptions` array of a calendar file.
    pub fn from_exceptions(exceptions: Vec<RecurrenceException>) -> Result<Self, CoreError> {
        let mut store = Self::new();
        store.add_bulk_exceptions(exceptions)?;
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.exceptions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored exception, grouped by event and ordered by original start.
    pub fn all(&self) -> Vec<RecurrenceException> {
        let mut all: Vec<RecurrenceException> = self
            .exceptions
            .values()
            .flat_map(|series| series.values().cloned())
            .collect();
        all.sort_by_key(|e| (e.event_id, e.original_start));
        all
    }

    fn insert(&mut self, exception: RecurrenceException) {
        let series = self.exceptions.entry(exception.event_id).or_default();
        if series.insert(exception.original_start, exception).is_some() {
            debug!("replaced existing exception at the same original start");
        }
    }
}

impl ExceptionStore for InMemoryExceptionStore {
    fn add_exception(&mut self, exception: RecurrenceException) -> Result<(), CoreError> {
        validate_exception(&exception)?;
        debug!(
            event_id = %exception.event_id,
            original_start = %exception.original_start,
            kind = %exception.action.kind(),
            "adding exception"
        );
        self.insert(exception);
        Ok(())
    }

    fn find_exceptions(&self, event_id: Uuid) -> Vec<RecurrenceException> {
        self.exceptions
            .get(&event_id)
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default()
    }

    fn remove_exception(&mut self, event_id: Uuid, original_start: DateTime<Utc>) -> Result<RecurrenceException, CoreError> {
        let series = self.exceptions.get_mut(&event_id);
        let removed = series.and_then(|s| s.remove(&original_start)).ok_or_else(|| {
            CoreError::NotFound(format!(
                "Exception not found for event {} at occurrence {}",
                event_id, original_start
            ))
        })?;

        if self.exceptions.get(&event_id).is_some_and(BTreeMap::is_empty) {
            self.exceptions.remove(&event_id);
        }
        Ok(removed)
    }

    fn add_bulk_exceptions(&mut self, exceptions: Vec<RecurrenceException>) -> Result<usize, CoreError> {
        for exception in &exceptions {
            validate_exception(exception)?;
        }
        let added = exceptions.len();
        for exception in exceptions {
            self.insert(exception);
        }
        Ok(added)
    }

    fn remove_bulk_exceptions(&mut self, event_id: Uuid, original_starts: &[DateTime<Utc>]) -> usize {
        let Some(series) = self.exceptions.get_mut(&event_id) else {
            return 0;
        };
        let removed = original_starts
            .iter()
            .filter(|start| series.remove(*start).is_some())
            .count();
        if series.is_empty() {
            self.exceptions.remove(&event_id);
        }
        removed
    }

    fn clear(&mut self, event_id: Uuid) -> usize {
        self.exceptions.remove(&event_id).map_or(0, |series| series.len())
    }
}
