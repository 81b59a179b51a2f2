use std::fs;
use std::path::Path;

use cadence_core::error::CoreError;
use cadence_core::models::{CalendarEvent, RecurrenceException};
use cadence_core::store::InMemoryExceptionStore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// On-disk calendar: events plus the exceptions of their recurring series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarFile {
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(default)]
    pub exceptions: Vec<RecurrenceException>,
}

impl CalendarFile {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CoreError::NotFound(format!("Calendar file '{}' does not exist", path.display()))
            }
            _ => CoreError::Io(e),
        })?;
        let calendar: CalendarFile = serde_json::from_str(&text)?;
        debug!(
            path = %path.display(),
            events = calendar.events.len(),
            exceptions = calendar.exceptions.len(),
            "loaded calendar"
        );
        Ok(calendar)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Exceptions belonging to one master event.
    pub fn exceptions_for(&self, event_id: Uuid) -> Vec<RecurrenceException> {
        self.exceptions
            .iter()
            .filter(|e| e.event_id == event_id)
            .cloned()
            .collect()
    }

    /// Loads the exceptions into a store, validating each one.
    pub fn exception_store(&self) -> Result<InMemoryExceptionStore, CoreError> {
        InMemoryExceptionStore::from_exceptions(self.exceptions.clone())
    }

    /// Replaces the file's exceptions with the store's contents.
    pub fn replace_exceptions(&mut self, store: &InMemoryExceptionStore) {
        self.exceptions = store.all();
    }

    /// Swaps in an edited master event and its exceptions.
    pub fn replace_series(&mut self, event: CalendarEvent, exceptions: Vec<RecurrenceException>) {
        let id = event.id;
        match self.events.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
        self.exceptions.retain(|e| e.event_id != id);
        self.exceptions.extend(exceptions);
    }
}

