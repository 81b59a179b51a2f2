use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::CalendarEvent;

use crate::calendar_file::CalendarFile;

/// Finds an event by ID prefix, falling back to a case-insensitive title match.
pub fn resolve_event<'a>(calendar: &'a CalendarFile, key: &str) -> Result<&'a CalendarEvent> {
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!(CoreError::InvalidInput("Event reference must not be empty.".to_string())));
    }

    let lowered = key.to_lowercase();
    let by_id: Vec<&CalendarEvent> = calendar
        .events
        .iter()
        .filter(|e| key.len() >= 2 && e.id.to_string().starts_with(&lowered))
        .collect();
    let matches: Vec<&CalendarEvent> = if by_id.is_empty() {
        calendar
            .events
            .iter()
            .filter(|e| e.title.to_lowercase() == lowered)
            .collect()
    } else {
        by_id
    };

    match matches.as_slice() {
        [event] => Ok(*event),
        [] => Err(anyhow!(CoreError::NotFound(format!("No event found matching '{}'", key)))),
        _ => {
            let candidates: Vec<String> = matches
                .iter()
                .map(|e| format!("{} ({})", short_id(e), e.title))
                .collect();
            Err(anyhow!(CoreError::InvalidInput(format!(
                "'{}' is ambiguous, did you mean one of: {}",
                key,
                candidates.join(", ")
            ))))
        }
    }
}

pub fn short_id(event: &CalendarEvent) -> String {
    event.id.to_string().chars().take(8).collect()
}
