use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use cadence_core::models::{CalendarEvent, ExceptionKind};

use crate::calendar_file::CalendarFile;
use crate::cli::ExpandCommand;
use crate::commands::manager_for;
use crate::config::Config;
use crate::parser::parse_window;
use crate::util::{resolve_event, short_id};
use crate::views::table::{display_occurrences, ViewOccurrence};

pub fn expand_events(command: ExpandCommand, config: &Config) -> Result<()> {
    let calendar = CalendarFile::load(&command.calendar.file)?;
    let window = parse_window(
        command.from.as_deref(),
        command.to.as_deref(),
        config.engine.default_window_days,
        Utc::now(),
    )?;

    let events: Vec<&CalendarEvent> = match &command.event {
        Some(key) => vec![resolve_event(&calendar, key)?],
        None => calendar.events.iter().filter(|e| e.is_recurring()).collect(),
    };

    let mut engine = config.engine.clone();
    if let Some(max) = command.max {
        engine.max_occurrences = max;
    }

    let mut rows = Vec::new();
    for event in events {
        let manager = manager_for(&calendar, event, &engine, &config.working_days)?;
        let kinds: HashMap<_, ExceptionKind> = manager
            .exceptions()
            .iter()
            .map(|e| (e.original_start, e.action.kind()))
            .collect();

        for occurrence in manager.generate_occurrences_between(window.from, window.to) {
            let exception = if occurrence.is_exception {
                kinds.get(&occurrence.original_start).copied()
            } else {
                None
            };
            rows.push(ViewOccurrence {
                event_id: short_id(event),
                occurrence,
                exception,
            });
        }
    }
    rows.sort_by_key(|row| (row.occurrence.actual_start, row.occurrence.original_start));

    if command.json {
        let occurrences: Vec<_> = rows.iter().map(|row| &row.occurrence).collect();
        println!("{}", serde_json::to_string_pretty(&occurrences)?);
    } else {
        display_occurrences(&rows, config.display_offset());
    }
    Ok(())
}
