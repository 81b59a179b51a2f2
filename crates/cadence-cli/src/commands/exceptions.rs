use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use owo_colors::OwoColorize;
use cadence_core::error::CoreError;
use cadence_core::models::{saturating_add, CalendarEvent, RecurrenceException};
use cadence_core::recurrence::Navigator;
use cadence_core::store::ExceptionStore;

use crate::calendar_file::CalendarFile;
use crate::cli::{MoveCommand, RestoreCommand, SkipCommand};
use crate::config::Config;
use crate::parser::parse_datetime;
use crate::util::resolve_event;
use crate::views::table::format_time;

pub fn skip_occurrence(command: SkipCommand, config: &Config) -> Result<()> {
    let mut calendar = CalendarFile::load(&command.calendar.file)?;
    let event = resolve_event(&calendar, &command.event)?.clone();
    let at = parse_datetime(&command.at, Utc::now())?;
    ensure_occurrence(&event, at)?;

    let mut exception = RecurrenceException::delete(event.id, at);
    if let Some(reason) = command.reason {
        exception = exception.with_reason(reason);
    }
    store_exception(&mut calendar, exception, &command.calendar.file)?;

    println!("{} Skipped '{}' on {}", "✓".green(), event.title, format_time(at, config.display_offset()));
    Ok(())
}

pub fn move_occurrence(command: MoveCommand, config: &Config) -> Result<()> {
    let mut calendar = CalendarFile::load(&command.calendar.file)?;
    let event = resolve_event(&calendar, &command.event)?.clone();
    let now = Utc::now();
    let from = parse_datetime(&command.from, now)?;
    let to = parse_datetime(&command.to, now)?;
    ensure_occurrence(&event, from)?;

    let mut exception = RecurrenceException::moved(event.id, from, to);
    if let Some(reason) = command.reason {
        exception = exception.with_reason(reason);
    }
    store_exception(&mut calendar, exception, &command.calendar.file)?;

    println!(
        "{} Moved '{}' from {} to {}",
        "✓".green(),
        event.title,
        format_time(from, config.display_offset()),
        format_time(to, config.display_offset()).green()
    );
    Ok(())
}

pub fn restore_occurrences(command: RestoreCommand) -> Result<()> {
    let mut calendar = CalendarFile::load(&command.calendar.file)?;
    let event = resolve_event(&calendar, &command.event)?.clone();
    let mut store = calendar.exception_store()?;

    let removed = if command.all {
        store.clear(event.id)
    } else {
        let now = Utc::now();
        let starts = command
            .at
            .iter()
            .map(|s| parse_datetime(s, now))
            .collect::<Result<Vec<DateTime<Utc>>, _>>()?;
        match starts.as_slice() {
            [single] => store.remove_exception(event.id, *single).map(|_| 1)?,
            _ => store.remove_bulk_exceptions(event.id, &starts),
        }
    };

    calendar.replace_exceptions(&store);
    calendar.save(&command.calendar.file)?;
    println!("{} Removed {} exception(s) from '{}'", "✓".green(), removed, event.title);
    Ok(())
}

fn store_exception(
    calendar: &mut CalendarFile,
    exception: RecurrenceException,
    path: &std::path::Path,
) -> Result<()> {
    let mut store = calendar.exception_store()?;
    store.add_exception(exception)?;
    calendar.replace_exceptions(&store);
    calendar.save(path)?;
    Ok(())
}

/// Exceptions are keyed by the start the pattern produces, so reject anything else.
fn ensure_occurrence(event: &CalendarEvent, at: DateTime<Utc>) -> Result<()> {
    if !event.is_recurring() {
        return Err(anyhow!(CoreError::NotRecurring(event.id)));
    }
    let produced = Navigator::new(event, &[])
        .next(saturating_add(at, -Duration::seconds(1)))
        .map(|o| o.original_start);
    if produced != Some(at) {
        return Err(anyhow!(CoreError::InvalidInput(format!(
            "'{}' has no occurrence at {}",
            event.title, at
        ))));
    }
    Ok(())
}
