use anyhow::Result;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use cadence_core::models::{CalendarEvent, Occurrence};
use cadence_core::recurrence;

use crate::calendar_file::CalendarFile;
use crate::cli::NavigateCommand;
use crate::commands::manager_for;
use crate::config::Config;
use crate::parser::parse_datetime;
use crate::util::resolve_event;
use crate::views::table::format_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Next,
    Previous,
}

pub fn next_occurrence(command: NavigateCommand, config: &Config) -> Result<()> {
    navigate(command, config, Direction::Next)
}

pub fn previous_occurrence(command: NavigateCommand, config: &Config) -> Result<()> {
    navigate(command, config, Direction::Previous)
}

fn navigate(command: NavigateCommand, config: &Config, direction: Direction) -> Result<()> {
    let calendar = CalendarFile::load(&command.calendar.file)?;
    let event = resolve_event(&calendar, &command.event)?;
    let now = Utc::now();
    let from = command.from.as_deref().map(|s| parse_datetime(s, now)).transpose()?.unwrap_or(now);

    let found = find(&calendar, event, from, direction, config)?;
    let offset = config.display_offset();
    match found {
        Some(occurrence) => {
            let marker = if occurrence.is_exception { " (changed)".yellow().to_string() } else { String::new() };
            println!(
                "{} {} → {}{}",
                occurrence.title().cyan(),
                format_time(occurrence.actual_start, offset).green(),
                format_time(occurrence.actual_end, offset),
                marker
            );
        }
        None => {
            let side = match direction {
                Direction::Next => "after",
                Direction::Previous => "before",
            };
            println!("No occurrence of '{}' {} {}.", event.title, side, format_time(from, offset));
        }
    }
    Ok(())
}

fn find(
    calendar: &CalendarFile,
    event: &CalendarEvent,
    from: DateTime<Utc>,
    direction: Direction,
    config: &Config,
) -> Result<Option<Occurrence>> {
    if !event.is_recurring() {
        let exceptions = calendar.exceptions_for(event.id);
        return Ok(match direction {
            Direction::Next => recurrence::next_occurrence(event, &exceptions, from),
            Direction::Previous => recurrence::previous_occurrence(event, &exceptions, from),
        });
    }

    let manager = manager_for(calendar, event, &config.engine, &config.working_days)?;
    Ok(match direction {
        Direction::Next => manager.next_occurrence_after(from),
        Direction::Previous => manager.previous_occurrence_before(from),
    })
}
