use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use cadence_core::models::{EditScope, EventOverride};
use cadence_core::series::apply_edit;

use crate::calendar_file::CalendarFile;
use crate::cli::EditCommand;
use crate::parser::parse_datetime;
use crate::util::{resolve_event, short_id};

pub fn edit_event(command: EditCommand) -> Result<()> {
    let mut calendar = CalendarFile::load(&command.calendar.file)?;
    let event = resolve_event(&calendar, &command.event)?.clone();
    let now = Utc::now();
    let at = parse_datetime(&command.at, now)?;

    let changes = EventOverride {
        start: command.start.as_deref().map(|s| parse_datetime(s, now)).transpose()?,
        end: command.end.as_deref().map(|s| parse_datetime(s, now)).transpose()?,
        title: command.title,
        description: command.description,
        location: command.location,
    };

    let outcome = apply_edit(&event, &calendar.exceptions, at, command.scope, &changes)?;
    let updated_id = outcome.updated.event.id;
    calendar.replace_series(outcome.updated.event, outcome.updated.exceptions);

    let split_off = outcome.split_off.map(|series| {
        let label = format!("{} ({})", series.event.title, short_id(&series.event));
        calendar.replace_series(series.event, series.exceptions);
        label
    });
    calendar.save(&command.calendar.file)?;

    match command.scope {
        EditScope::ThisOccurrence => println!("{} Updated the occurrence at {}", "✓".green(), at),
        EditScope::EntireSeries => println!("{} Updated the entire series {}", "✓".green(), updated_id),
        EditScope::ThisAndFuture => match split_off {
            Some(label) => println!("{} Split the series; future occurrences now belong to {}", "✓".green(), label.cyan()),
            None => println!("{} Updated the entire series {}", "✓".green(), updated_id),
        },
    }
    Ok(())
}
