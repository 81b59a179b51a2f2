use anyhow::{anyhow, Result};
use chrono::Utc;
use cadence_core::analyzer::describe;
use cadence_core::error::CoreError;
use cadence_core::models::{EndCondition, RecurrenceBounds};
use cadence_core::rrule;

use crate::calendar_file::CalendarFile;
use crate::cli::{RruleCommand, RruleGenerateCommand, RruleParseCommand, RruleSubcommand};
use crate::util::resolve_event;
use crate::views::table::display_properties;

const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn rrule_command(command: RruleCommand) -> Result<()> {
    match command.command {
        RruleSubcommand::Parse(cmd) => parse_command(cmd),
        RruleSubcommand::Generate(cmd) => generate_command(cmd),
    }
}

fn parse_command(command: RruleParseCommand) -> Result<()> {
    let parsed = rrule::parse_rule(&command.rule)?;
    let pattern = &parsed.pattern;
    let end = parsed.end_condition.unwrap_or(EndCondition::Never);

    let days = pattern
        .sorted_weekdays()
        .iter()
        .map(|d| WEEKDAY_ABBREVIATIONS[usize::from(*d)])
        .collect::<Vec<_>>()
        .join(", ");
    let end_text = match end {
        EndCondition::Never => "Never".to_string(),
        EndCondition::Count(n) => format!("After {} occurrences", n),
        EndCondition::EndDate(d) => format!("Until {}", d.format("%Y-%m-%d %H:%M UTC")),
    };
    let bounds = RecurrenceBounds::new(Utc::now()).with_end(end);

    display_properties(&[
        ("Frequency", pattern.frequency.to_string()),
        ("Interval", pattern.interval.to_string()),
        ("Days", if days.is_empty() { "-".to_string() } else { days }),
        ("Day of month", pattern.day_of_month.map_or("-".to_string(), |d| d.to_string())),
        ("Month", pattern.month.map_or("-".to_string(), |m| (m + 1).to_string())),
        ("Ends", end_text),
        ("Description", describe(pattern, &bounds)),
    ]);
    Ok(())
}

fn generate_command(command: RruleGenerateCommand) -> Result<()> {
    let calendar = CalendarFile::load(&command.calendar.file)?;
    let event = resolve_event(&calendar, &command.event)?;
    let recurrence = event
        .recurrence
        .as_ref()
        .filter(|_| event.is_recurring())
        .ok_or_else(|| anyhow!(CoreError::NotRecurring(event.id)))?;

    println!("RRULE:{}", rrule::generate(&recurrence.pattern, &recurrence.bounds));
    Ok(())
}
