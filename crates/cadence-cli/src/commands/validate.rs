use anyhow::{anyhow, Result};
use owo_colors::OwoColorize;
use cadence_core::error::CoreError;
use cadence_core::store::validate_exception;
use cadence_core::validation::validate;

use crate::calendar_file::CalendarFile;
use crate::cli::ValidateCommand;
use crate::util::short_id;

pub fn validate_events(command: ValidateCommand) -> Result<()> {
    let calendar = CalendarFile::load(&command.calendar.file)?;
    let mut failed = 0;
    let mut checked = 0;

    for event in &calendar.events {
        let Some(recurrence) = &event.recurrence else {
            continue;
        };
        checked += 1;

        let report = validate(&recurrence.pattern, &recurrence.bounds);
        let label = format!("{} ({})", event.title, short_id(event));
        if report.is_valid {
            println!("{} {}", "✓".green(), label);
        } else {
            failed += 1;
            println!("{} {}", "✗".red(), label.red());
        }
        for error in &report.errors {
            println!("    {} {}", "error:".red(), error);
        }
        for warning in &report.warnings {
            println!("    {} {}", "warning:".yellow(), warning);
        }
    }

    let mut bad_exceptions = 0;
    for exception in &calendar.exceptions {
        if let Err(e) = validate_exception(exception) {
            bad_exceptions += 1;
            println!("{} {}", "✗".red(), e);
        }
        if !calendar.events.iter().any(|e| e.id == exception.event_id) {
            println!(
                "    {} exception at {} belongs to unknown event {}",
                "warning:".yellow(),
                exception.original_start,
                exception.event_id
            );
        }
    }

    println!("Checked {} recurring event(s) and {} exception(s).", checked, calendar.exceptions.len());
    if failed + bad_exceptions > 0 {
        return Err(anyhow!(CoreError::InvalidInput(format!(
            "{} event(s) and {} exception(s) failed validation",
            failed, bad_exceptions
        ))));
    }
    Ok(())
}
