use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use cadence_core::calendar::SkipPolicy;
use cadence_core::conflict::{detect_conflicts, find_conflicts_in, snapshots_in_window};
use cadence_core::models::{CalendarEvent, EventConflict};

use crate::calendar_file::CalendarFile;
use crate::cli::ConflictsCommand;
use crate::commands::manager_for;
use crate::config::Config;
use crate::parser::parse_window;
use crate::util::resolve_event;
use crate::views::table::{display_conflicts, ViewConflict};

pub fn find_conflicts(command: ConflictsCommand, config: &Config) -> Result<()> {
    let calendar = CalendarFile::load(&command.calendar.file)?;
    let window = parse_window(
        command.from.as_deref(),
        command.to.as_deref(),
        config.engine.default_window_days,
        Utc::now(),
    )?;

    let mut engine = config.engine.clone();
    if let Some(buffer) = command.buffer {
        engine.conflict.buffer_minutes = buffer;
    }

    let skip = config
        .working_days
        .is_active()
        .then_some(&config.working_days as &dyn SkipPolicy);
    let snapshots = snapshots_in_window(&calendar.events, &calendar.exceptions, &window, &engine, skip);

    let rows: Vec<ViewConflict> = match &command.event {
        Some(key) => {
            let event = resolve_event(&calendar, key)?;
            if event.is_recurring() {
                let manager = manager_for(&calendar, event, &engine, &config.working_days)?;
                manager
                    .conflicts_with(&snapshots, &window)
                    .into_iter()
                    .flat_map(|found| {
                        let own = found.occurrence.source_event;
                        found.conflicts.into_iter().map(move |c| view(&own, c))
                    })
                    .collect()
            } else {
                detect_conflicts(event, &snapshots, &engine.conflict)
                    .into_iter()
                    .map(|c| view(event, c))
                    .collect()
            }
        }
        None => find_conflicts_in(&snapshots, &engine.conflict)
            .into_iter()
            .map(|(event, c)| view(event, c))
            .collect(),
    };

    if !rows.is_empty() {
        println!("{} conflict(s) between {} and {}", rows.len().to_string().red().bold(), window.from, window.to);
    }
    display_conflicts(&rows, config.display_offset());
    Ok(())
}

fn view(event: &CalendarEvent, conflict: EventConflict) -> ViewConflict {
    ViewConflict {
        title: event.title.clone(),
        start: event.start,
        counterpart: conflict.counterpart_event.title.clone(),
        counterpart_start: conflict.counterpart_event.start,
        conflict_type: conflict.conflict_type,
        details: conflict.details,
        suggestion: conflict.suggestion,
    }
}
