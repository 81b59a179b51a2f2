use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use cadence_core::analyzer::{self, RecurrenceAnalysis};
use cadence_core::models::CalendarEvent;
use serde::Serialize;

use crate::calendar_file::CalendarFile;
use crate::cli::AnalyzeCommand;
use crate::config::Config;
use crate::parser::parse_datetime;
use crate::util::resolve_event;
use crate::views::table::{display_properties, format_time};

#[derive(Serialize)]
struct EventAnalysis<'a> {
    event_id: String,
    title: &'a str,
    #[serde(flatten)]
    analysis: RecurrenceAnalysis,
}

pub fn analyze_events(command: AnalyzeCommand, config: &Config) -> Result<()> {
    let calendar = CalendarFile::load(&command.calendar.file)?;
    let now = Utc::now();
    let at = command.at.as_deref().map(|s| parse_datetime(s, now)).transpose()?.unwrap_or(now);

    let events: Vec<&CalendarEvent> = match &command.event {
        Some(key) => vec![resolve_event(&calendar, key)?],
        None => calendar.events.iter().filter(|e| e.is_recurring()).collect(),
    };

    let analyses: Vec<EventAnalysis> = events
        .into_iter()
        .map(|event| EventAnalysis {
            event_id: event.id.to_string(),
            title: &event.title,
            analysis: analyzer::analyze(event, &calendar.exceptions_for(event.id), at),
        })
        .collect();

    if command.json {
        println!("{}", serde_json::to_string_pretty(&analyses)?);
        return Ok(());
    }

    if analyses.is_empty() {
        println!("No recurring events found.");
    }
    let offset = config.display_offset();
    for entry in &analyses {
        let analysis = &entry.analysis;
        println!("{} ({})", entry.title.blue().bold(), &entry.event_id[..8]);
        display_properties(&[
            ("Pattern", analysis.description.clone()),
            (
                "Next",
                analysis
                    .next_occurrence
                    .as_ref()
                    .map_or_else(|| "None".to_string(), |o| format_time(o.actual_start, offset)),
            ),
            (
                "Previous",
                analysis
                    .previous_occurrence
                    .as_ref()
                    .map_or_else(|| "None".to_string(), |o| format_time(o.actual_start, offset)),
            ),
            ("Per year", format!("{:.1}", analysis.frequency_per_year)),
            ("Complexity", analysis.complexity_score.to_string()),
            (
                "Total",
                analysis
                    .total_occurrences
                    .map_or_else(|| "Unknown".to_string(), |n| n.to_string()),
            ),
        ]);
    }
    Ok(())
}
