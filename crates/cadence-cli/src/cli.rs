use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cadence_core::models::EditScope;

/// Expand recurring calendar events and find scheduling conflicts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the occurrences of recurring events in a window
    Expand(ExpandCommand),
    /// Show the next occurrence of an event
    Next(NavigateCommand),
    /// Show the previous occurrence of an event
    Previous(NavigateCommand),
    /// Find overlapping events
    Conflicts(ConflictsCommand),
    /// Check every recurring event for structural problems
    Validate(ValidateCommand),
    /// Describe recurring events and estimate their size
    Analyze(AnalyzeCommand),
    /// Parse or generate RRULE text
    Rrule(RruleCommand),
    /// Skip (delete) one occurrence
    Skip(SkipCommand),
    /// Move one occurrence to a different time
    Move(MoveCommand),
    /// Remove exceptions so occurrences follow the pattern again
    Restore(RestoreCommand),
    /// Edit an occurrence, the rest of the series, or the whole series
    Edit(EditCommand),
}

/// The calendar file every command reads.
#[derive(Args, Debug, Clone)]
pub struct CalendarArg {
    /// JSON file with `events` and `exceptions` arrays
    pub file: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct ExpandCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    /// Event ID prefix or title; all recurring events when omitted
    #[clap(short, long)]
    pub event: Option<String>,
    /// Window start (e.g. '2025-07-01', '2025-07-01 09:00', 'next monday')
    #[clap(long)]
    pub from: Option<String>,
    /// Window end; defaults to the configured window length after --from
    #[clap(long)]
    pub to: Option<String>,
    /// Maximum number of occurrences per event
    #[clap(long)]
    pub max: Option<usize>,
    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct NavigateCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    /// Event ID prefix or title
    #[clap(short, long)]
    pub event: String,
    /// Reference time; defaults to now
    #[clap(long)]
    pub from: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ConflictsCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    /// Only report conflicts of this event
    #[clap(short, long)]
    pub event: Option<String>,
    #[clap(long)]
    pub from: Option<String>,
    #[clap(long)]
    pub to: Option<String>,
    /// Minutes of padding required around each event
    #[clap(long)]
    pub buffer: Option<i64>,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    #[clap(short, long)]
    pub event: Option<String>,
    /// Reference time for next/previous; defaults to now
    #[clap(long)]
    pub at: Option<String>,
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RruleCommand {
    #[command(subcommand)]
    pub command: RruleSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RruleSubcommand {
    /// Decode rule text into a pattern
    Parse(RruleParseCommand),
    /// Render an event's recurrence as rule text
    Generate(RruleGenerateCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct RruleParseCommand {
    /// Rule text, e.g. 'FREQ=WEEKLY;BYDAY=MO,WE'
    pub rule: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RruleGenerateCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    #[clap(short, long)]
    pub event: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SkipCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    #[clap(short, long)]
    pub event: String,
    /// Original start of the occurrence to skip
    #[clap(long)]
    pub at: String,
    #[clap(long)]
    pub reason: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    #[clap(short, long)]
    pub event: String,
    /// Original start of the occurrence to move
    #[clap(long)]
    pub from: String,
    /// New start time
    #[clap(long)]
    pub to: String,
    #[clap(long)]
    pub reason: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RestoreCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    #[clap(short, long)]
    pub event: String,
    /// Original starts to restore (comma-separated)
    #[clap(long, value_delimiter = ',', required_unless_present = "all")]
    pub at: Vec<String>,
    /// Remove every exception of the event
    #[clap(long, conflicts_with = "at")]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    #[command(flatten)]
    pub calendar: CalendarArg,
    #[clap(short, long)]
    pub event: String,
    /// Original start of the occurrence being edited
    #[clap(long)]
    pub at: String,
    /// How far the change reaches (occurrence|future|series)
    #[arg(long, default_value = "occurrence")]
    pub scope: EditScope,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// New start of the edited occurrence
    #[arg(long)]
    pub start: Option<String>,
    /// New end of the edited occurrence
    #[arg(long)]
    pub end: Option<String>,
}
