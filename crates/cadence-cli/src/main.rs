use anyhow::Result;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

use cadence_core::error::CoreError;

mod calendar_file;
mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

fn main() {
    init_tracing();

    let config = config::Config::new().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable configuration");
        config::Config::default()
    });

    let cli = cli::Cli::parse();

    if let Err(e) = run(cli.command, &config) {
        handle_error(e);
        std::process::exit(1);
    }
}

fn run(command: cli::Commands, config: &config::Config) -> Result<()> {
    match command {
        cli::Commands::Expand(command) => commands::expand::expand_events(command, config),
        cli::Commands::Next(command) => commands::navigate::next_occurrence(command, config),
        cli::Commands::Previous(command) => commands::navigate::previous_occurrence(command, config),
        cli::Commands::Conflicts(command) => commands::conflicts::find_conflicts(command, config),
        cli::Commands::Validate(command) => commands::validate::validate_events(command),
        cli::Commands::Analyze(command) => commands::analyze::analyze_events(command, config),
        cli::Commands::Rrule(command) => commands::rrule::rrule_command(command),
        cli::Commands::Skip(command) => commands::exceptions::skip_occurrence(command, config),
        cli::Commands::Move(command) => commands::exceptions::move_occurrence(command, config),
        cli::Commands::Restore(command) => commands::exceptions::restore_occurrences(command),
        cli::Commands::Edit(command) => commands::edit::edit_event(command),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CADENCE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    match err.chain().find_map(|e| e.downcast_ref::<CoreError>()) {
        Some(CoreError::NotFound(s)) => {
            eprintln!("{} {}", "Error:".style(error_style), s);
        }
        Some(CoreError::InvalidInput(s)) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
        }
        Some(CoreError::InvalidRRule(s)) => {
            eprintln!("{} Invalid recurrence rule: {}", "Error:".style(error_style), s.yellow());
        }
        Some(CoreError::NotRecurring(id)) => {
            eprintln!(
                "{} Event {} does not recur",
                "Error:".style(error_style),
                id.to_string().yellow()
            );
        }
        Some(CoreError::Json(e)) => {
            eprintln!("{} Malformed calendar file: {}", "Error:".style(error_style), e);
        }
        _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
    }
}
