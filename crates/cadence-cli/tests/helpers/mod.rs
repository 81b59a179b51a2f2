#![allow(dead_code)]

use assert_cmd::Command;
use cadence_core::models::{
    CalendarEvent, EndCondition, RecurrenceBounds, RecurrenceException, RecurrencePattern,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

pub const STANDUP_ID: &str = "0190a1b2-0000-7000-8000-000000000001";
pub const REVIEW_ID: &str = "0190a1b2-0000-7000-8000-000000000002";
pub const LUNCH_ID: &str = "0190a1b2-0000-7000-8000-000000000003";

/// Test harness running the binary inside a temporary directory that holds the
/// calendar file and, optionally, a `cadence.toml`.
pub struct CliTestHarness {
    temp_dir: TempDir,
    calendar_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new harness with the sample calendar written to disk
    pub fn new() -> Self {
        Self::with_calendar(&TestFixtures::sample_calendar())
    }

    pub fn with_calendar(calendar: &Value) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let calendar_path = temp_dir.path().join("calendar.json");
        let harness = Self {
            temp_dir,
            calendar_path,
        };
        harness.write_calendar(calendar);
        harness
    }

    pub fn write_calendar(&self, calendar: &Value) {
        std::fs::write(&self.calendar_path, serde_json::to_string_pretty(calendar).unwrap())
            .expect("Failed to write calendar file");
    }

    pub fn write_config(&self, toml: &str) {
        std::fs::write(self.temp_dir.path().join("cadence.toml"), toml).expect("Failed to write config");
    }

    pub fn read_calendar(&self) -> Value {
        let text = std::fs::read_to_string(&self.calendar_path).expect("Failed to read calendar file");
        serde_json::from_str(&text).expect("Calendar file is not valid JSON")
    }

    pub fn calendar_path(&self) -> &Path {
        &self.calendar_path
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cadence").expect("Failed to find cadence binary");
        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("CADENCE_LOG");
        cmd
    }

    /// Runs `cadence <subcommand> <calendar file> <args...>`
    pub fn on_calendar(&self, subcommand: &str, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command()
            .arg(subcommand)
            .arg(&self.calendar_path)
            .args(args)
            .assert()
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Weekly Tuesday standup with Ana, plus a review that double-books her on
    /// 2025-07-08 and a lunch that collides with nothing.
    pub fn sample_calendar() -> Value {
        let mut standup = CalendarEvent::new("Standup", utc(2025, 7, 1, 9, 0), utc(2025, 7, 1, 9, 30))
            .repeating(RecurrencePattern::weekly().on_days(&[2]), EndCondition::Never)
            .with_attendees(["ana@example.com"]);
        standup.id = Uuid::parse_str(STANDUP_ID).unwrap();

        let mut review = CalendarEvent::new("Review", utc(2025, 7, 8, 9, 15), utc(2025, 7, 8, 10, 0))
            .with_attendees(["ana@example.com", "ben@example.com"]);
        review.id = Uuid::parse_str(REVIEW_ID).unwrap();

        let mut lunch = CalendarEvent::new("Lunch", utc(2025, 7, 8, 12, 0), utc(2025, 7, 8, 13, 0));
        lunch.id = Uuid::parse_str(LUNCH_ID).unwrap();

        json!({ "events": [standup, review, lunch], "exceptions": [] })
    }

    /// A daily series whose end date precedes its start.
    pub fn broken_calendar() -> Value {
        let start = utc(2025, 7, 1, 9, 0);
        let broken = CalendarEvent::new("Broken", start, start + Duration::hours(1)).with_recurrence(
            RecurrencePattern::daily(),
            RecurrenceBounds::new(start).with_end(EndCondition::EndDate(start - Duration::days(1))),
        );
        json!({ "events": [broken], "exceptions": [] })
    }

    pub fn with_exception(mut calendar: Value, exception: RecurrenceException) -> Value {
        if let Some(list) = calendar["exceptions"].as_array_mut() {
            list.push(serde_json::to_value(exception).unwrap());
        }
        calendar
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    pub fn has_occurrence_table_headers() -> impl Predicate<str> {
        predicate::str::contains("Start")
            .and(predicate::str::contains("End"))
            .and(predicate::str::contains("Status"))
    }

    pub fn succeeded() -> impl Predicate<str> {
        predicate::str::contains("✓")
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}
