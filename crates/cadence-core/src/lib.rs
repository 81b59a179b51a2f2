//! # Cadence Core Library
//!
//! Recurrence expansion and conflict detection for calendar events: turn one event
//! definition plus a recurrence rule into a bounded, exception-aware list of concrete
//! occurrences, and find out whether an event collides with others.
//!
//! ## Features
//!
//! - **Bounded Expansion**: daily, weekly, monthly and yearly patterns (by date or by
//!   ordinal weekday) expanded lazily and stopped by hard caps, whatever the input
//! - **Exceptions**: delete, move or modify single occurrences, keyed by original start
//! - **Navigation**: next/previous occurrence around any instant without expanding a window
//! - **Conflict Detection**: overlaps with buffer time, double bookings and room clashes
//! - **RRULE Codec**: a reduced RFC 5545 grammar, parsed and generated
//! - **Series Edits**: this occurrence, this and future, or the entire series
//!
//! ## Core Modules
//!
//! - [`models`]: Events, patterns, exceptions, occurrences and conflicts
//! - [`recurrence`]: Generator, exception overlay, navigator and [`recurrence::RecurrenceManager`]
//! - [`conflict`]: Conflict detection for single and recurring candidates
//! - [`validation`]: Structural checks on a pattern and its bounds
//! - [`rrule`]: Rule text codec
//! - [`analyzer`]: Descriptions and statistics
//! - [`calendar`]: Skip policies (working days, holidays)
//! - [`store`]: Exception storage keyed by master event
//! - [`series`]: Scoped edits
//! - [`config`]: Engine limits and defaults
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     models::{CalendarEvent, EndCondition, RecurrencePattern, RecurrenceException},
//!     recurrence::RecurrenceManager,
//! };
//! use chrono::{Duration, TimeZone, Utc};
//!
//! fn main() -> Result<(), cadence_core::error::CoreError> {
//!     let start = Utc.with_ymd_and_hms(2025, 7, 7, 10, 0, 0).unwrap();
//!     let gym = CalendarEvent::new("Gym", start, start + Duration::hours(1))
//!         .repeating(RecurrencePattern::weekly().on_days(&[1, 3, 5]), EndCondition::Count(6));
//!
//!     let skip_wednesday = RecurrenceException::delete(gym.id, start + Duration::days(2));
//!     let manager = RecurrenceManager::new(gym, vec![skip_wednesday])?;
//!
//!     for occurrence in manager.generate_occurrences_between(start, start + Duration::days(14)) {
//!         println!("{} {}", occurrence.sequence, occurrence.actual_start);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod calendar;
pub mod config;
pub mod conflict;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod rrule;
pub mod series;
pub mod store;
pub mod validation;
