//! Human-readable summaries and rough statistics for a recurrence.

use chrono::{DateTime, Datelike, Month, Utc};
use serde::Serialize;

use crate::models::{
    CalendarEvent, EndCondition, Frequency, Occurrence, RecurrenceBounds, RecurrenceException,
    RecurrencePattern,
};
use crate::recurrence::navigator::{next_occurrence, previous_occurrence};

/// Occurrence estimate reported for a series that never ends.
pub const DEFAULT_UNBOUNDED_ESTIMATE: u64 = 1000;

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];
const ORDINALS: [&str; 5] = ["first", "second", "third", "fourth", "fifth"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurrenceAnalysis {
    pub description: String,
    pub next_occurrence: Option<Occurrence>,
    pub previous_occurrence: Option<Occurrence>,
    pub frequency_per_year: f64,
    pub complexity_score: u32,
    /// `None` when the count cannot be estimated (an undecodable custom rule)
    pub total_occurrences: Option<u64>,
}

/// Summarizes an event's recurrence relative to `now`.
pub fn analyze(
    event: &CalendarEvent,
    exceptions: &[RecurrenceException],
    now: DateTime<Utc>,
) -> RecurrenceAnalysis {
    let next = next_occurrence(event, exceptions, now);
    let previous = previous_occurrence(event, exceptions, now);

    match event.recurrence.as_ref().filter(|_| event.is_recurring()) {
        Some(recurrence) => {
            let pattern = &recurrence.pattern;
            let bounds = &recurrence.bounds;
            RecurrenceAnalysis {
                description: describe(pattern, bounds),
                next_occurrence: next,
                previous_occurrence: previous,
                frequency_per_year: frequency_per_year(pattern),
                complexity_score: complexity_score(pattern, bounds, exceptions.len()),
                total_occurrences: estimate_total_occurrences(pattern, bounds),
            }
        }
        None => RecurrenceAnalysis {
            description: "Does not repeat".to_string(),
            next_occurrence: next,
            previous_occurrence: previous,
            frequency_per_year: 0.0,
            complexity_score: 0,
            total_occurrences: Some(1),
        },
    }
}

/// English description, e.g. "Every 2 weeks on Monday, Wednesday, 10 times".
pub fn describe(pattern: &RecurrencePattern, bounds: &RecurrenceBounds) -> String {
    let anchor = bounds.start_date.date_naive();
    let every = |unit: &str, single: &str| match pattern.interval {
        1 => single.to_string(),
        n => format!("Every {n} {unit}s"),
    };
    let day = pattern.day_of_month.unwrap_or(anchor.day());
    let month = pattern.month.map_or(anchor.month(), |m| m + 1);
    let nth = ((anchor.day() - 1) / 7) as usize;

    let mut text = match pattern.frequency {
        Frequency::None => return "Does not repeat".to_string(),
        Frequency::Custom => {
            return format!("Custom rule {}", pattern.custom_rule.as_deref().unwrap_or("(empty)"));
        }
        Frequency::Daily => every("day", "Daily"),
        Frequency::Weekly => {
            let days = weekday_list(pattern);
            let base = every("week", "Weekly");
            if days.is_empty() {
                base
            } else {
                format!("{base} on {days}")
            }
        }
        Frequency::MonthlyByDate => format!("{} on day {day}", every("month", "Monthly")),
        Frequency::MonthlyByWeekday => format!(
            "{} on the {} {}",
            every("month", "Monthly"),
            ORDINALS[nth.min(4)],
            weekday_list_or_anchor(pattern, anchor.weekday().num_days_from_sunday() as usize)
        ),
        Frequency::YearlyByDate => format!("{} on {} {day}", every("year", "Yearly"), month_name(month)),
        Frequency::YearlyByWeekday => format!(
            "{} on the {} {} of {}",
            every("year", "Yearly"),
            ORDINALS[nth.min(4)],
            weekday_list_or_anchor(pattern, anchor.weekday().num_days_from_sunday() as usize),
            month_name(month)
        ),
    };

    match bounds.end_condition {
        EndCondition::Count(1) => text.push_str(", once"),
        EndCondition::Count(n) => text.push_str(&format!(", {n} times")),
        EndCondition::EndDate(d) => text.push_str(&format!(", until {}", d.format("%Y-%m-%d"))),
        EndCondition::Never => {}
    }
    text
}

/// Closed-form number of occurrences per year.
pub fn frequency_per_year(pattern: &RecurrencePattern) -> f64 {
    if pattern.interval < 1 {
        return 0.0;
    }
    let interval = f64::from(pattern.interval);
    let per_period = pattern.sorted_weekdays().len().max(1) as f64;
    match pattern.frequency {
        Frequency::None => 0.0,
        Frequency::Custom => pattern
            .custom_rule
            .as_deref()
            .and_then(|rule| crate::rrule::parse(rule).ok())
            .filter(|decoded| decoded.frequency != Frequency::Custom)
            .map_or(0.0, |decoded| frequency_per_year(&decoded)),
        Frequency::Daily => 365.0 / interval,
        Frequency::Weekly => 52.0 / interval * per_period,
        Frequency::MonthlyByDate => 12.0 / interval,
        Frequency::MonthlyByWeekday => 12.0 / interval * per_period,
        Frequency::YearlyByDate => 1.0 / interval,
        Frequency::YearlyByWeekday => per_period / interval,
    }
}

/// Additive score: how much there is to understand about a rule at a glance.
pub fn complexity_score(pattern: &RecurrencePattern, bounds: &RecurrenceBounds, exception_count: usize) -> u32 {
    let mut score = 0;
    if pattern.interval > 1 {
        score += 1;
    }
    if pattern.days_of_week.as_ref().is_some_and(|d| !d.is_empty()) {
        score += 2;
    }
    if matches!(pattern.frequency, Frequency::MonthlyByWeekday | Frequency::YearlyByWeekday) {
        score += 1;
    }
    if bounds.end_condition != EndCondition::Never {
        score += 1;
    }
    if pattern.frequency == Frequency::Custom {
        score += 3;
    }
    if exception_count > 0 {
        score += 1;
    }
    score
}

/// Exact for `Count`, estimated for date-bounded series.
pub fn estimate_total_occurrences(pattern: &RecurrencePattern, bounds: &RecurrenceBounds) -> Option<u64> {
    if pattern.frequency == Frequency::None {
        return Some(1);
    }
    let (pattern, bounds) = crate::rrule::concrete(pattern, bounds)?;
    if pattern.interval < 1 {
        return Some(0);
    }

    let limit = match bounds.end_condition {
        EndCondition::Count(n) => return Some(u64::from(n)),
        _ => bounds.hard_limit(),
    };
    let Some(limit) = limit else {
        return Some(DEFAULT_UNBOUNDED_ESTIMATE);
    };
    if limit < bounds.start_date {
        return Some(0);
    }

    let span_days = (limit - bounds.start_date).num_days() as f64;
    let interval = f64::from(pattern.interval);
    let period_days = match pattern.frequency {
        Frequency::Daily => interval,
        Frequency::Weekly => 7.0 * interval,
        Frequency::MonthlyByDate | Frequency::MonthlyByWeekday => 30.44 * interval,
        _ => 365.25 * interval,
    };
    let per_period = match pattern.frequency {
        Frequency::Daily | Frequency::MonthlyByDate | Frequency::YearlyByDate => 1.0,
        _ => pattern.sorted_weekdays().len().max(1) as f64,
    };
    // whole periods spanned, plus the anchor's own period
    let periods = (span_days / period_days).floor() + 1.0;
    Some((periods * per_period).ceil().max(1.0) as u64)
}

fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("?", |m| m.name())
}

fn weekday_list(pattern: &RecurrencePattern) -> String {
    pattern
        .sorted_weekdays()
        .iter()
        .map(|d| WEEKDAY_NAMES[usize::from(*d)])
        .collect::<Vec<_>>()
        .join(", ")
}

fn weekday_list_or_anchor(pattern: &RecurrencePattern, anchor_weekday: usize) -> String {
    let days = weekday_list(pattern);
    if days.is_empty() {
        WEEKDAY_NAMES[anchor_weekday.min(6)].to_string()
    } else {
        days
    }
}
