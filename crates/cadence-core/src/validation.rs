//! Structural validation of a recurrence pattern and its bounds.
//!
//! Validation is advisory: the report lists problems, nothing is raised. The generator
//! defends against every error reported here on its own, since callers may skip this step.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{EndCondition, Frequency, RecurrenceBounds, RecurrencePattern};

/// A problem tied to the field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationReport {
    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(FieldIssue::new(field, message));
    }

    fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(FieldIssue::new(field, message));
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Checks a pattern and its bounds for structural validity.
pub fn validate(pattern: &RecurrencePattern, bounds: &RecurrenceBounds) -> ValidationReport {
    let mut report = ValidationReport::default();

    match pattern.frequency {
        Frequency::None => report.error("frequency", "frequency is required for a recurrence rule"),
        Frequency::Custom if pattern.custom_rule.as_deref().map_or(true, |r| r.trim().is_empty()) => {
            report.error("custom_rule", "custom frequency requires a rule")
        }
        _ => {}
    }

    if pattern.interval < 1 {
        report.error(
            "interval",
            format!("interval must be at least 1, got {}", pattern.interval),
        );
    }

    if let Some(days) = &pattern.days_of_week {
        let invalid: Vec<String> = days.iter().filter(|d| **d > 6).map(|d| d.to_string()).collect();
        if !invalid.is_empty() {
            report.error(
                "days_of_week",
                format!("weekdays must be between 0 (Sunday) and 6 (Saturday), got {}", invalid.join(", ")),
            );
        }
        if days.is_empty() && pattern.frequency == Frequency::Weekly {
            report.warn("days_of_week", "empty weekday list, the start date's weekday is used");
        }
    }

    if let Some(day) = pattern.day_of_month {
        if !(1..=31).contains(&day) {
            report.error("day_of_month", format!("day of month must be between 1 and 31, got {day}"));
        }
    }

    if let Some(month) = pattern.month {
        if month > 11 {
            report.error("month", format!("month must be between 0 and 11, got {month}"));
        }
    }

    match bounds.end_condition {
        EndCondition::EndDate(end) if end <= bounds.start_date => {
            report.error("end_condition", "end date must be after start date")
        }
        EndCondition::Count(0) => report.error("end_condition", "occurrence count must be at least 1"),
        EndCondition::Never if bounds.max_date.is_none() => report.warn(
            "end_condition",
            "recurrence never ends; expansion will be limited by safety caps",
        ),
        _ => {}
    }

    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated recurrence"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rstest::rstest;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
    }

    fn bounded(end: EndCondition) -> RecurrenceBounds {
        RecurrenceBounds::new(start()).with_end(end)
    }

    fn error_fields(report: &ValidationReport) -> Vec<&str> {
        report.errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_pattern_has_no_issues() {
        let report = validate(&RecurrencePattern::daily(), &bounded(EndCondition::Count(10)));
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(!report.has_warnings());
    }

    #[rstest]
    #[case::zero_interval(RecurrencePattern::daily().with_interval(0), "interval")]
    #[case::negative_interval(RecurrencePattern::daily().with_interval(-1), "interval")]
    #[case::bad_weekday(RecurrencePattern::weekly().on_days(&[1, 7]), "days_of_week")]
    #[case::bad_day(RecurrencePattern::new(Frequency::MonthlyByDate).on_day_of_month(32), "day_of_month")]
    #[case::bad_month(RecurrencePattern::new(Frequency::YearlyByDate).in_month(12), "month")]
    #[case::no_frequency(RecurrencePattern::default(), "frequency")]
    #[case::empty_custom(RecurrencePattern::custom(" "), "custom_rule")]
    fn test_structural_errors(#[case] pattern: RecurrencePattern, #[case] field: &str) {
        let report = validate(&pattern, &bounded(EndCondition::Count(3)));
        assert!(!report.is_valid);
        assert_eq!(error_fields(&report), vec![field]);
    }

    #[test]
    fn test_end_date_before_start_is_an_error() {
        let report = validate(
            &RecurrencePattern::daily(),
            &bounded(EndCondition::EndDate(start() - Duration::days(1))),
        );
        assert!(!report.is_valid);
        assert_eq!(error_fields(&report), vec!["end_condition"]);
        assert!(report.errors[0].message.contains("end date"));
    }

    #[test]
    fn test_zero_count_is_an_error() {
        let report = validate(&RecurrencePattern::daily(), &bounded(EndCondition::Count(0)));
        assert_eq!(error_fields(&report), vec!["end_condition"]);
    }

    #[test]
    fn test_unbounded_series_warns() {
        let report = validate(&RecurrencePattern::daily(), &bounded(EndCondition::Never));
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);

        let capped = RecurrenceBounds::new(start()).with_max_date(start() + Duration::days(90));
        assert!(!validate(&RecurrencePattern::daily(), &capped).has_warnings());
    }

    #[test]
    fn test_empty_weekly_days_warns() {
        let report = validate(&RecurrencePattern::weekly().on_days(&[]), &bounded(EndCondition::Count(4)));
        assert!(report.is_valid);
        assert_eq!(report.warnings[0].field, "days_of_week");
    }

    #[test]
    fn test_multiple_errors_are_all_reported() {
        let pattern = RecurrencePattern::weekly().with_interval(0).on_days(&[9]);
        let report = validate(&pattern, &bounded(EndCondition::Count(0)));
        assert_eq!(error_fields(&report), vec!["interval", "days_of_week", "end_condition"]);
        assert_eq!(report.errors[0].to_string(), "interval: interval must be at least 1, got 0");
    }
}
