//! Calendar-system policies consulted while generating occurrences.
//!
//! A [`SkipPolicy`] silently removes candidate dates (weekends, holidays) from a series.
//! Skipped dates are not occurrences, so they do not consume a `Count` budget.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub trait SkipPolicy {
    fn should_skip(&self, at: DateTime<Utc>) -> bool;
}

impl<F> SkipPolicy for F
where
    F: Fn(DateTime<Utc>) -> bool,
{
    fn should_skip(&self, at: DateTime<Utc>) -> bool {
        self(at)
    }
}

/// Working-days-only mode: optional weekend skipping plus a holiday list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDays {
    #[serde(default)]
    pub skip_weekends: bool,
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
}

impl WorkingDays {
    pub fn weekdays_only() -> Self {
        Self {
            skip_weekends: true,
            holidays: BTreeSet::new(),
        }
    }

    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    /// Whether this policy can skip anything at all.
    pub fn is_active(&self) -> bool {
        self.skip_weekends || !self.holidays.is_empty()
    }
}

impl SkipPolicy for WorkingDays {
    fn should_skip(&self, at: DateTime<Utc>) -> bool {
        let date = at.date_naive();
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        (self.skip_weekends && weekend) || self.holidays.contains(&date)
    }
}
