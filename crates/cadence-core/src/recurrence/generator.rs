//! Occurrence generation: the next-date stepping rules of every frequency and the
//! bounded scan that turns a master event into raw (pre-exception) occurrences.
//!
//! Stepping is organised in *periods*. Period `k` is the `k`-th step from the anchor:
//! one day, one Sunday-started week, one month or one year, scaled by the interval.
//! Candidates inside a period are sorted and every candidate of period `k` precedes
//! every candidate of period `k + 1`, so walking periods in order yields a strictly
//! ascending cursor.
//!
//! Months or years lacking the requested day (the 31st in April, February 29th outside
//! leap years, a fifth Tuesday) are skipped rather than clamped.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::calendar::SkipPolicy;
use crate::models::{
    CalendarEvent, DateWindow, EndCondition, Frequency, Occurrence, Recurrence, RecurrencePattern,
};

/// Candidate periods a single scan walks before giving up.
pub const MAX_SCAN_STEPS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StepKind {
    Daily,
    Weekly { days: Vec<u8> },
    MonthlyByDate { day: u32 },
    MonthlyByWeekday { days: Vec<u8>, nth: u32 },
    YearlyByDate { month: u32, day: u32 },
    YearlyByWeekday { month: u32, days: Vec<u8>, nth: u32 },
}

/// Next-date rules for one pattern, anchored at the series start.
#[derive(Debug, Clone)]
pub(crate) struct Stepper {
    kind: StepKind,
    anchor: DateTime<Utc>,
    anchor_date: NaiveDate,
    time: NaiveTime,
    interval: i64,
}

impl Stepper {
    /// Returns `None` for patterns that cannot produce anything: no frequency, a
    /// non-positive interval, or out-of-range day/month/weekday values.
    pub(crate) fn new(pattern: &RecurrencePattern, anchor: DateTime<Utc>) -> Option<Self> {
        if pattern.interval < 1 {
            return None;
        }
        let anchor_date = anchor.date_naive();
        let nth = (anchor_date.day() - 1) / 7 + 1;
        let day = pattern.day_of_month.unwrap_or(anchor_date.day());
        if !(1..=31).contains(&day) {
            return None;
        }
        let month = match pattern.month {
            Some(m) if m <= 11 => m + 1,
            Some(_) => return None,
            None => anchor_date.month(),
        };

        let kind = match pattern.frequency {
            Frequency::None | Frequency::Custom => return None,
            Frequency::Daily => StepKind::Daily,
            Frequency::Weekly => StepKind::Weekly {
                days: weekdays_or_anchor(pattern, anchor_date)?,
            },
            Frequency::MonthlyByDate => StepKind::MonthlyByDate { day },
            Frequency::MonthlyByWeekday => StepKind::MonthlyByWeekday {
                days: weekdays_or_anchor(pattern, anchor_date)?,
                nth,
            },
            Frequency::YearlyByDate => StepKind::YearlyByDate { month, day },
            Frequency::YearlyByWeekday => StepKind::YearlyByWeekday {
                month,
                days: weekdays_or_anchor(pattern, anchor_date)?,
                nth,
            },
        };

        Some(Self {
            kind,
            anchor,
            anchor_date,
            time: anchor.time(),
            interval: i64::from(pattern.interval),
        })
    }

    pub(crate) fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// Index of the period whose date range contains `at`, or the last one before it.
    pub(crate) fn period_containing(&self, at: DateTime<Utc>) -> i64 {
        let date = at.date_naive();
        let units = match &self.kind {
            StepKind::Daily => (date - self.anchor_date).num_days(),
            StepKind::Weekly { .. } => {
                (week_start(date) - week_start(self.anchor_date)).num_days() / 7
            }
            StepKind::MonthlyByDate { .. } | StepKind::MonthlyByWeekday { .. } => {
                month_index(date) - month_index(self.anchor_date)
            }
            StepKind::YearlyByDate { .. } | StepKind::YearlyByWeekday { .. } => {
                i64::from(date.year()) - i64::from(self.anchor_date.year())
            }
        };
        units.div_euclid(self.interval)
    }

    /// First calendar date covered by period `k`.
    pub(crate) fn period_start(&self, k: i64) -> Option<NaiveDate> {
        let step = k.checked_mul(self.interval)?;
        match &self.kind {
            StepKind::Daily => add_days(self.anchor_date, step),
            StepKind::Weekly { .. } => add_days(week_start(self.anchor_date), step.checked_mul(7)?),
            StepKind::MonthlyByDate { .. } | StepKind::MonthlyByWeekday { .. } => {
                month_date(month_index(self.anchor_date).checked_add(step)?, 1)
            }
            StepKind::YearlyByDate { .. } | StepKind::YearlyByWeekday { .. } => {
                ymd(i64::from(self.anchor_date.year()).checked_add(step)?, 1, 1)
            }
        }
    }

    /// Sorted candidates of period `k`, before membership filtering against the anchor.
    pub(crate) fn period(&self, k: i64) -> Vec<DateTime<Utc>> {
        self.period_dates(k)
            .into_iter()
            .map(|date| date.and_time(self.time).and_utc())
            .collect()
    }

    fn period_dates(&self, k: i64) -> Vec<NaiveDate> {
        let Some(step) = k.checked_mul(self.interval) else {
            return Vec::new();
        };
        match &self.kind {
            StepKind::Daily => add_days(self.anchor_date, step).into_iter().collect(),
            StepKind::Weekly { days } => {
                let Some(week) = step
                    .checked_mul(7)
                    .and_then(|offset| add_days(week_start(self.anchor_date), offset))
                else {
                    return Vec::new();
                };
                days.iter()
                    .filter_map(|d| add_days(week, i64::from(*d)))
                    .collect()
            }
            StepKind::MonthlyByDate { day } => month_index(self.anchor_date)
                .checked_add(step)
                .and_then(|index| month_date(index, *day))
                .into_iter()
                .collect(),
            StepKind::MonthlyByWeekday { days, nth } => {
                let Some(index) = month_index(self.anchor_date).checked_add(step) else {
                    return Vec::new();
                };
                let (year, month) = split_month_index(index);
                ordinal_weekdays(year, month, days, *nth)
            }
            StepKind::YearlyByDate { month, day } => i64::from(self.anchor_date.year())
                .checked_add(step)
                .and_then(|year| ymd(year, *month, *day))
                .into_iter()
                .collect(),
            StepKind::YearlyByWeekday { month, days, nth } => {
                let Some(year) = i64::from(self.anchor_date.year()).checked_add(step) else {
                    return Vec::new();
                };
                ordinal_weekdays(year, *month, days, *nth)
            }
        }
    }
}

/// A pattern resolved against its bounds: stepping rules plus the effective end.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedRule {
    pub(crate) stepper: Stepper,
    end_condition: EndCondition,
    limit: Option<DateTime<Utc>>,
}

impl ResolvedRule {
    /// `Custom` patterns are decoded through the RRULE codec; an end carried by the
    /// custom rule applies only when the bounds themselves never end.
    pub(crate) fn resolve(recurrence: &Recurrence) -> Option<Self> {
        if recurrence.pattern.frequency == Frequency::None {
            return None;
        }
        let (pattern, bounds) = crate::rrule::concrete(&recurrence.pattern, &recurrence.bounds)?;
        Some(Self {
            stepper: Stepper::new(&pattern, bounds.start_date)?,
            end_condition: bounds.end_condition,
            limit: bounds.hard_limit(),
        })
    }

    pub(crate) fn is_counted(&self) -> bool {
        matches!(self.end_condition, EndCondition::Count(_))
    }

    /// Whether `start` may be an occurrence: not before the anchor, not past the
    /// bounds, and not removed by the calendar policy.
    pub(crate) fn admits(&self, start: DateTime<Utc>, skip: Option<&dyn SkipPolicy>) -> bool {
        start >= self.stepper.anchor
            && self.limit.map_or(true, |limit| start <= limit)
            && !skip.is_some_and(|policy| policy.should_skip(start))
    }

    pub(crate) fn limit(&self) -> Option<DateTime<Utc>> {
        self.limit
    }

    pub(crate) fn candidates<'a>(
        &self,
        skip: Option<&'a dyn SkipPolicy>,
        max_steps: usize,
    ) -> Candidates<'a> {
        let remaining = match self.end_condition {
            EndCondition::Count(n) => Some(n),
            _ => None,
        };
        Candidates {
            rule: self.clone(),
            skip,
            horizon: self.limit,
            next_period: 0,
            pending: VecDeque::new(),
            remaining,
            steps: 0,
            max_steps,
            ceiling_hit: false,
            done: false,
        }
    }
}

/// Ascending stream of accepted occurrence starts for one rule.
///
/// Stops at the rule's hard limit, after `Count(n)` accepted starts, or after
/// `max_steps` periods.
pub(crate) struct Candidates<'a> {
    rule: ResolvedRule,
    skip: Option<&'a dyn SkipPolicy>,
    horizon: Option<DateTime<Utc>>,
    next_period: i64,
    pending: VecDeque<DateTime<Utc>>,
    remaining: Option<u32>,
    steps: usize,
    max_steps: usize,
    ceiling_hit: bool,
    done: bool,
}

impl Candidates<'_> {
    /// Stop once the cursor passes `at`.
    pub(crate) fn until(mut self, at: DateTime<Utc>) -> Self {
        self.horizon = Some(self.horizon.map_or(at, |h| h.min(at)));
        self
    }

    /// Jump straight to the period containing `at`.
    ///
    /// Counted series keep scanning from the anchor because every earlier occurrence
    /// consumes the budget. The periods walked to reach `at` are charged against
    /// `MAX_SCAN_STEPS` rather than the step limit, which then applies from `at` on.
    pub(crate) fn fast_forward_to(mut self, at: DateTime<Utc>) -> Self {
        let target = self.rule.stepper.period_containing(at).max(0);
        if self.remaining.is_none() {
            self.next_period = target;
        } else {
            let approach = usize::try_from(target).unwrap_or(usize::MAX).min(MAX_SCAN_STEPS);
            self.max_steps = self.max_steps.saturating_add(approach);
        }
        self
    }

    pub(crate) fn hit_scan_ceiling(&self) -> bool {
        self.ceiling_hit
    }
}

impl Iterator for Candidates<'_> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.remaining == Some(0) {
                self.done = true;
                return None;
            }

            if let Some(candidate) = self.pending.pop_front() {
                if candidate < self.rule.stepper.anchor {
                    continue;
                }
                if self.horizon.is_some_and(|h| candidate > h) {
                    self.done = true;
                    continue;
                }
                if self.skip.is_some_and(|policy| policy.should_skip(candidate)) {
                    continue;
                }
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(candidate);
            }

            if self.steps >= self.max_steps {
                self.ceiling_hit = true;
                self.done = true;
                continue;
            }

            let period = self.next_period;
            self.steps += 1;
            self.next_period += 1;

            match self.rule.stepper.period_start(period) {
                Some(start)
                    if self
                        .horizon
                        .map_or(true, |h| start.and_time(NaiveTime::default()).and_utc() <= h) =>
                {
                    self.pending.extend(self.rule.stepper.period(period));
                }
                _ => self.done = true,
            }
        }
    }
}

/// Expands a master event into raw occurrences inside `window`.
///
/// Total: malformed input (no recurrence, non-positive interval, empty window, end
/// before start, unknown custom rule) yields an empty or truncated list, never a panic.
/// At most `max_occurrences` occurrences are returned.
#[tracing::instrument(level = "debug", skip_all, fields(event_id = %master.id))]
pub fn expand(
    master: &CalendarEvent,
    window: &DateWindow,
    max_occurrences: usize,
    skip: Option<&dyn SkipPolicy>,
) -> Vec<Occurrence> {
    let Some(recurrence) = master.recurrence.as_ref() else {
        return Vec::new();
    };
    if window.is_empty() || max_occurrences == 0 {
        return Vec::new();
    }
    let Some(rule) = ResolvedRule::resolve(recurrence) else {
        debug!(frequency = %recurrence.pattern.frequency, "pattern cannot produce occurrences");
        return Vec::new();
    };

    let scan_from = window.from.max(rule.stepper.anchor());
    let mut candidates = rule
        .candidates(skip, MAX_SCAN_STEPS)
        .until(window.to)
        .fast_forward_to(scan_from);

    let mut occurrences = Vec::with_capacity(max_occurrences.min(64));
    for start in candidates.by_ref() {
        if start < scan_from {
            continue;
        }
        occurrences.push(Occurrence::from_master(master, start, occurrences.len()));
        if occurrences.len() >= max_occurrences {
            debug!(max_occurrences, "occurrence cap reached");
            break;
        }
    }

    if candidates.hit_scan_ceiling() {
        warn!(
            steps = MAX_SCAN_STEPS,
            found = occurrences.len(),
            "scan ceiling reached before the window was exhausted"
        );
    }
    debug!(count = occurrences.len(), from = %window.from, to = %window.to, "expanded");
    occurrences
}

fn weekdays_or_anchor(pattern: &RecurrencePattern, anchor_date: NaiveDate) -> Option<Vec<u8>> {
    let days = pattern.sorted_weekdays();
    let supplied = pattern.days_of_week.as_ref().is_some_and(|d| !d.is_empty());
    match (supplied, days.is_empty()) {
        // every supplied value was out of range
        (true, true) => None,
        (false, _) => Some(vec![weekday_number(anchor_date)]),
        (true, false) => Some(days),
    }
}

pub(crate) fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn week_start(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(weekday_number(date))).unwrap_or(date)
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn split_month_index(index: i64) -> (i64, u32) {
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn month_date(index: i64, day: u32) -> Option<NaiveDate> {
    let (year, month) = split_month_index(index);
    ymd(year, month, day)
}

fn ymd(year: i64, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// The `nth` (1-based) occurrence of `weekday` in the month, if the month has one.
pub(crate) fn nth_weekday_of_month(year: i64, month: u32, weekday: u8, nth: u32) -> Option<NaiveDate> {
    let first = ymd(year, month, 1)?;
    let offset = (u32::from(weekday) + 7 - u32::from(weekday_number(first))) % 7;
    ymd(year, month, 1 + offset + nth.checked_sub(1)? * 7)
}

fn ordinal_weekdays(year: i64, month: u32, days: &[u8], nth: u32) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = days
        .iter()
        .filter_map(|d| nth_weekday_of_month(year, month, *d, nth))
        .collect();
    dates.sort_unstable();
    dates
}
