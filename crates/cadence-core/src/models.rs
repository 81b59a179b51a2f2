use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Recurrence Pattern Models
// ============================================================================

/// How often a recurring event repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Single event, never expanded
    #[default]
    None,
    Daily,
    Weekly,
    /// Same day of the month (e.g. the 15th)
    MonthlyByDate,
    /// Same ordinal weekday of the month (e.g. the second Tuesday)
    MonthlyByWeekday,
    YearlyByDate,
    YearlyByWeekday,
    /// Opaque rule carried in `RecurrencePattern::custom_rule`
    Custom,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::None => write!(f, "none"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::MonthlyByDate => write!(f, "monthly_by_date"),
            Frequency::MonthlyByWeekday => write!(f, "monthly_by_weekday"),
            Frequency::YearlyByDate => write!(f, "yearly_by_date"),
            Frequency::YearlyByWeekday => write!(f, "yearly_by_weekday"),
            Frequency::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid frequency: {0}")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Frequency::None),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" | "monthly_by_date" => Ok(Frequency::MonthlyByDate),
            "monthly_by_weekday" => Ok(Frequency::MonthlyByWeekday),
            "yearly" | "yearly_by_date" => Ok(Frequency::YearlyByDate),
            "yearly_by_weekday" => Ok(Frequency::YearlyByWeekday),
            "custom" => Ok(Frequency::Custom),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

fn default_interval() -> i32 {
    1
}

/// Describes *how* an event repeats.
///
/// Fields are deliberately loose (`interval` is signed, weekday numbers are raw `u8`)
/// so that malformed patterns coming from a UI can be represented and reported by
/// [`crate::validation::validate`] instead of failing at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// Step count, every N units. Valid values are `>= 1`.
    #[serde(default = "default_interval")]
    pub interval: i32,
    /// Weekday numbers `0..=6`, Sunday = 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    /// `1..=31`, defaults to the anchor's day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    /// `0..=11`, defaults to the anchor's month
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rule: Option<String>,
}

impl Default for RecurrencePattern {
    fn default() -> Self {
        Self {
            frequency: Frequency::None,
            interval: 1,
            days_of_week: None,
            day_of_month: None,
            month: None,
            custom_rule: None,
        }
    }
}

impl RecurrencePattern {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            ..Default::default()
        }
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    pub fn custom(rule: impl Into<String>) -> Self {
        Self {
            custom_rule: Some(rule.into()),
            ..Self::new(Frequency::Custom)
        }
    }

    pub fn with_interval(mut self, interval: i32) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_days(mut self, days: &[u8]) -> Self {
        self.days_of_week = Some(days.to_vec());
        self
    }

    pub fn on_day_of_month(mut self, day: u32) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn in_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// Valid weekday numbers, sorted and deduplicated.
    pub fn sorted_weekdays(&self) -> Vec<u8> {
        let mut days: Vec<u8> = self
            .days_of_week
            .iter()
            .flatten()
            .copied()
            .filter(|d| *d <= 6)
            .collect();
        days.sort_unstable();
        days.dedup();
        days
    }
}

/// When repetition stops.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EndCondition {
    #[default]
    Never,
    EndDate(DateTime<Utc>),
    Count(u32),
}

/// Describes *when* repetition starts and stops.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceBounds {
    /// Anchor; every occurrence is congruent to it under the pattern's stepping rule
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_condition: EndCondition,
    /// Hard safety ceiling, independent of `end_condition`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<DateTime<Utc>>,
}

impl RecurrenceBounds {
    pub fn new(start_date: DateTime<Utc>) -> Self {
        Self {
            start_date,
            end_condition: EndCondition::Never,
            max_date: None,
        }
    }

    pub fn with_end(mut self, end_condition: EndCondition) -> Self {
        self.end_condition = end_condition;
        self
    }

    pub fn with_max_date(mut self, max_date: DateTime<Utc>) -> Self {
        self.max_date = Some(max_date);
        self
    }

    /// Latest instant an occurrence may start at, combining the end date and `max_date`.
    pub fn hard_limit(&self) -> Option<DateTime<Utc>> {
        let end_date = match self.end_condition {
            EndCondition::EndDate(d) => Some(d),
            _ => None,
        };
        match (end_date, self.max_date) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    pub pattern: RecurrencePattern,
    pub bounds: RecurrenceBounds,
}

// ============================================================================
// Event Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attendee {
    /// Stable identity used for double-booking detection
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub(crate) fn identity(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// A calendar event. When `recurrence` is set this is the master event of a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            description: None,
            location: None,
            start,
            end,
            attendees: Vec::new(),
            recurrence: None,
        }
    }

    /// Attaches a recurrence anchored at the event's own start.
    pub fn repeating(mut self, pattern: RecurrencePattern, end_condition: EndCondition) -> Self {
        self.recurrence = Some(Recurrence {
            pattern,
            bounds: RecurrenceBounds::new(self.start).with_end(end_condition),
        });
        self
    }

    pub fn with_recurrence(mut self, pattern: RecurrencePattern, bounds: RecurrenceBounds) -> Self {
        self.recurrence = Some(Recurrence { pattern, bounds });
        self
    }

    pub fn with_attendees<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendees = emails.into_iter().map(Attendee::new).collect();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Length of the event; zero for malformed events whose end precedes the start.
    pub fn duration(&self) -> Duration {
        (self.end - self.start).max(Duration::zero())
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence
            .as_ref()
            .is_some_and(|r| r.pattern.frequency != Frequency::None)
    }

    /// Copy of this event placed at `start`, with the recurrence stripped.
    pub fn snapshot_at(&self, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            start,
            end: saturating_add(start, self.duration()),
            recurrence: None,
            ..self.clone()
        }
    }
}

// ============================================================================
// Exception Models
// ============================================================================

/// Field overrides carried by a `Modify` exception. Unset fields keep the series value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EventOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl EventOverride {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
    }

    pub fn retime(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// What an exception does to the occurrence it is keyed on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExceptionAction {
    /// The occurrence disappears from expansions
    Delete,
    /// The occurrence keeps its duration but starts at `new_start`
    Move { new_start: DateTime<Utc> },
    /// Any subset of start, end, title, description and location is replaced
    Modify(EventOverride),
}

impl ExceptionAction {
    pub fn kind(&self) -> ExceptionKind {
        match self {
            ExceptionAction::Delete => ExceptionKind::Delete,
            ExceptionAction::Move { .. } => ExceptionKind::Move,
            ExceptionAction::Modify(_) => ExceptionKind::Modify,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionKind {
    Delete,
    Move,
    Modify,
}

impl std::fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExceptionKind::Delete => write!(f, "delete"),
            ExceptionKind::Move => write!(f, "move"),
            ExceptionKind::Modify => write!(f, "modify"),
        }
    }
}

impl FromStr for ExceptionKind {
    type Err = ParseExceptionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delete" | "skip" => Ok(ExceptionKind::Delete),
            "move" => Ok(ExceptionKind::Move),
            "modify" | "override" => Ok(ExceptionKind::Modify),
            _ => Err(ParseExceptionKindError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid exception kind: {0}")]
pub struct ParseExceptionKindError(String);

/// A deviation from the generated series for one occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceException {
    /// Master event the exception belongs to
    pub event_id: Uuid,
    /// Unmodified start of the occurrence; the identity key
    pub original_start: DateTime<Utc>,
    #[serde(flatten)]
    pub action: ExceptionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RecurrenceException {
    pub fn new(event_id: Uuid, original_start: DateTime<Utc>, action: ExceptionAction) -> Self {
        Self {
            event_id,
            original_start,
            action,
            reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn delete(event_id: Uuid, original_start: DateTime<Utc>) -> Self {
        Self::new(event_id, original_start, ExceptionAction::Delete)
    }

    pub fn moved(event_id: Uuid, original_start: DateTime<Utc>, new_start: DateTime<Utc>) -> Self {
        Self::new(event_id, original_start, ExceptionAction::Move { new_start })
    }

    pub fn modified(event_id: Uuid, original_start: DateTime<Utc>, changes: EventOverride) -> Self {
        Self::new(event_id, original_start, ExceptionAction::Modify(changes))
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// ============================================================================
// Expansion Results
// ============================================================================

/// One concrete instance produced by expanding a master event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Occurrence {
    /// Start the pattern naturally produces; stays stable across exceptions
    pub original_start: DateTime<Utc>,
    pub actual_start: DateTime<Utc>,
    pub actual_end: DateTime<Utc>,
    /// Whether a move/modify exception altered this occurrence
    pub is_exception: bool,
    /// 0-based position within one expansion call
    pub sequence: usize,
    /// Master fields with start/end replaced; what callers render, store or conflict-check
    pub source_event: CalendarEvent,
}

impl Occurrence {
    pub(crate) fn from_master(master: &CalendarEvent, start: DateTime<Utc>, sequence: usize) -> Self {
        let source_event = master.snapshot_at(start);
        Self {
            original_start: start,
            actual_start: source_event.start,
            actual_end: source_event.end,
            is_exception: false,
            sequence,
            source_event,
        }
    }

    pub fn title(&self) -> &str {
        &self.source_event.title
    }
}

/// Inclusive range of instants over which occurrences are requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Whole days, from `from_date` 00:00:00 through `to_date` 23:59:59.
    pub fn days(from_date: NaiveDate, to_date: NaiveDate) -> Self {
        let from = from_date.and_time(chrono::NaiveTime::default()).and_utc();
        let to = to_date
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc())
            .unwrap_or(from);
        Self { from, to }
    }

    pub fn starting_at(from: DateTime<Utc>, days: i64) -> Self {
        Self {
            from,
            to: saturating_add_days(from, days),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

/// `at + delta`, pinned to the representable range instead of overflowing.
pub fn saturating_add(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta)
        .unwrap_or(if delta < Duration::zero() { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC })
}

/// `at` moved by whole days, saturating like [`saturating_add`].
pub fn saturating_add_days(at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    match Duration::try_days(days) {
        Some(delta) => saturating_add(at, delta),
        None if days < 0 => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}

// ============================================================================
// Conflict Models
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Overlap,
    /// Overlap where the events share an attendee
    DoubleBooking,
    /// Overlap where the events claim the same location
    ResourceConflict,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::Overlap => write!(f, "overlap"),
            ConflictType::DoubleBooking => write!(f, "double booking"),
            ConflictType::ResourceConflict => write!(f, "resource conflict"),
        }
    }
}

/// A detected scheduling collision. Computed on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventConflict {
    pub conflict_type: ConflictType,
    pub counterpart_event: CalendarEvent,
    /// Overlap of the unbuffered intervals; zero when only the buffer collides
    pub overlap_minutes: i64,
    pub details: String,
    pub suggestion: String,
}

/// Conflicts found for one occurrence of a recurring candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccurrenceConflicts {
    pub occurrence: Occurrence,
    pub conflicts: Vec<EventConflict>,
}

// ============================================================================
// Series Editing
// ============================================================================

/// Scope for edits applied to one occurrence of a recurring event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    /// Affect only the selected occurrence
    ThisOccurrence,
    /// Split the series and change it from this occurrence on
    ThisAndFuture,
    /// Modify the entire series including past occurrences
    EntireSeries,
}

impl std::fmt::Display for EditScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditScope::ThisOccurrence => write!(f, "occurrence"),
            EditScope::ThisAndFuture => write!(f, "future"),
            EditScope::EntireSeries => write!(f, "series"),
        }
    }
}

impl FromStr for EditScope {
    type Err = ParseEditScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "occurrence" | "this" => Ok(EditScope::ThisOccurrence),
            "future" | "this_and_future" => Ok(EditScope::ThisAndFuture),
            "series" | "entire" | "all" => Ok(EditScope::EntireSeries),
            _ => Err(ParseEditScopeError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid edit scope: {0}")]
pub struct ParseEditScopeError(String);
