use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_english::{parse_date_string, Dialect};
use cadence_core::models::{saturating_add_days, DateWindow};
use thiserror::Error;

const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

#[derive(Error, Debug, PartialEq)]
#[error("Failed to parse date '{input}': {reason}")]
pub struct ParseDateError {
    input: String,
    reason: String,
}

/// Parses a point in time, interpreting naive values as UTC. Bare dates mean midnight.
///
/// Exact timestamps are tried first; anything else goes through `chrono_english`
/// ("tomorrow", "next friday 9am", "3 days ago").
pub fn parse_datetime(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ParseDateError> {
    parse(input, now, false)
}

/// Like [`parse_datetime`], but a bare date means the last second of that day.
pub fn parse_end_datetime(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ParseDateError> {
    parse(input, now, true)
}

fn parse(input: &str, now: DateTime<Utc>, end_of_day: bool) -> Result<DateTime<Utc>, ParseDateError> {
    let text = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(naive) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(day_bound(date, end_of_day));
    }
    parse_date_string(text, now, Dialect::Us).map_err(|e| ParseDateError {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

fn day_bound(date: NaiveDate, end_of_day: bool) -> DateTime<Utc> {
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
    } else {
        NaiveTime::default()
    };
    date.and_time(time).and_utc()
}

/// Builds the query window from optional bounds; a missing end spans `default_days`.
pub fn parse_window(
    from: Option<&str>,
    to: Option<&str>,
    default_days: i64,
    now: DateTime<Utc>,
) -> Result<DateWindow, ParseDateError> {
    let start = from.map(|s| parse_datetime(s, now)).transpose()?.unwrap_or(now);
    let end = match to {
        Some(s) => parse_end_datetime(s, now)?,
        None => saturating_add_days(start, default_days),
    };
    Ok(DateWindow::new(start, end))
}
