//! Reduced RRULE text codec.
//!
//! Understands `FREQ`, `INTERVAL`, `BYDAY`, `BYMONTHDAY`, `BYMONTH`, `COUNT` and `UNTIL`.
//! Rules outside that grammar (`BYSETPOS`, `BYWEEKNO`, sub-daily frequencies) are not
//! expanded; sub-daily frequencies survive as an opaque `Custom` pattern.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::CoreError;
use crate::models::{EndCondition, Frequency, RecurrenceBounds, RecurrencePattern};

const WEEKDAY_CODES: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];
const UNTIL_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A decoded rule: the pattern plus the end condition the text carried, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub pattern: RecurrencePattern,
    pub end_condition: Option<EndCondition>,
}

/// Parses rule text into a pattern, discarding any `COUNT`/`UNTIL`.
pub fn parse(text: &str) -> Result<RecurrencePattern, CoreError> {
    parse_rule(text).map(|rule| rule.pattern)
}

/// Parses rule text such as `RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE`.
pub fn parse_rule(text: &str) -> Result<ParsedRule, CoreError> {
    let trimmed = text.trim();
    let body = strip_prefix_ignore_case(trimmed, "RRULE:").unwrap_or(trimmed);

    let mut freq: Option<String> = None;
    let mut interval = 1;
    let mut days: Option<Vec<u8>> = None;
    let mut day_of_month = None;
    let mut month = None;
    let mut count = None;
    let mut until = None;

    for segment in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| CoreError::InvalidRRule(format!("expected KEY=VALUE, got '{segment}'")))?;
        let value = value.trim();

        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.to_ascii_uppercase()),
            "INTERVAL" => interval = parse_number::<i32>("INTERVAL", value)?,
            "BYDAY" => days = Some(parse_weekdays(value)?),
            "BYMONTHDAY" => {
                // only the first value of a list is kept
                let first = value.split(',').next().unwrap_or_default();
                day_of_month = Some(parse_number::<u32>("BYMONTHDAY", first)?);
            }
            "BYMONTH" => {
                let first = value.split(',').next().unwrap_or_default();
                let one_based = parse_number::<u32>("BYMONTH", first)?;
                if !(1..=12).contains(&one_based) {
                    return Err(CoreError::InvalidRRule(format!("BYMONTH out of range: {one_based}")));
                }
                month = Some(one_based - 1);
            }
            "COUNT" => count = Some(parse_number::<u32>("COUNT", value)?),
            "UNTIL" => until = Some(parse_until(value)?),
            _ => {}
        }
    }

    let Some(freq) = freq else {
        return Err(CoreError::InvalidRRule(format!("missing FREQ in '{text}'")));
    };

    let frequency = match (freq.as_str(), days.is_some()) {
        ("DAILY", _) => Frequency::Daily,
        ("WEEKLY", _) => Frequency::Weekly,
        ("MONTHLY", false) => Frequency::MonthlyByDate,
        ("MONTHLY", true) => Frequency::MonthlyByWeekday,
        ("YEARLY", false) => Frequency::YearlyByDate,
        ("YEARLY", true) => Frequency::YearlyByWeekday,
        ("HOURLY" | "MINUTELY" | "SECONDLY", _) => {
            return Ok(ParsedRule {
                pattern: RecurrencePattern::custom(body),
                end_condition: None,
            });
        }
        (other, _) => return Err(CoreError::InvalidRRule(format!("unsupported FREQ '{other}'"))),
    };

    let end_condition = match (count, until) {
        (Some(_), Some(_)) => {
            return Err(CoreError::InvalidRRule("COUNT and UNTIL are mutually exclusive".into()));
        }
        (Some(n), None) => Some(EndCondition::Count(n)),
        (None, Some(d)) => Some(EndCondition::EndDate(d)),
        (None, None) => None,
    };

    Ok(ParsedRule {
        pattern: RecurrencePattern {
            frequency,
            interval,
            days_of_week: days,
            day_of_month,
            month,
            custom_rule: None,
        },
        end_condition,
    })
}

/// Renders a pattern and its end condition as rule text.
///
/// `Custom` patterns are returned verbatim and `Frequency::None` renders as an empty
/// string.
pub fn generate(pattern: &RecurrencePattern, bounds: &RecurrenceBounds) -> String {
    let freq = match pattern.frequency {
        Frequency::None => return String::new(),
        Frequency::Custom => return pattern.custom_rule.clone().unwrap_or_default(),
        Frequency::Daily => "DAILY",
        Frequency::Weekly => "WEEKLY",
        Frequency::MonthlyByDate | Frequency::MonthlyByWeekday => "MONTHLY",
        Frequency::YearlyByDate | Frequency::YearlyByWeekday => "YEARLY",
    };

    let mut parts = vec![format!("FREQ={freq}"), format!("INTERVAL={}", pattern.interval)];

    let ordinal = matches!(pattern.frequency, Frequency::MonthlyByWeekday | Frequency::YearlyByWeekday);
    let mut days = if ordinal || pattern.frequency == Frequency::Weekly {
        pattern.sorted_weekdays()
    } else {
        Vec::new()
    };
    // a weekday-ordinal pattern without explicit days still needs BYDAY to decode back
    if days.is_empty() && ordinal {
        days.push(crate::recurrence::generator::weekday_number(bounds.start_date.date_naive()));
    }
    if !days.is_empty() {
        let codes: Vec<&str> = days.iter().map(|d| WEEKDAY_CODES[usize::from(*d)]).collect();
        parts.push(format!("BYDAY={}", codes.join(",")));
    }
    if let Some(day) = pattern.day_of_month {
        parts.push(format!("BYMONTHDAY={day}"));
    }
    if let Some(month) = pattern.month {
        parts.push(format!("BYMONTH={}", month + 1));
    }
    match bounds.end_condition {
        EndCondition::Count(n) => parts.push(format!("COUNT={n}")),
        EndCondition::EndDate(d) => parts.push(format!("UNTIL={}", d.format(UNTIL_FORMAT))),
        EndCondition::Never => {}
    }

    parts.join(";")
}

/// The pattern and bounds a recurrence actually steps by.
///
/// A `Custom` pattern is replaced by its decoded rule, and an end carried by the rule
/// applies only when `bounds` never end. `None` when the custom rule is missing, does
/// not decode, or decodes to something still outside the model (sub-daily rules).
pub fn concrete(pattern: &RecurrencePattern, bounds: &RecurrenceBounds) -> Option<(RecurrencePattern, RecurrenceBounds)> {
    if pattern.frequency != Frequency::Custom {
        return Some((pattern.clone(), bounds.clone()));
    }
    let decoded = parse_rule(pattern.custom_rule.as_deref()?).ok()?;
    if decoded.pattern.frequency == Frequency::Custom {
        return None;
    }
    let mut bounds = bounds.clone();
    if bounds.end_condition == EndCondition::Never {
        bounds.end_condition = decoded.end_condition.unwrap_or_default();
    }
    Some((decoded.pattern, bounds))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidRRule(format!("{key} must be a number, got '{value}'")))
}

fn parse_weekdays(value: &str) -> Result<Vec<u8>, CoreError> {
    value
        .split(',')
        .map(|code| {
            let code = code.trim().to_ascii_uppercase();
            // ordinal prefixes such as 2TU or -1FR keep only the weekday
            let weekday = code.trim_start_matches(|c: char| c.is_ascii_digit() || c == '+' || c == '-');
            WEEKDAY_CODES
                .iter()
                .position(|c| *c == weekday)
                .map(|i| i as u8)
                .ok_or_else(|| CoreError::InvalidRRule(format!("unknown BYDAY value '{code}'")))
        })
        .collect()
}

fn parse_until(value: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, UNTIL_FORMAT) {
        return Ok(dt.and_utc());
    }
    // a bare date covers the whole day
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| CoreError::InvalidRRule(format!("UNTIL must be YYYYMMDD or YYYYMMDDTHHMMSSZ, got '{value}'")))
}
