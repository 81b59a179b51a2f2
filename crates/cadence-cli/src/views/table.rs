use chrono::{DateTime, FixedOffset, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use cadence_core::models::{ConflictType, ExceptionKind, Occurrence};

#[derive(Debug, Clone)]
pub struct ViewOccurrence {
    pub event_id: String,
    pub occurrence: Occurrence,
    /// Kind of exception that altered the occurrence, if any
    pub exception: Option<ExceptionKind>,
}

#[derive(Debug, Clone)]
pub struct ViewConflict {
    pub title: String,
    pub start: DateTime<Utc>,
    pub counterpart: String,
    pub counterpart_start: DateTime<Utc>,
    pub conflict_type: ConflictType,
    pub details: String,
    pub suggestion: String,
}

pub fn format_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset);
    if offset.local_minus_utc() == 0 {
        local.format("%Y-%m-%d %H:%M UTC").to_string()
    } else {
        local.format("%Y-%m-%d %H:%M %:z").to_string()
    }
}

pub fn display_occurrences(occurrences: &[ViewOccurrence], offset: FixedOffset) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_header(vec!["#", "Event", "Title", "Start", "End", "When", "Status"]);

    for view in occurrences {
        let occurrence = &view.occurrence;
        let mut row = Row::new();
        row.add_cell(Cell::new(occurrence.sequence));
        row.add_cell(Cell::new(&view.event_id));

        let mut title_cell = Cell::new(occurrence.title());
        if occurrence.is_exception {
            title_cell = title_cell.fg(Color::Yellow);
        }
        row.add_cell(title_cell);

        row.add_cell(Cell::new(format_time(occurrence.actual_start, offset)));
        row.add_cell(Cell::new(format_time(occurrence.actual_end, offset)));

        let when = Cell::new(occurrence.actual_start.humanize());
        row.add_cell(if occurrence.actual_end < now {
            when.fg(Color::DarkGrey)
        } else {
            when
        });

        let status = match view.exception {
            Some(ExceptionKind::Move) => Cell::new(format!(
                "Moved from {}",
                format_time(occurrence.original_start, offset)
            ))
            .fg(Color::Blue),
            Some(ExceptionKind::Modify) => Cell::new("Modified").fg(Color::Yellow),
            Some(ExceptionKind::Delete) | None => Cell::new(""),
        };
        row.add_cell(status);
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_conflicts(conflicts: &[ViewConflict], offset: FixedOffset) {
    if conflicts.is_empty() {
        println!("No conflicts found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Event", "Start", "Conflicts With", "Their Start", "Type", "Details", "Suggestion"]);

    for conflict in conflicts {
        let mut row = Row::new();
        row.add_cell(Cell::new(&conflict.title));
        row.add_cell(Cell::new(format_time(conflict.start, offset)));
        row.add_cell(Cell::new(&conflict.counterpart));
        row.add_cell(Cell::new(format_time(conflict.counterpart_start, offset)));

        let kind = Cell::new(conflict.conflict_type.to_string());
        row.add_cell(match conflict.conflict_type {
            ConflictType::DoubleBooking => kind.fg(Color::Red).add_attribute(Attribute::Bold),
            ConflictType::ResourceConflict => kind.fg(Color::Magenta),
            ConflictType::Overlap => kind.fg(Color::Yellow),
        });

        row.add_cell(Cell::new(&conflict.details));
        row.add_cell(Cell::new(&conflict.suggestion));
        table.add_row(row);
    }

    println!("{table}");
}

/// Two-column key/value table used for single-event summaries.
pub fn display_properties(properties: &[(&str, String)]) {
    let mut table = Table::new();
    for (key, value) in properties {
        table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), Cell::new(value)]);
    }
    println!("{table}");
}
