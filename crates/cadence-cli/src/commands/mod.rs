pub mod analyze;
pub mod conflicts;
pub mod edit;
pub mod exceptions;
pub mod expand;
pub mod navigate;
pub mod rrule;
pub mod validate;

use anyhow::Result;
use cadence_core::calendar::WorkingDays;
use cadence_core::config::EngineConfig;
use cadence_core::models::CalendarEvent;
use cadence_core::recurrence::RecurrenceManager;

use crate::calendar_file::CalendarFile;

/// Builds a manager for one recurring event with the given limits and skip policy.
pub(crate) fn manager_for(
    calendar: &CalendarFile,
    event: &CalendarEvent,
    engine: &EngineConfig,
    working_days: &WorkingDays,
) -> Result<RecurrenceManager> {
    let manager =
        RecurrenceManager::new(event.clone(), calendar.exceptions_for(event.id))?.with_config(engine.clone());
    Ok(if working_days.is_active() {
        manager.with_skip_policy(working_days.clone())
    } else {
        manager
    })
}
