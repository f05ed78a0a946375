use crate::clock::ClockTime;
use chrono::Weekday;
use thiserror::Error;

pub type TimetableResult<T> = Result<T, TimetableError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimetableError {
    #[error("no periods are defined for {day}")]
    UnknownDay { day: Weekday },

    #[error("invalid period range {from}..{to} on {day}")]
    InvalidPeriodRange { day: Weekday, from: u32, to: u32 },

    #[error("time range {start}-{end} on {day} does not align to any period boundary")]
    UnalignedTimeRange {
        day: Weekday,
        start: ClockTime,
        end: ClockTime,
    },

    #[error(
        "'{incoming}' overlaps '{existing}' on {day} at period {period_index}"
    )]
    ScheduleConflict {
        day: Weekday,
        period_index: u32,
        existing: String,
        incoming: String,
    },

    #[error("'{value}' on {day} period {period_index} is not an allowed subject")]
    UnrecognizedSubject {
        day: Weekday,
        period_index: u32,
        value: String,
    },

    /// Replace-all import removed the class entries but could not insert the
    /// new set. The class may now have zero entries.
    #[error(
        "import for class {class_id} deleted {deleted} entries but failed to insert the replacement set: {reason}"
    )]
    ImportPartialFailure {
        class_id: String,
        deleted: usize,
        reason: String,
    },

    #[error("invalid clock time '{0}'")]
    InvalidClockTime(String),

    #[error("invalid period calendar: {0}")]
    InvalidCalendar(String),

    #[error("invalid schedule entry: {0}")]
    InvalidEntry(String),

    #[error("entry {0} not found")]
    NotFound(String),
}

impl TimetableError {
    /// Errors the caller may correct and resubmit.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TimetableError::ImportPartialFailure { .. })
    }
}
