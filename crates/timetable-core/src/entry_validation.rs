use crate::calendar::PeriodCalendar;
use crate::entry::ScheduleEntry;
use crate::error::{TimetableError, TimetableResult};
use crate::resolver::TimeRangeResolver;
use crate::subject::SubjectCatalog;
use std::collections::HashSet;

/// Checks a single entry against the calendar and the subject catalog.
/// Returns the period indices it covers.
pub fn validate_entry(
    entry: &ScheduleEntry,
    calendar: &PeriodCalendar,
    catalog: &SubjectCatalog,
) -> TimetableResult<Vec<u32>> {
    if entry.class_id.trim().is_empty() {
        return Err(TimetableError::InvalidEntry(format!(
            "entry '{}' requires a non-empty class_id",
            entry.describe()
        )));
    }
    if entry.teacher_id.trim().is_empty() {
        return Err(TimetableError::InvalidEntry(format!(
            "entry '{}' requires a non-empty teacher_id",
            entry.describe()
        )));
    }
    let run = TimeRangeResolver::new(calendar).resolve_aligned(
        entry.day,
        entry.start_time,
        entry.end_time,
    )?;
    if !catalog.contains(&entry.subject) {
        return Err(TimetableError::UnrecognizedSubject {
            day: entry.day,
            period_index: run.first().copied().unwrap_or_default(),
            value: entry.subject.clone(),
        });
    }
    Ok(run)
}

/// First entry in `existing` that shares a class or a teacher with
/// `candidate` and overlaps it in time. Entries with the candidate's id are
/// ignored so an edit does not collide with its own previous version.
pub fn find_conflict(
    candidate: &ScheduleEntry,
    existing: &[ScheduleEntry],
    calendar: &PeriodCalendar,
) -> Option<TimetableError> {
    let resolver = TimeRangeResolver::new(calendar);
    existing
        .iter()
        .filter(|other| candidate.id.is_none() || other.id != candidate.id)
        .filter(|other| {
            other.class_id == candidate.class_id || other.teacher_id == candidate.teacher_id
        })
        .find(|other| candidate.overlaps(other))
        .map(|other| {
            let shared_start = other.start_time.max(candidate.start_time);
            let shared_end = other.end_time.min(candidate.end_time);
            let period_index = resolver
                .resolve(candidate.day, shared_start, shared_end)
                .ok()
                .and_then(|run| run.first().copied())
                .unwrap_or_default();
            TimetableError::ScheduleConflict {
                day: candidate.day,
                period_index,
                existing: other.describe(),
                incoming: candidate.describe(),
            }
        })
}

pub fn validate_entry_collection(
    entries: &[ScheduleEntry],
    calendar: &PeriodCalendar,
    catalog: &SubjectCatalog,
) -> TimetableResult<()> {
    let mut seen_ids = HashSet::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        if let Some(id) = &entry.id {
            if !seen_ids.insert(id.as_str()) {
                return Err(TimetableError::InvalidEntry(format!(
                    "duplicate entry id {id}"
                )));
            }
        }
        validate_entry(entry, calendar, catalog)?;
        if let Some(conflict) = find_conflict(entry, &entries[..idx], calendar) {
            return Err(conflict);
        }
    }
    Ok(())
}
