//! Flat row view of a timetable: one row per period index, one column per
//! teaching day.
//!
//! Rows index periods by position, so Monday period 3 and Friday period 3 share
//! a row even when their clock times differ. The time label always comes from
//! the calendar's reference day.
//!
//! Import is single-period: a subject repeated over several rows comes back as
//! one entry per period, never as a merged multi-period entry.

use crate::calendar::PeriodCalendar;
use crate::entry::{OwnerContext, ScheduleEntry};
use crate::error::{TimetableError, TimetableResult};
use crate::grid::Grid;
use crate::resolver::TimeRangeResolver;
use crate::subject::SubjectCatalog;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRow {
    pub period_index: u32,
    pub time_label: String,
    /// One value per teaching day in calendar order; blank cells are `""`.
    pub by_day: Vec<(Weekday, String)>,
}

impl TabularRow {
    pub fn value(&self, day: Weekday) -> &str {
        self.by_day
            .iter()
            .find(|(cell_day, _)| *cell_day == day)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }
}

/// Candidate entries plus every cell that could not become one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub entries: Vec<ScheduleEntry>,
    pub rejected: Vec<TimetableError>,
}

impl ImportOutcome {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Fails on the first rejected cell.
    pub fn into_strict(self) -> TimetableResult<Vec<ScheduleEntry>> {
        match self.rejected.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.entries),
        }
    }
}

pub struct ScheduleRowCodec<'a> {
    calendar: &'a PeriodCalendar,
}

impl<'a> ScheduleRowCodec<'a> {
    pub fn new(calendar: &'a PeriodCalendar) -> Self {
        Self { calendar }
    }

    pub fn time_label(&self, period_index: u32) -> TimetableResult<String> {
        let period = self
            .calendar
            .period(self.calendar.reference_day(), period_index)?;
        Ok(format!(
            "{} - {}",
            period.start_time.dotted(),
            period.end_time.dotted()
        ))
    }

    pub fn to_rows(&self, grid: &Grid) -> TimetableResult<Vec<TabularRow>> {
        let reference = self.calendar.reference_day();
        let days = self.calendar.days();
        self.calendar
            .periods_for(reference)?
            .iter()
            .map(|period| -> TimetableResult<TabularRow> {
                let by_day = days
                    .iter()
                    .map(|&day| {
                        let value = grid
                            .label(day, period.period_index)
                            .map(str::to_string)
                            .unwrap_or_default();
                        (day, value)
                    })
                    .collect();
                Ok(TabularRow {
                    period_index: period.period_index,
                    time_label: self.time_label(period.period_index)?,
                    by_day,
                })
            })
            .collect()
    }

    pub fn from_rows(
        &self,
        rows: &[TabularRow],
        catalog: &SubjectCatalog,
        owner: &OwnerContext,
    ) -> ImportOutcome {
        let resolver = TimeRangeResolver::new(self.calendar);
        let mut outcome = ImportOutcome::default();
        for row in rows {
            for (day, raw) in &row.by_day {
                let day = *day;
                let value = raw.trim();
                if value.is_empty() {
                    continue;
                }
                let fixed = self.calendar.fixed_activity(day, row.period_index);
                if fixed.is_some_and(|label| label.eq_ignore_ascii_case(value)) {
                    continue;
                }
                let Some(subject) = catalog.canonicalize(value) else {
                    outcome.rejected.push(TimetableError::UnrecognizedSubject {
                        day,
                        period_index: row.period_index,
                        value: value.to_string(),
                    });
                    continue;
                };
                match resolver.inverse(day, row.period_index, row.period_index) {
                    Ok((start, end)) => outcome
                        .entries
                        .push(ScheduleEntry::new(owner, day, start, end, subject)),
                    Err(err) => outcome.rejected.push(err),
                }
            }
        }
        outcome
    }
}
