use crate::calendar::PeriodCalendar;
use crate::clock::ClockTime;
use crate::error::{TimetableError, TimetableResult};
use chrono::Weekday;

/// Maps time ranges to the calendar's period indices and back.
#[derive(Debug, Clone, Copy)]
pub struct TimeRangeResolver<'a> {
    calendar: &'a PeriodCalendar,
}

impl<'a> TimeRangeResolver<'a> {
    pub fn new(calendar: &'a PeriodCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &'a PeriodCalendar {
        self.calendar
    }

    /// Indices of every period of `day` fully contained in `start..end`, in
    /// period order. Empty when none qualifies.
    pub fn resolve(
        &self,
        day: Weekday,
        start: ClockTime,
        end: ClockTime,
    ) -> TimetableResult<Vec<u32>> {
        let target_start = start.minutes();
        let target_end = end.minutes();
        let periods = self.calendar.periods_for(day)?;
        Ok(periods
            .iter()
            .filter(|period| {
                let (period_start, period_end) = period.boundary_minutes();
                period_start >= target_start && period_end <= target_end
            })
            .map(|period| period.period_index)
            .collect())
    }

    /// Like [`resolve`](Self::resolve) but both bounds must coincide with the
    /// covered run's outer boundaries.
    pub fn resolve_aligned(
        &self,
        day: Weekday,
        start: ClockTime,
        end: ClockTime,
    ) -> TimetableResult<Vec<u32>> {
        let unaligned = TimetableError::UnalignedTimeRange { day, start, end };
        if start >= end {
            return Err(unaligned);
        }
        let indices = self.resolve(day, start, end)?;
        let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
            return Err(unaligned);
        };
        let first_start = self.calendar.period(day, first)?.start_time;
        let last_end = self.calendar.period(day, last)?.end_time;
        if first_start != start || last_end != end {
            return Err(unaligned);
        }
        Ok(indices)
    }

    /// Start of period `from` and end of period `to`, inclusive.
    pub fn inverse(
        &self,
        day: Weekday,
        from: u32,
        to: u32,
    ) -> TimetableResult<(ClockTime, ClockTime)> {
        let invalid = TimetableError::InvalidPeriodRange { day, from, to };
        if to < from {
            return Err(invalid);
        }
        let periods = self.calendar.periods_for(day)?;
        let first = periods.iter().find(|period| period.period_index == from);
        let last = periods.iter().find(|period| period.period_index == to);
        match (first, last) {
            (Some(first), Some(last)) => Ok((first.start_time, last.end_time)),
            _ => Err(invalid),
        }
    }
}
