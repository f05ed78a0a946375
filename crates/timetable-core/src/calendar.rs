use crate::clock::ClockTime;
use crate::error::{TimetableError, TimetableResult};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One teaching period of one weekday. `period_index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDefinition {
    pub day: Weekday,
    pub period_index: u32,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_activity: Option<String>,
}

impl PeriodDefinition {
    pub fn boundary_minutes(&self) -> (u16, u16) {
        (self.start_time.minutes(), self.end_time.minutes())
    }
}

/// A break that follows `after_period` on the reference day. Only the sheet
/// layout uses it; recesses are never schedulable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecessDefinition {
    pub after_period: u32,
    pub label: String,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DaySchedule {
    day: Weekday,
    periods: Vec<PeriodDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCalendar {
    days: Vec<DaySchedule>,
    recesses: Vec<RecessDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSlotConfig {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_activity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPeriodsConfig {
    pub day: Weekday,
    pub periods: Vec<PeriodSlotConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCalendarConfig {
    days: Vec<DayPeriodsConfig>,
    #[serde(default)]
    recesses: Vec<RecessDefinition>,
}

const PERIOD_MINUTES: u16 = 35;
const SCHOOL_DAY_START: u16 = 7 * 60;
const RECESS_AFTER_PERIOD: u32 = 4;
const RECESS_MINUTES: u16 = 15;

impl Default for PeriodCalendar {
    fn default() -> Self {
        let days = [
            (Weekday::Mon, 8, "UPACARA"),
            (Weekday::Tue, 8, "LITERASI"),
            (Weekday::Wed, 8, "LITERASI"),
            (Weekday::Thu, 8, "LITERASI"),
            (Weekday::Fri, 6, "SENAM"),
        ]
        .into_iter()
        .map(|(day, count, opening)| Self::standard_day(day, count, opening))
        .collect();

        let recess_start = SCHOOL_DAY_START + PERIOD_MINUTES * RECESS_AFTER_PERIOD as u16;
        Self {
            days,
            recesses: vec![RecessDefinition {
                after_period: RECESS_AFTER_PERIOD,
                label: "ISTIRAHAT".to_string(),
                start_time: ClockTime::from_minutes_unchecked(recess_start),
                end_time: ClockTime::from_minutes_unchecked(recess_start + RECESS_MINUTES),
            }],
        }
    }
}

impl PeriodCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Back-to-back 35 minute periods from 07:00 with the recess gap after
    /// period 4; period 1 is the opening activity.
    fn standard_day(day: Weekday, count: u32, opening: &str) -> DaySchedule {
        let mut start = SCHOOL_DAY_START;
        let mut periods = Vec::with_capacity(count as usize);
        for period_index in 1..=count {
            let end = start + PERIOD_MINUTES;
            periods.push(PeriodDefinition {
                day,
                period_index,
                start_time: ClockTime::from_minutes_unchecked(start),
                end_time: ClockTime::from_minutes_unchecked(end),
                fixed_activity: (period_index == 1).then(|| opening.to_string()),
            });
            start = if period_index == RECESS_AFTER_PERIOD {
                end + RECESS_MINUTES
            } else {
                end
            };
        }
        DaySchedule { day, periods }
    }

    pub fn from_config(config: &PeriodCalendarConfig) -> TimetableResult<Self> {
        if config.days.is_empty() {
            return Err(TimetableError::InvalidCalendar(
                "at least one teaching day is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        let mut days = Vec::with_capacity(config.days.len());
        for day_config in &config.days {
            let day = day_config.day;
            if !seen.insert(day) {
                return Err(TimetableError::InvalidCalendar(format!(
                    "{day} is defined more than once"
                )));
            }
            if day_config.periods.is_empty() {
                return Err(TimetableError::InvalidCalendar(format!(
                    "{day} has no periods"
                )));
            }
            let mut periods: Vec<PeriodDefinition> = Vec::with_capacity(day_config.periods.len());
            for (idx, slot) in day_config.periods.iter().enumerate() {
                let period_index = idx as u32 + 1;
                if slot.start_time >= slot.end_time {
                    return Err(TimetableError::InvalidCalendar(format!(
                        "{day} period {period_index} starts at {} but ends at {}",
                        slot.start_time, slot.end_time
                    )));
                }
                if let Some(previous) = periods.last() {
                    if slot.start_time < previous.end_time {
                        return Err(TimetableError::InvalidCalendar(format!(
                            "{day} period {period_index} overlaps period {}",
                            previous.period_index
                        )));
                    }
                }
                let fixed_activity = slot
                    .fixed_activity
                    .as_ref()
                    .map(|label| label.trim().to_string())
                    .filter(|label| !label.is_empty());
                periods.push(PeriodDefinition {
                    day,
                    period_index,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    fixed_activity,
                });
            }
            days.push(DaySchedule { day, periods });
        }
        days.sort_by_key(|schedule| schedule.day.num_days_from_monday());

        let calendar = Self {
            days,
            recesses: config.recesses.clone(),
        };
        let reference = calendar.reference_day();
        let count = calendar.period_count(reference);
        for recess in &calendar.recesses {
            if recess.after_period == 0 || recess.after_period > count {
                return Err(TimetableError::InvalidCalendar(format!(
                    "recess '{}' follows period {} which {reference} does not have",
                    recess.label, recess.after_period
                )));
            }
            if recess.start_time >= recess.end_time {
                return Err(TimetableError::InvalidCalendar(format!(
                    "recess '{}' starts at {} but ends at {}",
                    recess.label, recess.start_time, recess.end_time
                )));
            }
            let before = calendar.period(reference, recess.after_period)?;
            if recess.start_time < before.end_time {
                return Err(TimetableError::InvalidCalendar(format!(
                    "recess '{}' starts before period {} ends at {}",
                    recess.label, before.period_index, before.end_time
                )));
            }
            if let Ok(after) = calendar.period(reference, recess.after_period + 1) {
                if recess.end_time > after.start_time {
                    return Err(TimetableError::InvalidCalendar(format!(
                        "recess '{}' runs past the start of period {} at {}",
                        recess.label, after.period_index, after.start_time
                    )));
                }
            }
        }
        Ok(calendar)
    }

    pub fn to_config(&self) -> PeriodCalendarConfig {
        PeriodCalendarConfig::from(self)
    }

    /// Teaching days in weekday order.
    pub fn days(&self) -> Vec<Weekday> {
        self.days.iter().map(|schedule| schedule.day).collect()
    }

    pub fn contains_day(&self, day: Weekday) -> bool {
        self.days.iter().any(|schedule| schedule.day == day)
    }

    pub fn periods_for(&self, day: Weekday) -> TimetableResult<&[PeriodDefinition]> {
        self.days
            .iter()
            .find(|schedule| schedule.day == day)
            .map(|schedule| schedule.periods.as_slice())
            .ok_or(TimetableError::UnknownDay { day })
    }

    pub fn period(&self, day: Weekday, period_index: u32) -> TimetableResult<&PeriodDefinition> {
        self.periods_for(day)?
            .iter()
            .find(|period| period.period_index == period_index)
            .ok_or(TimetableError::InvalidPeriodRange {
                day,
                from: period_index,
                to: period_index,
            })
    }

    pub fn boundary_minutes(&self, day: Weekday, period_index: u32) -> TimetableResult<(u16, u16)> {
        self.period(day, period_index)
            .map(PeriodDefinition::boundary_minutes)
    }

    pub fn fixed_activity(&self, day: Weekday, period_index: u32) -> Option<&str> {
        self.period(day, period_index)
            .ok()
            .and_then(|period| period.fixed_activity.as_deref())
    }

    pub fn period_count(&self, day: Weekday) -> u32 {
        self.periods_for(day)
            .map(|periods| periods.len() as u32)
            .unwrap_or(0)
    }

    /// Day whose periods index the exported rows: the longest day, earliest
    /// weekday on ties.
    pub fn reference_day(&self) -> Weekday {
        let mut best: Option<&DaySchedule> = None;
        for schedule in &self.days {
            match best {
                Some(current) if current.periods.len() >= schedule.periods.len() => {}
                _ => best = Some(schedule),
            }
        }
        best.map(|schedule| schedule.day).unwrap_or(Weekday::Mon)
    }

    pub fn recesses(&self) -> &[RecessDefinition] {
        &self.recesses
    }

    pub fn recess_after(&self, period_index: u32) -> Option<&RecessDefinition> {
        self.recesses
            .iter()
            .find(|recess| recess.after_period == period_index)
    }

    pub fn non_teaching_days(&self) -> Vec<Weekday> {
        Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !self.contains_day(*day))
            .collect()
    }
}

impl PeriodCalendarConfig {
    pub fn new(days: Vec<DayPeriodsConfig>, recesses: Vec<RecessDefinition>) -> Self {
        Self { days, recesses }
    }

    pub fn days(&self) -> &[DayPeriodsConfig] {
        &self.days
    }

    pub fn recesses(&self) -> &[RecessDefinition] {
        &self.recesses
    }
}

impl Default for PeriodCalendarConfig {
    fn default() -> Self {
        PeriodCalendarConfig::from(&PeriodCalendar::default())
    }
}

impl From<&PeriodCalendar> for PeriodCalendarConfig {
    fn from(calendar: &PeriodCalendar) -> Self {
        let days = calendar
            .days
            .iter()
            .map(|schedule| DayPeriodsConfig {
                day: schedule.day,
                periods: schedule
                    .periods
                    .iter()
                    .map(|period| PeriodSlotConfig {
                        start_time: period.start_time,
                        end_time: period.end_time,
                        fixed_activity: period.fixed_activity.clone(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            days,
            recesses: calendar.recesses.clone(),
        }
    }
}
