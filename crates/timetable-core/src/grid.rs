use crate::calendar::PeriodCalendar;
use crate::entry::ScheduleEntry;
use crate::error::{TimetableError, TimetableResult};
use crate::resolver::TimeRangeResolver;
use chrono::Weekday;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellContent {
    Empty,
    FixedActivity { label: String },
    /// First period of an entry's run; `span` is the run length.
    Head { entry: ScheduleEntry, span: u32 },
    /// Later period of a run whose head sits at `head_period`.
    Continuation { head_period: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub day: Weekday,
    pub period_index: u32,
    pub content: CellContent,
}

impl GridCell {
    pub fn span(&self) -> u32 {
        match &self.content {
            CellContent::Head { span, .. } => *span,
            _ => 1,
        }
    }

    pub fn is_continuation(&self) -> bool {
        matches!(self.content, CellContent::Continuation { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    /// Entry anchored here; `None` for continuation cells.
    pub fn entry(&self) -> Option<&ScheduleEntry> {
        match &self.content {
            CellContent::Head { entry, .. } => Some(entry),
            _ => None,
        }
    }

    pub fn fixed_activity(&self) -> Option<&str> {
        match &self.content {
            CellContent::FixedActivity { label } => Some(label),
            _ => None,
        }
    }

    /// Text shown in the cell: the subject of a head or the fixed activity
    /// label. Continuations and empty slots have none.
    pub fn label(&self) -> Option<&str> {
        match &self.content {
            CellContent::Head { entry, .. } => Some(&entry.subject),
            CellContent::FixedActivity { label } => Some(label),
            _ => None,
        }
    }

    /// Only head cells are edit/delete targets.
    pub fn is_interactive(&self) -> bool {
        self.entry().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridDay {
    pub day: Weekday,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    days: Vec<GridDay>,
}

impl Grid {
    pub fn days(&self) -> &[GridDay] {
        &self.days
    }

    pub fn cell(&self, day: Weekday, period_index: u32) -> Option<&GridCell> {
        self.days
            .iter()
            .find(|grid_day| grid_day.day == day)
            .and_then(|grid_day| {
                grid_day
                    .cells
                    .iter()
                    .find(|cell| cell.period_index == period_index)
            })
    }

    /// Entry occupying the slot, following continuations back to their head.
    pub fn covering_entry(&self, day: Weekday, period_index: u32) -> Option<&ScheduleEntry> {
        let cell = self.cell(day, period_index)?;
        match &cell.content {
            CellContent::Head { entry, .. } => Some(entry),
            CellContent::Continuation { head_period } => {
                self.cell(day, *head_period).and_then(GridCell::entry)
            }
            _ => None,
        }
    }

    /// Like [`GridCell::label`], but continuation slots carry the subject of
    /// the entry covering them.
    pub fn label(&self, day: Weekday, period_index: u32) -> Option<&str> {
        match self.covering_entry(day, period_index) {
            Some(entry) => Some(&entry.subject),
            None => self.cell(day, period_index).and_then(GridCell::label),
        }
    }

    pub fn heads(&self) -> impl Iterator<Item = &GridCell> {
        self.days
            .iter()
            .flat_map(|grid_day| grid_day.cells.iter())
            .filter(|cell| cell.entry().is_some())
    }

    fn slot_mut(&mut self, day: Weekday, period_index: u32) -> Option<&mut GridCell> {
        self.days
            .iter_mut()
            .find(|grid_day| grid_day.day == day)
            .and_then(|grid_day| {
                grid_day
                    .cells
                    .iter_mut()
                    .find(|cell| cell.period_index == period_index)
            })
    }
}

/// What to do when an entry cannot be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Stop at the first unplaceable entry.
    #[default]
    Reject,
    /// Earlier entries keep their slots; later ones are left out of the grid
    /// and reported in [`BuildOutcome::dropped`].
    FirstWins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub grid: Grid,
    pub dropped: Vec<TimetableError>,
}

pub struct GridBuilder<'a> {
    calendar: &'a PeriodCalendar,
    resolver: TimeRangeResolver<'a>,
}

impl<'a> GridBuilder<'a> {
    pub fn new(calendar: &'a PeriodCalendar) -> Self {
        Self {
            calendar,
            resolver: TimeRangeResolver::new(calendar),
        }
    }

    pub fn build(&self, entries: &[ScheduleEntry]) -> TimetableResult<Grid> {
        let mut grid = self.empty_grid();
        for entry in entries {
            self.place(&mut grid, entry)?;
        }
        Ok(grid)
    }

    pub fn build_with_policy(
        &self,
        entries: &[ScheduleEntry],
        policy: ConflictPolicy,
    ) -> TimetableResult<BuildOutcome> {
        match policy {
            ConflictPolicy::Reject => Ok(BuildOutcome {
                grid: self.build(entries)?,
                dropped: Vec::new(),
            }),
            ConflictPolicy::FirstWins => {
                let mut grid = self.empty_grid();
                let mut dropped = Vec::new();
                for entry in entries {
                    if let Err(err) = self.place(&mut grid, entry) {
                        dropped.push(err);
                    }
                }
                Ok(BuildOutcome { grid, dropped })
            }
        }
    }

    /// Every calendar slot, with fixed activities pre-filled.
    fn empty_grid(&self) -> Grid {
        let days = self
            .calendar
            .days()
            .into_iter()
            .map(|day| {
                let cells = self
                    .calendar
                    .periods_for(day)
                    .unwrap_or_default()
                    .iter()
                    .map(|period| GridCell {
                        day,
                        period_index: period.period_index,
                        content: match &period.fixed_activity {
                            Some(label) => CellContent::FixedActivity {
                                label: label.clone(),
                            },
                            None => CellContent::Empty,
                        },
                    })
                    .collect();
                GridDay { day, cells }
            })
            .collect();
        Grid { days }
    }

    /// Leaves the grid untouched when it returns an error.
    fn place(&self, grid: &mut Grid, entry: &ScheduleEntry) -> TimetableResult<()> {
        let run = self
            .resolver
            .resolve_aligned(entry.day, entry.start_time, entry.end_time)?;
        for &period_index in &run {
            let occupant = match grid.cell(entry.day, period_index).map(|cell| &cell.content) {
                Some(CellContent::Head { entry: existing, .. }) => Some(existing),
                Some(CellContent::Continuation { head_period }) => {
                    grid.cell(entry.day, *head_period).and_then(GridCell::entry)
                }
                _ => None,
            };
            if let Some(existing) = occupant {
                return Err(TimetableError::ScheduleConflict {
                    day: entry.day,
                    period_index,
                    existing: existing.describe(),
                    incoming: entry.describe(),
                });
            }
        }

        let (head_period, rest) = match run.split_first() {
            Some((head, rest)) => (*head, rest),
            None => {
                return Err(TimetableError::UnalignedTimeRange {
                    day: entry.day,
                    start: entry.start_time,
                    end: entry.end_time,
                });
            }
        };
        if let Some(cell) = grid.slot_mut(entry.day, head_period) {
            cell.content = CellContent::Head {
                entry: entry.clone(),
                span: run.len() as u32,
            };
        }
        for &period_index in rest {
            if let Some(cell) = grid.slot_mut(entry.day, period_index) {
                cell.content = CellContent::Continuation { head_period };
            }
        }
        Ok(())
    }
}

/// One grid per class, built in parallel. Entry order within a class is
/// preserved, so conflict resolution matches a sequential build.
pub fn build_grids_by_class(
    entries: &[ScheduleEntry],
    calendar: &PeriodCalendar,
) -> TimetableResult<BTreeMap<String, Grid>> {
    let mut by_class: BTreeMap<String, Vec<ScheduleEntry>> = BTreeMap::new();
    for entry in entries {
        by_class
            .entry(entry.class_id.clone())
            .or_default()
            .push(entry.clone());
    }
    by_class
        .into_par_iter()
        .map(|(class_id, class_entries)| {
            GridBuilder::new(calendar)
                .build(&class_entries)
                .map(|grid| (class_id, grid))
        })
        .collect()
}
