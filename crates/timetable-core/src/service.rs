use crate::calendar::PeriodCalendar;
use crate::codec::ScheduleRowCodec;
use crate::entry::{OwnerContext, ScheduleEntry};
use crate::entry_validation::{self, find_conflict, validate_entry};
use crate::error::TimetableError;
use crate::grid::{BuildOutcome, ConflictPolicy, Grid, GridBuilder, build_grids_by_class};
use crate::persistence::{
    EntryStore, MemoryEntryStore, PersistenceError, PersistenceResult, ReplaceSummary,
    TimetableSnapshot,
};
use crate::resolver::TimeRangeResolver;
use crate::sheet::{self, SheetHeader, SheetLayout};
use crate::subject::SubjectCatalog;
use chrono::Weekday;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a replace-all sheet import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub class_id: String,
    pub deleted: usize,
    pub inserted: usize,
    /// Cells left out of the import, as display strings.
    pub rejected: Vec<String>,
}

/// Calendar, subject catalog and entry store wired together. Every mutation
/// is validated against the calendar before it reaches the store.
///
/// Mutations hold `write_lock` from the conflict check through the store write,
/// so concurrent callers cannot both pass the check for the same slot.
pub struct TimetableService {
    calendar: PeriodCalendar,
    catalog: SubjectCatalog,
    store: Arc<dyn EntryStore>,
    write_lock: Mutex<()>,
}

impl Default for TimetableService {
    fn default() -> Self {
        Self::new(
            PeriodCalendar::default(),
            SubjectCatalog::default(),
            Arc::new(MemoryEntryStore::new()),
        )
    }
}

impl TimetableService {
    pub fn new(
        calendar: PeriodCalendar,
        catalog: SubjectCatalog,
        store: Arc<dyn EntryStore>,
    ) -> Self {
        Self {
            calendar,
            catalog,
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Validated snapshot loaded into a fresh memory store.
    pub fn from_snapshot(snapshot: TimetableSnapshot) -> PersistenceResult<Self> {
        let (calendar, catalog, entries) = snapshot.into_parts()?;
        let store = MemoryEntryStore::with_entries(entries);
        Ok(Self::new(calendar, catalog, Arc::new(store)))
    }

    pub fn snapshot(&self) -> PersistenceResult<TimetableSnapshot> {
        Ok(TimetableSnapshot::new(
            &self.calendar,
            &self.catalog,
            self.store.all_entries()?,
        ))
    }

    pub fn calendar(&self) -> &PeriodCalendar {
        &self.calendar
    }

    pub fn catalog(&self) -> &SubjectCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Swaps the calendar only if every stored entry still aligns to it.
    pub fn set_calendar(&mut self, calendar: PeriodCalendar) -> PersistenceResult<()> {
        let entries = self.store.all_entries()?;
        for entry in &entries {
            TimeRangeResolver::new(&calendar).resolve_aligned(
                entry.day,
                entry.start_time,
                entry.end_time,
            )?;
        }
        info!(days = calendar.days().len(), "period calendar replaced");
        self.calendar = calendar;
        Ok(())
    }

    pub fn entries_for_class(&self, class_id: &str) -> PersistenceResult<Vec<ScheduleEntry>> {
        self.store.entries_for_class(class_id)
    }

    pub fn entries_for_teacher(&self, teacher_id: &str) -> PersistenceResult<Vec<ScheduleEntry>> {
        Ok(self
            .store
            .all_entries()?
            .into_iter()
            .filter(|entry| entry.teacher_id == teacher_id)
            .collect())
    }

    pub fn find_entry(&self, id: &str) -> PersistenceResult<Option<ScheduleEntry>> {
        self.store.find_entry(id)
    }

    fn check_against_store(&self, entry: &ScheduleEntry) -> PersistenceResult<()> {
        validate_entry(entry, &self.calendar, &self.catalog)?;
        let existing = self.store.all_entries()?;
        if let Some(conflict) = find_conflict(entry, &existing, &self.calendar) {
            return Err(conflict.into());
        }
        Ok(())
    }

    pub fn add_entry(&self, mut entry: ScheduleEntry) -> PersistenceResult<ScheduleEntry> {
        if let Some(canonical) = self.catalog.canonicalize(&entry.subject) {
            entry.subject = canonical.to_string();
        }
        let _guard = self.write_lock.lock();
        if let Some(id) = entry.id.as_deref() {
            if self.store.find_entry(id)?.is_some() {
                return Err(PersistenceError::InvalidData(format!(
                    "entry {id} already exists"
                )));
            }
        }
        self.check_against_store(&entry)?;
        let stored = self
            .store
            .insert_entries(std::slice::from_ref(&entry))?
            .into_iter()
            .next()
            .ok_or_else(|| PersistenceError::InvalidData("store returned no entry".into()))?;
        info!(
            id = stored.id.as_deref().unwrap_or_default(),
            class_id = %stored.class_id,
            day = %stored.day,
            subject = %stored.subject,
            "schedule entry added"
        );
        Ok(stored)
    }

    /// Form-style creation from a "from period / to period" choice.
    pub fn add_entry_by_periods(
        &self,
        owner: &OwnerContext,
        day: Weekday,
        from_period: u32,
        to_period: u32,
        subject: &str,
    ) -> PersistenceResult<ScheduleEntry> {
        let (start, end) =
            TimeRangeResolver::new(&self.calendar).inverse(day, from_period, to_period)?;
        self.add_entry(ScheduleEntry::new(owner, day, start, end, subject))
    }

    /// Full replacement of an existing entry, matched by id.
    pub fn update_entry(&self, mut entry: ScheduleEntry) -> PersistenceResult<ScheduleEntry> {
        let Some(id) = entry.id.clone() else {
            return Err(TimetableError::InvalidEntry("update requires an entry id".into()).into());
        };
        let _guard = self.write_lock.lock();
        if self.store.find_entry(&id)?.is_none() {
            return Err(TimetableError::NotFound(id).into());
        }
        if let Some(canonical) = self.catalog.canonicalize(&entry.subject) {
            entry.subject = canonical.to_string();
        }
        self.check_against_store(&entry)?;
        if !self.store.update_entry(&entry)? {
            return Err(TimetableError::NotFound(id).into());
        }
        info!(%id, subject = %entry.subject, "schedule entry updated");
        Ok(entry)
    }

    pub fn delete_entry(&self, id: &str) -> PersistenceResult<bool> {
        let _guard = self.write_lock.lock();
        let removed = self.store.delete_entry(id)?;
        if removed {
            info!(%id, "schedule entry deleted");
        }
        Ok(removed)
    }

    fn grid_from(
        &self,
        entries: &[ScheduleEntry],
        policy: ConflictPolicy,
    ) -> PersistenceResult<BuildOutcome> {
        let outcome = GridBuilder::new(&self.calendar).build_with_policy(entries, policy)?;
        debug!(
            entries = entries.len(),
            dropped = outcome.dropped.len(),
            "grid built"
        );
        for dropped in &outcome.dropped {
            warn!(%dropped, "entry left out of grid");
        }
        Ok(outcome)
    }

    pub fn class_grid(
        &self,
        class_id: &str,
        policy: ConflictPolicy,
    ) -> PersistenceResult<BuildOutcome> {
        let entries = self.store.entries_for_class(class_id)?;
        self.grid_from(&entries, policy)
    }

    pub fn teacher_grid(
        &self,
        teacher_id: &str,
        policy: ConflictPolicy,
    ) -> PersistenceResult<BuildOutcome> {
        let entries = self.entries_for_teacher(teacher_id)?;
        self.grid_from(&entries, policy)
    }

    pub fn grids_by_class(&self) -> PersistenceResult<BTreeMap<String, Grid>> {
        let entries = self.store.all_entries()?;
        Ok(build_grids_by_class(&entries, &self.calendar)?)
    }

    pub fn export_class_sheet<W: io::Write>(
        &self,
        class_id: &str,
        header: &SheetHeader,
        writer: W,
    ) -> PersistenceResult<()> {
        let grid = self.class_grid(class_id, ConflictPolicy::Reject)?.grid;
        let rows = ScheduleRowCodec::new(&self.calendar).to_rows(&grid)?;
        sheet::write_sheet(writer, header, &rows, &self.calendar)?;
        info!(%class_id, rows = rows.len(), "class sheet exported");
        Ok(())
    }

    /// Parses a sheet and replaces every entry of `owner.class_id` with its
    /// contents. With `strict`, any rejected cell aborts before the store is
    /// touched; otherwise rejected cells are reported and skipped.
    pub fn import_class_sheet<R: io::Read>(
        &self,
        owner: &OwnerContext,
        reader: R,
        layout: SheetLayout,
        strict: bool,
    ) -> PersistenceResult<ImportReport> {
        let rows = sheet::read_sheet(reader, layout)?;
        let outcome = ScheduleRowCodec::new(&self.calendar).from_rows(&rows, &self.catalog, owner);
        for rejected in &outcome.rejected {
            warn!(class_id = %owner.class_id, %rejected, "sheet cell skipped");
        }
        let rejected: Vec<String> = outcome.rejected.iter().map(ToString::to_string).collect();
        let candidates = if strict {
            outcome.into_strict()?
        } else {
            outcome.entries
        };

        entry_validation::validate_entry_collection(&candidates, &self.calendar, &self.catalog)?;
        let _guard = self.write_lock.lock();
        let other_classes: Vec<ScheduleEntry> = self
            .store
            .all_entries()?
            .into_iter()
            .filter(|entry| entry.class_id != owner.class_id)
            .collect();
        for candidate in &candidates {
            if let Some(conflict) = find_conflict(candidate, &other_classes, &self.calendar) {
                return Err(conflict.into());
            }
        }

        let ReplaceSummary { deleted, inserted } = self
            .store
            .replace_all_entries_for_class(&owner.class_id, &candidates)?;
        info!(
            class_id = %owner.class_id,
            deleted,
            inserted,
            rejected = rejected.len(),
            "class sheet imported"
        );
        Ok(ImportReport {
            class_id: owner.class_id.clone(),
            deleted,
            inserted,
            rejected,
        })
    }
}
