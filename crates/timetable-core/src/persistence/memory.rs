use super::{EntryStore, PersistenceError, PersistenceResult, new_entry_id};
use crate::entry::ScheduleEntry;
use parking_lot::RwLock;

/// Process-local store, insertion ordered.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: RwLock<Vec<ScheduleEntry>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store as-is; entries without an id get one.
    pub fn with_entries(entries: Vec<ScheduleEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                if entry.id.is_none() {
                    entry.id = Some(new_entry_id());
                }
                entry
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl EntryStore for MemoryEntryStore {
    fn all_entries(&self) -> PersistenceResult<Vec<ScheduleEntry>> {
        Ok(self.entries.read().clone())
    }

    fn entries_for_class(&self, class_id: &str) -> PersistenceResult<Vec<ScheduleEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|entry| entry.class_id == class_id)
            .cloned()
            .collect())
    }

    fn find_entry(&self, id: &str) -> PersistenceResult<Option<ScheduleEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|entry| entry.id.as_deref() == Some(id))
            .cloned())
    }

    fn insert_entries(&self, entries: &[ScheduleEntry]) -> PersistenceResult<Vec<ScheduleEntry>> {
        let mut guard = self.entries.write();
        if let Some(id) = entries
            .iter()
            .filter_map(|entry| entry.id.as_deref())
            .find(|id| guard.iter().any(|existing| existing.id.as_deref() == Some(*id)))
        {
            return Err(PersistenceError::InvalidData(format!(
                "entry id {id} already exists"
            )));
        }
        let stored: Vec<ScheduleEntry> = entries
            .iter()
            .cloned()
            .map(|mut entry| {
                if entry.id.is_none() {
                    entry.id = Some(new_entry_id());
                }
                entry
            })
            .collect();
        guard.extend(stored.iter().cloned());
        Ok(stored)
    }

    fn update_entry(&self, entry: &ScheduleEntry) -> PersistenceResult<bool> {
        let mut guard = self.entries.write();
        match guard
            .iter_mut()
            .find(|existing| existing.id.is_some() && existing.id == entry.id)
        {
            Some(existing) => {
                *existing = entry.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_entry(&self, id: &str) -> PersistenceResult<bool> {
        let mut guard = self.entries.write();
        let before = guard.len();
        guard.retain(|entry| entry.id.as_deref() != Some(id));
        Ok(guard.len() != before)
    }

    fn delete_entries_for_class(&self, class_id: &str) -> PersistenceResult<usize> {
        let mut guard = self.entries.write();
        let before = guard.len();
        guard.retain(|entry| entry.class_id != class_id);
        Ok(before - guard.len())
    }
}
