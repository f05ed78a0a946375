use crate::entry::ScheduleEntry;
use crate::error::TimetableError;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no timetable stored")]
    NotFound,
    #[error(transparent)]
    Timetable(#[from] TimetableError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplaceSummary {
    pub deleted: usize,
    pub inserted: usize,
}

/// Storage for schedule entries. Implementations assign ids to entries
/// inserted without one.
pub trait EntryStore: Send + Sync {
    fn all_entries(&self) -> PersistenceResult<Vec<ScheduleEntry>>;
    fn entries_for_class(&self, class_id: &str) -> PersistenceResult<Vec<ScheduleEntry>>;
    fn find_entry(&self, id: &str) -> PersistenceResult<Option<ScheduleEntry>>;
    /// Returns the stored entries, ids filled in.
    fn insert_entries(&self, entries: &[ScheduleEntry]) -> PersistenceResult<Vec<ScheduleEntry>>;
    /// Replaces the entry with the same id. `false` when no such entry exists.
    fn update_entry(&self, entry: &ScheduleEntry) -> PersistenceResult<bool>;
    fn delete_entry(&self, id: &str) -> PersistenceResult<bool>;
    fn delete_entries_for_class(&self, class_id: &str) -> PersistenceResult<usize>;

    /// Deletes every entry of `class_id`, then inserts `entries`.
    ///
    /// The default runs the two steps separately. If the insert fails after
    /// the delete went through, the error is
    /// [`TimetableError::ImportPartialFailure`] and the class may be left
    /// with no entries.
    fn replace_all_entries_for_class(
        &self,
        class_id: &str,
        entries: &[ScheduleEntry],
    ) -> PersistenceResult<ReplaceSummary> {
        ensure_single_class(class_id, entries)?;
        let deleted = self.delete_entries_for_class(class_id)?;
        match self.insert_entries(entries) {
            Ok(inserted) => Ok(ReplaceSummary {
                deleted,
                inserted: inserted.len(),
            }),
            Err(err) => {
                tracing::error!(class_id, deleted, %err, "replace-all import left class without entries");
                Err(TimetableError::ImportPartialFailure {
                    class_id: class_id.to_string(),
                    deleted,
                    reason: err.to_string(),
                }
                .into())
            }
        }
    }
}

pub(crate) fn ensure_single_class(class_id: &str, entries: &[ScheduleEntry]) -> PersistenceResult<()> {
    if let Some(stray) = entries.iter().find(|entry| entry.class_id != class_id) {
        return Err(PersistenceError::InvalidData(format!(
            "entry '{}' belongs to class {} not {class_id}",
            stray.describe(),
            stray.class_id
        )));
    }
    Ok(())
}

pub(crate) fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    load_entries_from_csv, load_timetable_from_json, save_entries_to_csv, save_timetable_to_json,
    TimetableSnapshot,
};
pub use memory::MemoryEntryStore;
