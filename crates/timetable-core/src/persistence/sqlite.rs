use super::{
    EntryStore, PersistenceError, PersistenceResult, ReplaceSummary, ensure_single_class,
    new_entry_id,
};
use crate::clock::ClockTime;
use crate::entry::ScheduleEntry;
use chrono::Weekday;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

const SELECT_COLUMNS: &str =
    "SELECT id, day, start_time, end_time, subject, class_id, teacher_id FROM schedule_entries";

pub struct SqliteEntryStore {
    connection: Mutex<Connection>,
}

impl SqliteEntryStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS schedule_entries (
                id TEXT PRIMARY KEY,
                day TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                subject TEXT NOT NULL,
                class_id TEXT NOT NULL,
                teacher_id TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS schedule_entries_class
                ON schedule_entries (class_id);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn insert_in(
        tx: &Transaction,
        entries: &[ScheduleEntry],
    ) -> PersistenceResult<Vec<ScheduleEntry>> {
        let mut stmt = tx.prepare(
            "INSERT INTO schedule_entries (id, day, start_time, end_time, subject, class_id, teacher_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut entry = entry.clone();
            let id = entry.id.get_or_insert_with(new_entry_id).clone();
            stmt.execute(params![
                id,
                entry.day.to_string(),
                entry.start_time.to_string(),
                entry.end_time.to_string(),
                entry.subject,
                entry.class_id,
                entry.teacher_id,
            ])?;
            stored.push(entry);
        }
        Ok(stored)
    }

    fn query(
        &self,
        sql: &str,
        param: Option<&str>,
    ) -> PersistenceResult<Vec<ScheduleEntry>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(sql)?;
        let raw = match param {
            Some(value) => stmt
                .query_map(params![value], RawEntry::from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], RawEntry::from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        raw.into_iter().map(RawEntry::into_entry).collect()
    }
}

/// Row as stored; day and times are parsed after the query.
struct RawEntry {
    id: String,
    day: String,
    start_time: String,
    end_time: String,
    subject: String,
    class_id: String,
    teacher_id: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            day: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            subject: row.get(4)?,
            class_id: row.get(5)?,
            teacher_id: row.get(6)?,
        })
    }

    fn into_entry(self) -> PersistenceResult<ScheduleEntry> {
        let day = self.day.parse::<Weekday>().map_err(|_| {
            PersistenceError::InvalidData(format!("entry {} has invalid day '{}'", self.id, self.day))
        })?;
        Ok(ScheduleEntry {
            id: Some(self.id),
            day,
            start_time: self.start_time.parse::<ClockTime>()?,
            end_time: self.end_time.parse::<ClockTime>()?,
            subject: self.subject,
            class_id: self.class_id,
            teacher_id: self.teacher_id,
        })
    }
}

impl EntryStore for SqliteEntryStore {
    fn all_entries(&self) -> PersistenceResult<Vec<ScheduleEntry>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY rowid ASC"), None)
    }

    fn entries_for_class(&self, class_id: &str) -> PersistenceResult<Vec<ScheduleEntry>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE class_id = ?1 ORDER BY rowid ASC"),
            Some(class_id),
        )
    }

    fn find_entry(&self, id: &str) -> PersistenceResult<Option<ScheduleEntry>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        let raw = stmt
            .query_row(params![id], RawEntry::from_row)
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    fn insert_entries(&self, entries: &[ScheduleEntry]) -> PersistenceResult<Vec<ScheduleEntry>> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let stored = Self::insert_in(&tx, entries)?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_entry(&self, entry: &ScheduleEntry) -> PersistenceResult<bool> {
        let Some(id) = entry.id.as_deref() else {
            return Ok(false);
        };
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE schedule_entries
             SET day = ?2, start_time = ?3, end_time = ?4, subject = ?5, class_id = ?6, teacher_id = ?7
             WHERE id = ?1",
            params![
                id,
                entry.day.to_string(),
                entry.start_time.to_string(),
                entry.end_time.to_string(),
                entry.subject,
                entry.class_id,
                entry.teacher_id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_entry(&self, id: &str) -> PersistenceResult<bool> {
        let conn = self.connection.lock();
        let changed = conn.execute("DELETE FROM schedule_entries WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn delete_entries_for_class(&self, class_id: &str) -> PersistenceResult<usize> {
        let conn = self.connection.lock();
        let changed = conn.execute(
            "DELETE FROM schedule_entries WHERE class_id = ?1",
            params![class_id],
        )?;
        Ok(changed)
    }

    /// Delete and insert share one transaction; any failure rolls both back.
    fn replace_all_entries_for_class(
        &self,
        class_id: &str,
        entries: &[ScheduleEntry],
    ) -> PersistenceResult<ReplaceSummary> {
        ensure_single_class(class_id, entries)?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM schedule_entries WHERE class_id = ?1",
            params![class_id],
        )?;
        let inserted = Self::insert_in(&tx, entries)?.len();
        tx.commit()?;
        Ok(ReplaceSummary { deleted, inserted })
    }
}
