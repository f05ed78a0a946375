use chrono::Weekday;
use class_timetable::{
    ClockTime, EntryStore, MemoryEntryStore, OwnerContext, PeriodCalendar, PersistenceError,
    PersistenceResult, ReplaceSummary, ScheduleEntry, SubjectCatalog, TimetableError,
    TimetableSnapshot, load_entries_from_csv, load_timetable_from_json, save_entries_to_csv,
    save_timetable_to_json,
};
use tempfile::tempdir;

fn t(s: &str) -> ClockTime {
    s.parse().unwrap()
}

fn lesson(class_id: &str, day: Weekday, start: &str, end: &str, subject: &str) -> ScheduleEntry {
    ScheduleEntry::new(
        &OwnerContext::new(class_id, "guru-1"),
        day,
        t(start),
        t(end),
        subject,
    )
}

#[test]
fn json_snapshot_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timetable.json");
    let calendar = PeriodCalendar::default();
    let catalog = SubjectCatalog::default();
    let entries = vec![
        lesson("4A", Weekday::Mon, "07:35", "08:45", "Matematika").with_id("a"),
        lesson("4A", Weekday::Fri, "09:35", "10:10", "PJOK").with_id("b"),
    ];
    let snapshot = TimetableSnapshot::new(&calendar, &catalog, entries.clone());
    save_timetable_to_json(&snapshot, &path).unwrap();

    let loaded = load_timetable_from_json(&path).unwrap();
    assert_eq!(loaded, snapshot);
    let (loaded_calendar, loaded_catalog, loaded_entries) = loaded.into_parts().unwrap();
    assert_eq!(loaded_calendar, calendar);
    assert_eq!(loaded_catalog, catalog);
    assert_eq!(loaded_entries, entries);
}

#[test]
fn snapshot_without_calendar_uses_defaults() {
    let json = r#"{
        "entries": [
            {"day": "Tue", "start_time": "07:35", "end_time": "08:10",
             "subject": "IPAS", "class_id": "4A", "teacher_id": "guru-1"}
        ]
    }"#;
    let snapshot: TimetableSnapshot = serde_json::from_str(json).unwrap();
    let (calendar, catalog, entries) = snapshot.into_parts().unwrap();
    assert_eq!(calendar, PeriodCalendar::default());
    assert_eq!(catalog, SubjectCatalog::default());
    assert_eq!(entries.len(), 1);
    assert!(entries[0].id.is_none());
}

#[test]
fn snapshot_with_conflicting_entries_is_rejected() {
    let snapshot = TimetableSnapshot::new(
        &PeriodCalendar::default(),
        &SubjectCatalog::default(),
        vec![
            lesson("4A", Weekday::Mon, "07:35", "08:45", "Matematika"),
            lesson("4A", Weekday::Mon, "08:10", "08:45", "IPAS"),
        ],
    );
    assert!(matches!(
        snapshot.into_parts(),
        Err(PersistenceError::Timetable(
            TimetableError::ScheduleConflict { .. }
        ))
    ));
}

#[test]
fn csv_round_trip_preserves_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("entries.csv");
    let entries = vec![
        lesson("4A", Weekday::Wed, "10:10", "11:20", "Bahasa Indonesia").with_id("x1"),
        lesson("5B", Weekday::Thu, "07:00", "07:35", "Pendidikan Agama"),
    ];
    save_entries_to_csv(&entries, &path).unwrap();
    let loaded = load_entries_from_csv(&path).unwrap();
    assert_eq!(loaded, entries);
}

#[test]
fn memory_store_assigns_ids_and_replaces_class() {
    let store = MemoryEntryStore::new();
    let stored = store
        .insert_entries(&[
            lesson("4A", Weekday::Mon, "07:35", "08:10", "IPAS"),
            lesson("4A", Weekday::Tue, "07:35", "08:10", "IPAS"),
            lesson("4B", Weekday::Mon, "07:35", "08:10", "IPAS"),
        ])
        .unwrap();
    assert!(stored.iter().all(|entry| entry.id.is_some()));
    assert_eq!(store.len(), 3);

    let summary = store
        .replace_all_entries_for_class(
            "4A",
            &[lesson("4A", Weekday::Fri, "07:35", "08:10", "PJOK")],
        )
        .unwrap();
    assert_eq!(
        summary,
        ReplaceSummary {
            deleted: 2,
            inserted: 1
        }
    );
    let class_entries = store.entries_for_class("4A").unwrap();
    assert_eq!(class_entries.len(), 1);
    assert_eq!(class_entries[0].subject, "PJOK");
    assert_eq!(store.entries_for_class("4B").unwrap().len(), 1);
}

#[test]
fn replace_rejects_entries_of_another_class() {
    let store = MemoryEntryStore::with_entries(vec![lesson(
        "4A",
        Weekday::Mon,
        "07:35",
        "08:10",
        "IPAS",
    )]);
    let err = store
        .replace_all_entries_for_class("4A", &[lesson("4B", Weekday::Mon, "07:35", "08:10", "IPAS")])
        .unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
    assert_eq!(store.len(), 1);
}

#[test]
fn memory_store_update_and_delete() {
    let store = MemoryEntryStore::new();
    let stored = store
        .insert_entries(&[lesson("4A", Weekday::Mon, "07:35", "08:10", "IPAS")])
        .unwrap();
    let mut entry = stored[0].clone();
    let id = entry.id.clone().unwrap();

    entry.subject = "Matematika".into();
    assert!(store.update_entry(&entry).unwrap());
    assert_eq!(store.find_entry(&id).unwrap().unwrap().subject, "Matematika");

    assert!(matches!(
        store.insert_entries(&[entry.clone()]),
        Err(PersistenceError::InvalidData(_))
    ));

    assert!(store.delete_entry(&id).unwrap());
    assert!(!store.delete_entry(&id).unwrap());
    assert!(!store.update_entry(&entry).unwrap());
    assert!(store.is_empty());
}

/// Store whose inserts always fail after deletes went through.
struct FailingInsertStore {
    inner: MemoryEntryStore,
}

impl EntryStore for FailingInsertStore {
    fn all_entries(&self) -> PersistenceResult<Vec<ScheduleEntry>> {
        self.inner.all_entries()
    }

    fn entries_for_class(&self, class_id: &str) -> PersistenceResult<Vec<ScheduleEntry>> {
        self.inner.entries_for_class(class_id)
    }

    fn find_entry(&self, id: &str) -> PersistenceResult<Option<ScheduleEntry>> {
        self.inner.find_entry(id)
    }

    fn insert_entries(&self, _entries: &[ScheduleEntry]) -> PersistenceResult<Vec<ScheduleEntry>> {
        Err(PersistenceError::InvalidData("disk full".into()))
    }

    fn update_entry(&self, entry: &ScheduleEntry) -> PersistenceResult<bool> {
        self.inner.update_entry(entry)
    }

    fn delete_entry(&self, id: &str) -> PersistenceResult<bool> {
        self.inner.delete_entry(id)
    }

    fn delete_entries_for_class(&self, class_id: &str) -> PersistenceResult<usize> {
        self.inner.delete_entries_for_class(class_id)
    }
}

#[test]
fn failed_insert_after_delete_reports_partial_failure() {
    let store = FailingInsertStore {
        inner: MemoryEntryStore::with_entries(vec![
            lesson("4A", Weekday::Mon, "07:35", "08:10", "IPAS"),
            lesson("4A", Weekday::Tue, "07:35", "08:10", "IPAS"),
        ]),
    };
    let err = store
        .replace_all_entries_for_class("4A", &[lesson("4A", Weekday::Fri, "07:35", "08:10", "PJOK")])
        .unwrap_err();
    match err {
        PersistenceError::Timetable(TimetableError::ImportPartialFailure {
            class_id,
            deleted,
            reason,
        }) => {
            assert_eq!(class_id, "4A");
            assert_eq!(deleted, 2);
            assert!(reason.contains("disk full"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.entries_for_class("4A").unwrap().is_empty());
    assert!(
        !TimetableError::ImportPartialFailure {
            class_id: "4A".into(),
            deleted: 2,
            reason: String::new()
        }
        .is_recoverable()
    );
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use class_timetable::SqliteEntryStore;

    #[test]
    fn sqlite_store_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("timetable.db");
        let id = {
            let store = SqliteEntryStore::new(&path).unwrap();
            let stored = store
                .insert_entries(&[lesson("4A", Weekday::Mon, "07:35", "08:45", "Matematika")])
                .unwrap();
            stored[0].id.clone().unwrap()
        };

        let store = SqliteEntryStore::new(&path).unwrap();
        let entry = store.find_entry(&id).unwrap().unwrap();
        assert_eq!(entry.day, Weekday::Mon);
        assert_eq!(entry.start_time, t("07:35"));
        assert_eq!(entry.end_time, t("08:45"));
        assert_eq!(entry.subject, "Matematika");
        assert!(store.find_entry("missing").unwrap().is_none());
    }

    #[test]
    fn sqlite_update_delete_and_class_queries() {
        let store = SqliteEntryStore::in_memory().unwrap();
        let stored = store
            .insert_entries(&[
                lesson("4A", Weekday::Mon, "07:35", "08:10", "IPAS"),
                lesson("4B", Weekday::Mon, "07:35", "08:10", "IPAS"),
            ])
            .unwrap();
        let mut entry = stored[0].clone();
        entry.subject = "Seni Budaya".into();
        assert!(store.update_entry(&entry).unwrap());
        assert_eq!(store.entries_for_class("4A").unwrap(), vec![entry.clone()]);
        assert_eq!(store.all_entries().unwrap().len(), 2);

        assert!(store.delete_entry(entry.id.as_deref().unwrap()).unwrap());
        assert_eq!(store.delete_entries_for_class("4B").unwrap(), 1);
        assert!(store.all_entries().unwrap().is_empty());
    }

    #[test]
    fn sqlite_replace_rolls_back_on_insert_failure() {
        let store = SqliteEntryStore::in_memory().unwrap();
        store
            .insert_entries(&[
                lesson("4A", Weekday::Mon, "07:35", "08:10", "IPAS").with_id("keep-1"),
                lesson("4A", Weekday::Tue, "07:35", "08:10", "IPAS").with_id("keep-2"),
            ])
            .unwrap();

        // Duplicate primary keys in the replacement set abort the transaction.
        let replacement = vec![
            lesson("4A", Weekday::Fri, "07:35", "08:10", "PJOK").with_id("dup"),
            lesson("4A", Weekday::Fri, "08:10", "08:45", "PJOK").with_id("dup"),
        ];
        assert!(matches!(
            store.replace_all_entries_for_class("4A", &replacement),
            Err(PersistenceError::Sqlite(_))
        ));
        let remaining = store.entries_for_class("4A").unwrap();
        assert_eq!(remaining.len(), 2);

        let summary = store
            .replace_all_entries_for_class("4A", &replacement[..1])
            .unwrap();
        assert_eq!(
            summary,
            ReplaceSummary {
                deleted: 2,
                inserted: 1
            }
        );
    }
}
