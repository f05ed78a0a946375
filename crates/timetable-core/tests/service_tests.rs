use chrono::Weekday;
use class_timetable::{
    ClockTime, ConflictPolicy, DayPeriodsConfig, EntryStore, MemoryEntryStore, OwnerContext,
    PeriodCalendar, PeriodCalendarConfig, PeriodSlotConfig, PersistenceError, PersistenceResult,
    ScheduleEntry, SheetHeader, SheetLayout, SubjectCatalog, TimetableError, TimetableService,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn t(s: &str) -> ClockTime {
    s.parse().unwrap()
}

fn owner(class_id: &str, teacher_id: &str) -> OwnerContext {
    OwnerContext::new(class_id, teacher_id)
}

fn header() -> SheetHeader {
    SheetHeader {
        school_name: "SD Negeri 1".into(),
        title: "Jadwal Pelajaran".into(),
        owner_label: "Kelas 4A".into(),
    }
}

fn sheet(body: &str) -> String {
    format!("SD Negeri 1\nJadwal Pelajaran\nKelas 4A\nPeriod,Time,Monday,Tuesday\n{body}")
}

#[test]
fn add_entry_canonicalizes_subject_and_assigns_id() {
    let service = TimetableService::default();
    let entry = ScheduleEntry::new(
        &owner("4A", "guru-1"),
        Weekday::Mon,
        t("07:35"),
        t("08:45"),
        "matematika",
    );
    let stored = service.add_entry(entry).unwrap();
    assert_eq!(stored.subject, "Matematika");
    let id = stored.id.clone().unwrap();
    assert_eq!(service.find_entry(&id).unwrap(), Some(stored));
}

#[test]
fn add_entry_rejects_misaligned_unknown_and_blank_owner() {
    let service = TimetableService::default();
    let misaligned = ScheduleEntry::new(
        &owner("4A", "guru-1"),
        Weekday::Mon,
        t("07:10"),
        t("07:45"),
        "IPAS",
    );
    assert!(matches!(
        service.add_entry(misaligned),
        Err(PersistenceError::Timetable(
            TimetableError::UnalignedTimeRange { .. }
        ))
    ));

    let unknown = ScheduleEntry::new(
        &owner("4A", "guru-1"),
        Weekday::Mon,
        t("07:35"),
        t("08:10"),
        "Kimia",
    );
    assert!(matches!(
        service.add_entry(unknown),
        Err(PersistenceError::Timetable(
            TimetableError::UnrecognizedSubject { period_index: 2, .. }
        ))
    ));

    let no_teacher = ScheduleEntry::new(
        &owner("4A", " "),
        Weekday::Mon,
        t("07:35"),
        t("08:10"),
        "IPAS",
    );
    assert!(matches!(
        service.add_entry(no_teacher),
        Err(PersistenceError::Timetable(TimetableError::InvalidEntry(_)))
    ));
    assert!(service.store().all_entries().unwrap().is_empty());
}

#[test]
fn class_and_teacher_double_booking_is_a_conflict() {
    let service = TimetableService::default();
    service
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Mon, 4, 5, "IPAS")
        .unwrap();

    let same_class = service.add_entry_by_periods(
        &owner("4A", "guru-2"),
        Weekday::Mon,
        4,
        5,
        "Matematika",
    );
    assert!(matches!(
        same_class,
        Err(PersistenceError::Timetable(TimetableError::ScheduleConflict {
            period_index: 4,
            ..
        }))
    ));

    let same_teacher =
        service.add_entry_by_periods(&owner("4B", "guru-1"), Weekday::Mon, 5, 6, "IPAS");
    assert!(matches!(
        same_teacher,
        Err(PersistenceError::Timetable(TimetableError::ScheduleConflict {
            period_index: 5,
            ..
        }))
    ));

    service
        .add_entry_by_periods(&owner("4B", "guru-2"), Weekday::Mon, 4, 5, "Matematika")
        .unwrap();
    assert_eq!(service.entries_for_teacher("guru-2").unwrap().len(), 1);
}

#[test]
fn add_by_periods_rejects_inverted_range() {
    let service = TimetableService::default();
    assert!(matches!(
        service.add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Tue, 6, 2, "IPAS"),
        Err(PersistenceError::Timetable(
            TimetableError::InvalidPeriodRange { from: 6, to: 2, .. }
        ))
    ));
}

#[test]
fn update_moves_entry_without_colliding_with_itself() {
    let service = TimetableService::default();
    let stored = service
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Wed, 2, 3, "IPAS")
        .unwrap();

    let mut moved = stored.clone();
    moved.start_time = t("08:10");
    moved.end_time = t("09:20");
    let updated = service.update_entry(moved).unwrap();
    assert_eq!(updated.id, stored.id);

    let grid = service.class_grid("4A", ConflictPolicy::Reject).unwrap().grid;
    assert!(grid.cell(Weekday::Wed, 2).unwrap().is_empty());
    assert_eq!(grid.cell(Weekday::Wed, 3).unwrap().span(), 2);

    let missing = ScheduleEntry::new(
        &owner("4A", "guru-1"),
        Weekday::Wed,
        t("07:35"),
        t("08:10"),
        "IPAS",
    )
    .with_id("nope");
    assert!(matches!(
        service.update_entry(missing),
        Err(PersistenceError::Timetable(TimetableError::NotFound(_)))
    ));
}

#[test]
fn delete_entry_reports_whether_it_existed() {
    let service = TimetableService::default();
    let stored = service
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Thu, 2, 2, "PJOK")
        .unwrap();
    let id = stored.id.unwrap();
    assert!(service.delete_entry(&id).unwrap());
    assert!(!service.delete_entry(&id).unwrap());
}

#[test]
fn teacher_grid_merges_classes() {
    let service = TimetableService::default();
    service
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Mon, 2, 2, "IPAS")
        .unwrap();
    service
        .add_entry_by_periods(&owner("5A", "guru-1"), Weekday::Mon, 3, 3, "IPAS")
        .unwrap();
    let grid = service
        .teacher_grid("guru-1", ConflictPolicy::Reject)
        .unwrap()
        .grid;
    assert_eq!(grid.heads().count(), 2);
    assert_eq!(
        grid.covering_entry(Weekday::Mon, 3).map(|e| e.class_id.as_str()),
        Some("5A")
    );
    assert_eq!(service.grids_by_class().unwrap().len(), 2);
}

#[test]
fn export_then_import_replaces_class_entries() {
    let source = TimetableService::default();
    source
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Mon, 2, 3, "Matematika")
        .unwrap();
    source
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Fri, 5, 5, "PJOK")
        .unwrap();
    let mut buffer = Vec::new();
    source.export_class_sheet("4A", &header(), &mut buffer).unwrap();

    let target = TimetableService::default();
    target
        .add_entry_by_periods(&owner("4A", "guru-9"), Weekday::Tue, 6, 6, "IPAS")
        .unwrap();
    let report = target
        .import_class_sheet(
            &owner("4A", "guru-1"),
            buffer.as_slice(),
            SheetLayout::default(),
            true,
        )
        .unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.inserted, 3);
    assert!(report.rejected.is_empty());

    let entries = target.entries_for_class("4A").unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|entry| entry.teacher_id == "guru-1"));
    assert!(entries.iter().all(|entry| entry.id.is_some()));
}

#[test]
fn lenient_import_skips_unknown_subjects() {
    let service = TimetableService::default();
    let body = sheet("1,07.00 - 07.35,UPACARA,LITERASI\n2,07.35 - 08.10,Kimia,IPAS\n");
    let report = service
        .import_class_sheet(
            &owner("4A", "guru-1"),
            body.as_bytes(),
            SheetLayout::default(),
            false,
        )
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.rejected.len(), 1);
    assert!(report.rejected[0].contains("Kimia"));
}

#[test]
fn strict_import_fails_before_touching_the_store() {
    let service = TimetableService::default();
    service
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Tue, 6, 6, "IPAS")
        .unwrap();
    let body = sheet("2,07.35 - 08.10,Kimia,IPAS\n");
    let err = service
        .import_class_sheet(
            &owner("4A", "guru-1"),
            body.as_bytes(),
            SheetLayout::default(),
            true,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Timetable(TimetableError::UnrecognizedSubject { .. })
    ));
    assert_eq!(service.entries_for_class("4A").unwrap().len(), 1);
}

#[test]
fn import_rejects_teacher_clash_with_other_class() {
    let service = TimetableService::default();
    service
        .add_entry_by_periods(&owner("5A", "guru-1"), Weekday::Tue, 2, 2, "IPAS")
        .unwrap();
    let body = sheet("2,07.35 - 08.10,,IPAS\n");
    let err = service
        .import_class_sheet(
            &owner("4A", "guru-1"),
            body.as_bytes(),
            SheetLayout::default(),
            false,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Timetable(TimetableError::ScheduleConflict { .. })
    ));
    assert!(service.entries_for_class("4A").unwrap().is_empty());
}

#[test]
fn calendar_swap_requires_stored_entries_to_align() {
    let mut service = TimetableService::default();
    service
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Mon, 2, 2, "IPAS")
        .unwrap();

    let hourly = PeriodCalendarConfig::new(
        vec![DayPeriodsConfig {
            day: Weekday::Mon,
            periods: vec![
                PeriodSlotConfig {
                    start_time: t("07:00"),
                    end_time: t("08:00"),
                    fixed_activity: None,
                },
                PeriodSlotConfig {
                    start_time: t("08:00"),
                    end_time: t("09:00"),
                    fixed_activity: None,
                },
            ],
        }],
        Vec::new(),
    );
    let calendar = PeriodCalendar::from_config(&hourly).unwrap();
    assert!(service.set_calendar(calendar).is_err());
    assert_eq!(service.calendar(), &PeriodCalendar::default());

    let snapshot = service.snapshot().unwrap();
    let restored = TimetableService::from_snapshot(snapshot).unwrap();
    assert_eq!(restored.store().all_entries().unwrap().len(), 1);
}

/// Memory store with slow reads, widening the gap between a conflict check
/// and the insert that follows it.
struct SlowReadStore {
    inner: MemoryEntryStore,
}

impl EntryStore for SlowReadStore {
    fn all_entries(&self) -> PersistenceResult<Vec<ScheduleEntry>> {
        thread::sleep(Duration::from_millis(50));
        self.inner.all_entries()
    }

    fn entries_for_class(&self, class_id: &str) -> PersistenceResult<Vec<ScheduleEntry>> {
        self.inner.entries_for_class(class_id)
    }

    fn find_entry(&self, id: &str) -> PersistenceResult<Option<ScheduleEntry>> {
        self.inner.find_entry(id)
    }

    fn insert_entries(&self, entries: &[ScheduleEntry]) -> PersistenceResult<Vec<ScheduleEntry>> {
        self.inner.insert_entries(entries)
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
fn concurrent_adds_for_the_same_slot_store_only_one() {
    let store = Arc::new(SlowReadStore {
        inner: MemoryEntryStore::new(),
    });
    let service = Arc::new(TimetableService::new(
        PeriodCalendar::default(),
        SubjectCatalog::default(),
        store.clone(),
    ));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["IPAS", "Matematika"]
        .into_iter()
        .map(|subject| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service
                    .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Mon, 2, 3, subject)
                    .is_ok()
            })
        })
        .collect();
    let results: Vec<bool> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|ok| **ok).count(), 1, "{results:?}");
    assert_eq!(store.inner.len(), 1);
    assert!(service.class_grid("4A", ConflictPolicy::Reject).is_ok());
}

#[test]
fn concurrent_update_and_add_do_not_overlap() {
    let service = Arc::new(TimetableService::new(
        PeriodCalendar::default(),
        SubjectCatalog::default(),
        Arc::new(SlowReadStore {
            inner: MemoryEntryStore::new(),
        }),
    ));
    let stored = service
        .add_entry_by_periods(&owner("4A", "guru-1"), Weekday::Tue, 5, 5, "IPAS")
        .unwrap();
    let mut moved = stored.clone();
    moved.start_time = t("07:35");
    moved.end_time = t("08:10");

    let barrier = Arc::new(Barrier::new(2));
    let update = {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            service.update_entry(moved).is_ok()
        })
    };
    let add = {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            service
                .add_entry_by_periods(&owner("4A", "guru-2"), Weekday::Tue, 2, 2, "PJOK")
                .is_ok()
        })
    };
    let outcomes = [update.join().unwrap(), add.join().unwrap()];

    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1, "{outcomes:?}");
    assert!(service.class_grid("4A", ConflictPolicy::Reject).is_ok());
}
