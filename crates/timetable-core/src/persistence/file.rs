use super::{PersistenceError, PersistenceResult};
use crate::calendar::{PeriodCalendar, PeriodCalendarConfig};
use crate::clock::ClockTime;
use crate::entry::ScheduleEntry;
use crate::entry_validation;
use crate::subject::SubjectCatalog;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Everything needed to rebuild a timetable: calendar, subject list, entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<PeriodCalendarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<SubjectCatalog>,
    pub entries: Vec<ScheduleEntry>,
}

impl TimetableSnapshot {
    pub fn new(
        calendar: &PeriodCalendar,
        catalog: &SubjectCatalog,
        entries: Vec<ScheduleEntry>,
    ) -> Self {
        Self {
            calendar: Some(calendar.to_config()),
            subjects: Some(catalog.clone()),
            entries,
        }
    }

    /// Missing calendar or subjects fall back to the defaults. Entries are
    /// validated against whichever calendar results.
    pub fn into_parts(self) -> PersistenceResult<(PeriodCalendar, SubjectCatalog, Vec<ScheduleEntry>)> {
        let calendar = match &self.calendar {
            Some(config) => PeriodCalendar::from_config(config)?,
            None => PeriodCalendar::default(),
        };
        let catalog = self.subjects.unwrap_or_default();
        entry_validation::validate_entry_collection(&self.entries, &calendar, &catalog)?;
        Ok((calendar, catalog, self.entries))
    }
}

pub fn save_timetable_to_json<P: AsRef<Path>>(
    snapshot: &TimetableSnapshot,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_timetable_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<TimetableSnapshot> {
    let file = File::open(path)?;
    let snapshot: TimetableSnapshot = serde_json::from_reader(file)?;
    Ok(snapshot)
}

#[derive(Default, Serialize, Deserialize)]
struct EntryCsvRecord {
    id: String,
    day: String,
    start_time: String,
    end_time: String,
    subject: String,
    class_id: String,
    teacher_id: String,
}

impl From<&ScheduleEntry> for EntryCsvRecord {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            id: entry.id.clone().unwrap_or_default(),
            day: entry.day.to_string(),
            start_time: entry.start_time.to_string(),
            end_time: entry.end_time.to_string(),
            subject: entry.subject.clone(),
            class_id: entry.class_id.clone(),
            teacher_id: entry.teacher_id.clone(),
        }
    }
}

impl EntryCsvRecord {
    fn into_entry(self) -> PersistenceResult<ScheduleEntry> {
        let day = self.day.trim().parse::<Weekday>().map_err(|_| {
            PersistenceError::InvalidData(format!("invalid day '{}'", self.day))
        })?;
        Ok(ScheduleEntry {
            id: parse_string_option(self.id),
            day,
            start_time: self.start_time.parse::<ClockTime>()?,
            end_time: self.end_time.parse::<ClockTime>()?,
            subject: self.subject.trim().to_string(),
            class_id: self.class_id.trim().to_string(),
            teacher_id: self.teacher_id.trim().to_string(),
        })
    }
}

pub fn save_entries_to_csv<P: AsRef<Path>>(entries: &[ScheduleEntry], path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for entry in entries {
        writer.serialize(EntryCsvRecord::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_entries_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<ScheduleEntry>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut entries = Vec::new();
    for record in reader.deserialize::<EntryCsvRecord>() {
        entries.push(record?.into_entry()?);
    }
    Ok(entries)
}

fn parse_string_option(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
