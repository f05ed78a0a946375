use crate::calendar::PeriodCalendar;
use crate::codec::TabularRow;
use crate::persistence::{PersistenceError, PersistenceResult};
use chrono::Weekday;
use polars::prelude::{DataFrame, NamedFrom, PlSmallStr, Series};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;

pub const PERIOD_COLUMN: &str = "Period";
pub const TIME_COLUMN: &str = "Time";

/// Identification block written above the column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetHeader {
    pub school_name: String,
    pub title: String,
    pub owner_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    /// Rows skipped before the column header row.
    pub header_offset: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self { header_offset: 3 }
    }
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// English names and abbreviations, plus the Indonesian names found in
/// older sheets.
pub fn parse_day_name(raw: &str) -> Option<Weekday> {
    let name = raw.trim().to_ascii_lowercase();
    match name.as_str() {
        "senin" => Some(Weekday::Mon),
        "selasa" => Some(Weekday::Tue),
        "rabu" => Some(Weekday::Wed),
        "kamis" => Some(Weekday::Thu),
        "jumat" | "jum'at" => Some(Weekday::Fri),
        "sabtu" => Some(Weekday::Sat),
        "minggu" => Some(Weekday::Sun),
        other => other.parse::<Weekday>().ok(),
    }
}

/// `<Artifact>_<ClassLabel>.<extension>`, whitespace in the label replaced by `_`.
/// Only ASCII letters, digits, `_` and `-` survive, so the name is safe to
/// place in a `Content-Disposition` header.
pub fn export_file_name(artifact: &str, class_label: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        file_name_part(artifact),
        file_name_part(class_label),
        file_name_part(extension)
    )
}

fn file_name_part(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect()
}

pub fn write_sheet<W: io::Write>(
    writer: W,
    header: &SheetHeader,
    rows: &[TabularRow],
    calendar: &PeriodCalendar,
) -> PersistenceResult<()> {
    let days = calendar.days();
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    writer.write_record([header.school_name.as_str()])?;
    writer.write_record([header.title.as_str()])?;
    writer.write_record([header.owner_label.as_str()])?;

    let mut column_header = vec![PERIOD_COLUMN, TIME_COLUMN];
    column_header.extend(days.iter().map(|day| day_name(*day)));
    writer.write_record(&column_header)?;

    for row in rows {
        let mut record = vec![row.period_index.to_string(), row.time_label.clone()];
        record.extend(days.iter().map(|day| row.value(*day).to_string()));
        writer.write_record(&record)?;

        if let Some(recess) = calendar.recess_after(row.period_index) {
            // Period cell left blank so readers skip the row.
            let mut record = vec![
                String::new(),
                format!(
                    "{} - {}",
                    recess.start_time.dotted(),
                    recess.end_time.dotted()
                ),
            ];
            record.extend(days.iter().map(|_| recess.label.clone()));
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn read_sheet<R: io::Read>(reader: R, layout: SheetLayout) -> PersistenceResult<Vec<TabularRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut day_columns: Option<BTreeMap<usize, Weekday>> = None;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if row_idx < layout.header_offset {
            continue;
        }
        if day_columns.is_none() {
            let columns: BTreeMap<usize, Weekday> = record
                .iter()
                .enumerate()
                .skip(2)
                .filter_map(|(col, name)| parse_day_name(name).map(|day| (col, day)))
                .collect();
            if columns.is_empty() {
                return Err(PersistenceError::InvalidData(format!(
                    "row {} is not a column header with weekday names",
                    row_idx + 1
                )));
            }
            day_columns = Some(columns);
            continue;
        }
        let Some(columns) = &day_columns else {
            continue;
        };

        let period_cell = record.get(0).unwrap_or("").trim();
        let time_cell = record.get(1).unwrap_or("").trim();
        if period_cell.is_empty() || time_cell.is_empty() {
            continue;
        }
        let Some(period_index) = period_cell.parse::<u32>().ok().filter(|idx| *idx > 0) else {
            continue;
        };
        let by_day = columns
            .iter()
            .map(|(&col, &day)| (day, record.get(col).unwrap_or("").trim().to_string()))
            .collect();
        rows.push(TabularRow {
            period_index,
            time_label: time_cell.to_string(),
            by_day,
        });
    }

    if day_columns.is_none() {
        return Err(PersistenceError::InvalidData(
            "sheet has no column header row".into(),
        ));
    }
    Ok(rows)
}

/// Tabular view with `Period`, `Time` and one string column per teaching day.
pub fn rows_to_dataframe(
    rows: &[TabularRow],
    calendar: &PeriodCalendar,
) -> PersistenceResult<DataFrame> {
    let periods: Vec<u32> = rows.iter().map(|row| row.period_index).collect();
    let times: Vec<String> = rows.iter().map(|row| row.time_label.clone()).collect();
    let mut series = vec![
        Series::new(PlSmallStr::from_static(PERIOD_COLUMN), periods),
        Series::new(PlSmallStr::from_static(TIME_COLUMN), times),
    ];
    for day in calendar.days() {
        let values: Vec<String> = rows.iter().map(|row| row.value(day).to_string()).collect();
        series.push(Series::new(PlSmallStr::from_static(day_name(day)), values));
    }
    let df = DataFrame::new(series.into_iter().map(Into::into).collect())?;
    Ok(df)
}
