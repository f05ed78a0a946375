use class_timetable::sheet::{day_name, parse_day_name};
use class_timetable::{
    ConflictPolicy, EntryStore, MemoryEntryStore, OwnerContext, PeriodCalendar,
    PeriodCalendarConfig, ScheduleEntry, ScheduleRowCodec, ServiceConfig, SheetHeader, SheetLayout,
    SubjectCatalog, TimetableService, TimetableSnapshot, load_entries_from_csv,
    load_timetable_from_json, rows_to_dataframe, save_entries_to_csv,
    save_timetable_to_json, telemetry,
};
use polars::prelude::{AnyValue, DataFrame};
use std::fs::{self, File};
use std::io::{self, Write};
use std::sync::Arc;

fn cell_text(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.chars().count()).collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row = Vec::with_capacity(columns.len());
        for (ci, col) in columns.iter().enumerate() {
            let s = col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default();
            widths[ci] = widths[ci].max(s.chars().count());
            row.push(s);
        }
        cells.push(row);
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_line = |values: &[String]| {
        let mut line = String::from("|");
        for (value, width) in values.iter().zip(&widths) {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(width.saturating_sub(value.chars().count())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_line(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_line(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                      Show this help\n  show <class>                              Show the class timetable grid\n  teacher <teacher_id>                      Show a teacher's timetable grid\n  list <class>                              List stored entries of a class\n  add <class> <teacher> <day> <from> <to> <subject...>\n                                            Add an entry spanning periods from..to\n  delete <id>                               Delete an entry\n  subjects                                  List allowed subjects\n  calendar show                             Display the period calendar\n  calendar set <json_path>                  Load calendar config from JSON file\n  calendar save <json_path>                 Save calendar config to JSON file\n  export <class> <path>                     Write the class sheet (CSV)\n  import <class> <teacher> <path>           Replace the class entries from a sheet\n  save <json|csv> <path>                    Persist timetable to disk\n  load <json|csv> <path>                    Load timetable from disk\n  quit|exit                                 Exit"
    );
}

fn print_calendar(calendar: &PeriodCalendar) {
    for day in calendar.days() {
        println!("{}:", day_name(day));
        for period in calendar.periods_for(day).unwrap_or_default() {
            let fixed = period.fixed_activity.as_deref().unwrap_or("");
            println!(
                "  {:>2}  {} - {}  {}",
                period.period_index, period.start_time, period.end_time, fixed
            );
        }
    }
    for recess in calendar.recesses() {
        println!(
            "Recess after period {}: {} {} - {}",
            recess.after_period, recess.label, recess.start_time, recess.end_time
        );
    }
    let off_days = calendar
        .non_teaching_days()
        .into_iter()
        .map(day_name)
        .collect::<Vec<_>>()
        .join(", ");
    println!("Non-teaching days: {off_days}");
}

fn print_entries(entries: &[ScheduleEntry]) {
    if entries.is_empty() {
        println!("No entries.");
        return;
    }
    for entry in entries {
        println!(
            "{}  {} {}-{}  {}  (teacher {})",
            entry.id.as_deref().unwrap_or("-"),
            day_name(entry.day),
            entry.start_time,
            entry.end_time,
            entry.subject,
            entry.teacher_id
        );
    }
}

fn render_grid(service: &TimetableService, entries_of: GridOwner<'_>) -> Result<String, String> {
    let outcome = match entries_of {
        GridOwner::Class(class_id) => service.class_grid(class_id, ConflictPolicy::FirstWins),
        GridOwner::Teacher(teacher_id) => {
            service.teacher_grid(teacher_id, ConflictPolicy::FirstWins)
        }
    }
    .map_err(|e| e.to_string())?;
    let rows = ScheduleRowCodec::new(service.calendar())
        .to_rows(&outcome.grid)
        .map_err(|e| e.to_string())?;
    let df = rows_to_dataframe(&rows, service.calendar()).map_err(|e| e.to_string())?;
    let mut out = render_df_as_text_table(&df);
    for dropped in &outcome.dropped {
        out.push_str(&format!("Not shown: {dropped}\n"));
    }
    Ok(out)
}

/// Calendar and store from the environment. Either falls back to its
/// default when it cannot be loaded.
fn service_from_config(config: &ServiceConfig) -> TimetableService {
    let calendar = config.load_calendar().unwrap_or_else(|e| {
        println!("Error loading calendar: {e}. Using the default calendar.");
        PeriodCalendar::default()
    });
    let store: Arc<dyn EntryStore> = match config.open_store() {
        Ok(store) => store,
        Err(e) => {
            println!("Error opening database: {e}. Using an in-memory store.");
            Arc::new(MemoryEntryStore::new())
        }
    };
    TimetableService::new(calendar, SubjectCatalog::default(), store)
}

enum GridOwner<'a> {
    Class(&'a str),
    Teacher(&'a str),
}

fn main() {
    telemetry::init_tracing("class_timetable=warn");
    let config = ServiceConfig::from_env();
    let mut service = service_from_config(&config);

    println!("Class Timetable (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" | "teacher" => match parts.next() {
                Some(owner) => {
                    let target = if cmd == "show" {
                        GridOwner::Class(owner)
                    } else {
                        GridOwner::Teacher(owner)
                    };
                    match render_grid(&service, target) {
                        Ok(table) => println!("{table}"),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                None => println!("Usage: {cmd} <id>"),
            },
            "list" => match parts.next() {
                Some(class_id) => match service.entries_for_class(class_id) {
                    Ok(entries) => print_entries(&entries),
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: list <class>"),
            },
            "add" => {
                let class_id = parts.next();
                let teacher_id = parts.next();
                let day_s = parts.next();
                let from_s = parts.next();
                let to_s = parts.next();
                let subject = parts.collect::<Vec<_>>().join(" ");
                match (class_id, teacher_id, day_s, from_s, to_s) {
                    (Some(class_id), Some(teacher_id), Some(day_s), Some(from_s), Some(to_s))
                        if !subject.is_empty() =>
                    {
                        let Some(day) = parse_day_name(day_s) else {
                            println!("Invalid day");
                            continue;
                        };
                        let (Ok(from), Ok(to)) = (from_s.parse::<u32>(), to_s.parse::<u32>())
                        else {
                            println!("Invalid period number");
                            continue;
                        };
                        let owner = OwnerContext::new(class_id, teacher_id);
                        match service.add_entry_by_periods(&owner, day, from, to, &subject) {
                            Ok(entry) => println!(
                                "Entry added: {}",
                                entry.id.as_deref().unwrap_or_default()
                            ),
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!(
                        "Usage: add <class> <teacher> <day> <from> <to> <subject...>"
                    ),
                }
            }
            "delete" => match parts.next() {
                Some(id) => match service.delete_entry(id) {
                    Ok(true) => println!("Deleted entry {id}."),
                    Ok(false) => println!("Entry {id} not found."),
                    Err(e) => println!("Error deleting entry: {e}"),
                },
                None => println!("Usage: delete <id>"),
            },
            "subjects" => {
                for subject in service.catalog().subjects() {
                    println!("  {subject}");
                }
            }
            "calendar" => {
                let sub = parts.next();
                match sub {
                    Some("show") => print_calendar(service.calendar()),
                    Some("set") => match parts.next() {
                        Some(path) => {
                            let loaded = fs::read_to_string(path)
                                .map_err(|e| e.to_string())
                                .and_then(|json| {
                                    serde_json::from_str::<PeriodCalendarConfig>(&json)
                                        .map_err(|e| e.to_string())
                                })
                                .and_then(|calendar_config| {
                                    PeriodCalendar::from_config(&calendar_config).map_err(|e| e.to_string())
                                });
                            match loaded {
                                Ok(calendar) => match service.set_calendar(calendar) {
                                    Ok(()) => println!("Calendar loaded from {path}."),
                                    Err(e) => println!("Calendar rejected: {e}"),
                                },
                                Err(e) => println!("Error loading calendar: {e}"),
                            }
                        }
                        None => println!("Usage: calendar set <json_path>"),
                    },
                    Some("save") => match parts.next() {
                        Some(path) => {
                            let saved = serde_json::to_string_pretty(&service.calendar().to_config())
                                .map_err(|e| e.to_string())
                                .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
                            match saved {
                                Ok(()) => println!("Calendar saved to {path}."),
                                Err(e) => println!("Error saving calendar: {e}"),
                            }
                        }
                        None => println!("Usage: calendar save <json_path>"),
                    },
                    _ => println!("Usage: calendar <show|set|save> ..."),
                }
            }
            "export" => match (parts.next(), parts.next()) {
                (Some(class_id), Some(path)) => {
                    let header = SheetHeader {
                        school_name: config.school_name.clone(),
                        title: "Jadwal Pelajaran".to_string(),
                        owner_label: format!("Kelas {class_id}"),
                    };
                    let result = File::create(path)
                        .map_err(|e| e.to_string())
                        .and_then(|file| {
                            service
                                .export_class_sheet(class_id, &header, file)
                                .map_err(|e| e.to_string())
                        });
                    match result {
                        Ok(()) => println!("Class {class_id} exported to {path}."),
                        Err(e) => println!("Export error: {e}"),
                    }
                }
                _ => println!("Usage: export <class> <path>"),
            },
            "import" => match (parts.next(), parts.next(), parts.next()) {
                (Some(class_id), Some(teacher_id), Some(path)) => {
                    let owner = OwnerContext::new(class_id, teacher_id);
                    let result = File::open(path).map_err(|e| e.to_string()).and_then(|file| {
                        service
                            .import_class_sheet(&owner, file, SheetLayout::default(), false)
                            .map_err(|e| e.to_string())
                    });
                    match result {
                        Ok(report) => {
                            println!(
                                "Imported class {}: {} removed, {} added.",
                                report.class_id, report.deleted, report.inserted
                            );
                            for rejected in &report.rejected {
                                println!("  skipped: {rejected}");
                            }
                        }
                        Err(e) => println!("Import error: {e}"),
                    }
                }
                _ => println!("Usage: import <class> <teacher> <path>"),
            },
            "save" => match (parts.next(), parts.next()) {
                (Some(fmt), Some(path)) => {
                    let res = match fmt {
                        "json" => service
                            .snapshot()
                            .and_then(|snapshot| save_timetable_to_json(&snapshot, path)),
                        "csv" => service
                            .store()
                            .all_entries()
                            .and_then(|entries| save_entries_to_csv(&entries, path)),
                        _ => {
                            println!("Unknown format '{fmt}'. Use json or csv.");
                            continue;
                        }
                    };
                    match res {
                        Ok(()) => println!("Timetable saved to {path}."),
                        Err(e) => println!("Error saving timetable: {e}"),
                    }
                }
                _ => println!("Usage: save <json|csv> <path>"),
            },
            "load" => match (parts.next(), parts.next()) {
                (Some(fmt), Some(path)) => {
                    let res = match fmt {
                        "json" => load_timetable_from_json(path)
                            .and_then(TimetableService::from_snapshot),
                        "csv" => load_entries_from_csv(path).and_then(|entries| {
                            let snapshot = TimetableSnapshot::new(
                                service.calendar(),
                                service.catalog(),
                                entries,
                            );
                            TimetableService::from_snapshot(snapshot)
                        }),
                        _ => {
                            println!("Unknown format '{fmt}'. Use json or csv.");
                            continue;
                        }
                    };
                    match res {
                        Ok(loaded) => {
                            service = loaded;
                            println!("Timetable loaded from {path}.");
                        }
                        Err(e) => println!("Error loading timetable: {e}"),
                    }
                }
                _ => println!("Usage: load <json|csv> <path>"),
            },
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }
}
