pub mod calendar;
pub mod clock;
pub mod codec;
pub mod config;
pub mod entry;
pub mod entry_validation;
pub mod error;
pub mod grid;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod persistence;
pub mod resolver;
pub mod service;
pub mod sheet;
pub mod subject;
pub mod telemetry;

pub use calendar::{
    DayPeriodsConfig, PeriodCalendar, PeriodCalendarConfig, PeriodDefinition, PeriodSlotConfig,
    RecessDefinition,
};
pub use clock::ClockTime;
pub use codec::{ImportOutcome, ScheduleRowCodec, TabularRow};
pub use config::ServiceConfig;
pub use entry::{OwnerContext, ScheduleEntry};
pub use error::{TimetableError, TimetableResult};
pub use grid::{
    BuildOutcome, CellContent, ConflictPolicy, Grid, GridBuilder, GridCell, GridDay,
    build_grids_by_class,
};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteEntryStore;
pub use persistence::{
    EntryStore, MemoryEntryStore, PersistenceError, PersistenceResult, ReplaceSummary,
    TimetableSnapshot, load_entries_from_csv, load_timetable_from_json, save_entries_to_csv,
    save_timetable_to_json,
};
pub use resolver::TimeRangeResolver;
pub use service::{ImportReport, TimetableService};
pub use sheet::{SheetHeader, SheetLayout, export_file_name, read_sheet, rows_to_dataframe, write_sheet};
pub use subject::SubjectCatalog;
