use crate::calendar::{PeriodCalendar, PeriodCalendarConfig};
use crate::persistence::{EntryStore, MemoryEntryStore, PersistenceResult};
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const HTTP_ADDR_VAR: &str = "TIMETABLE_HTTP_ADDR";
pub const CALENDAR_VAR: &str = "TIMETABLE_CALENDAR";
pub const DATABASE_VAR: &str = "TIMETABLE_DB";
pub const SCHOOL_NAME_VAR: &str = "TIMETABLE_SCHOOL_NAME";

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub http_addr: String,
    pub calendar_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub school_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            calendar_path: None,
            database_path: None,
            school_name: "Sekolah Dasar".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            http_addr: get(HTTP_ADDR_VAR).unwrap_or(defaults.http_addr),
            calendar_path: get(CALENDAR_VAR).map(PathBuf::from),
            database_path: get(DATABASE_VAR).map(PathBuf::from),
            school_name: get(SCHOOL_NAME_VAR).unwrap_or(defaults.school_name),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    pub fn load_calendar(&self) -> PersistenceResult<PeriodCalendar> {
        match &self.calendar_path {
            Some(path) => {
                let file = File::open(path)?;
                let config: PeriodCalendarConfig = serde_json::from_reader(file)?;
                Ok(PeriodCalendar::from_config(&config)?)
            }
            None => Ok(PeriodCalendar::default()),
        }
    }

    /// SQLite when a database path is configured, memory otherwise.
    pub fn open_store(&self) -> PersistenceResult<Arc<dyn EntryStore>> {
        match &self.database_path {
            Some(path) => Self::open_database(path),
            None => Ok(Arc::new(MemoryEntryStore::new())),
        }
    }

    #[cfg(feature = "sqlite")]
    fn open_database(path: &Path) -> PersistenceResult<Arc<dyn EntryStore>> {
        tracing::info!(path = %path.display(), "opening sqlite entry store");
        let store = crate::persistence::sqlite::SqliteEntryStore::new(path)?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "sqlite"))]
    fn open_database(path: &Path) -> PersistenceResult<Arc<dyn EntryStore>> {
        tracing::warn!(path = %path.display(), "built without sqlite; using memory store");
        Ok(Arc::new(MemoryEntryStore::new()))
    }
}
