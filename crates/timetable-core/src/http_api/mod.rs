use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{
    ConflictPolicy, Grid, ImportReport, OwnerContext, PeriodCalendarConfig, PersistenceError,
    ScheduleEntry, SheetHeader, SheetLayout, SubjectCatalog, TimetableError, TimetableService,
    export_file_name,
};

#[derive(Clone)]
pub struct AppState {
    service: Arc<TimetableService>,
    school_name: Arc<str>,
}

impl AppState {
    pub fn new(service: TimetableService) -> Self {
        Self::with_shared(Arc::new(service))
    }

    pub fn with_shared(service: Arc<TimetableService>) -> Self {
        Self {
            service,
            school_name: Arc::from(""),
        }
    }

    pub fn with_school_name(mut self, school_name: impl Into<String>) -> Self {
        self.school_name = Arc::from(school_name.into());
        self
    }

    fn service(&self) -> Arc<TimetableService> {
        self.service.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        let message = value.to_string();
        match value {
            PersistenceError::NotFound
            | PersistenceError::Timetable(TimetableError::NotFound(_)) => {
                ApiError::NotFound(message)
            }
            PersistenceError::Timetable(TimetableError::ScheduleConflict { .. }) => {
                ApiError::Conflict(message)
            }
            PersistenceError::Timetable(TimetableError::ImportPartialFailure { .. }) => {
                error!(%message, "import left class in partial state");
                ApiError::Internal(message)
            }
            PersistenceError::Timetable(_) | PersistenceError::InvalidData(_) => {
                ApiError::Invalid(message)
            }
            PersistenceError::Csv(_) => ApiError::Invalid(message),
            _ => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct GridQuery {
    #[serde(default)]
    policy: Option<String>,
}

impl GridQuery {
    fn policy(&self) -> Result<ConflictPolicy, ApiError> {
        match self.policy.as_deref().map(str::trim) {
            None | Some("") | Some("reject") => Ok(ConflictPolicy::Reject),
            Some("first_wins") => Ok(ConflictPolicy::FirstWins),
            Some(other) => Err(ApiError::invalid(format!("unknown conflict policy '{other}'"))),
        }
    }
}

#[derive(Debug, Serialize)]
struct GridResponse {
    grid: Grid,
    dropped: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImportQuery {
    teacher_id: String,
    #[serde(default)]
    strict: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/calendar", get(get_calendar))
        .route("/subjects", get(get_subjects))
        .route(
            "/classes/:class_id/entries",
            get(list_class_entries).post(create_entry),
        )
        .route("/classes/:class_id/grid", get(class_grid))
        .route("/classes/:class_id/export", get(export_class))
        .route("/classes/:class_id/import", post(import_class))
        .route("/teachers/:teacher_id/grid", get(teacher_grid))
        .route(
            "/entries/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "timetable HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_calendar(State(state): State<AppState>) -> Json<PeriodCalendarConfig> {
    Json(state.service().calendar().to_config())
}

async fn get_subjects(State(state): State<AppState>) -> Json<SubjectCatalog> {
    Json(state.service().catalog().clone())
}

async fn list_class_entries(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    let entries = state.service().entries_for_class(&class_id)?;
    Ok(Json(entries))
}

async fn create_entry(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Json(entry): Json<ScheduleEntry>,
) -> Result<(StatusCode, Json<ScheduleEntry>), ApiError> {
    if entry.class_id != class_id {
        return Err(ApiError::invalid(
            "class id in payload does not match path parameter",
        ));
    }
    let created = state.service().add_entry(entry)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleEntry>, ApiError> {
    match state.service().find_entry(&id)? {
        Some(entry) => Ok(Json(entry)),
        None => Err(ApiError::not_found(format!("entry {id} not found"))),
    }
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut entry): Json<ScheduleEntry>,
) -> Result<Json<ScheduleEntry>, ApiError> {
    if entry.id.as_deref().is_some_and(|payload_id| payload_id != id) {
        return Err(ApiError::invalid(
            "entry id in payload does not match path parameter",
        ));
    }
    entry.id = Some(id);
    let updated = state.service().update_entry(entry)?;
    Ok(Json(updated))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.service().delete_entry(&id)? {
        return Err(ApiError::not_found(format!("entry {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn class_grid(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Query(query): Query<GridQuery>,
) -> Result<Json<GridResponse>, ApiError> {
    let outcome = state.service().class_grid(&class_id, query.policy()?)?;
    Ok(Json(GridResponse {
        grid: outcome.grid,
        dropped: outcome.dropped.iter().map(ToString::to_string).collect(),
    }))
}

async fn teacher_grid(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
    Query(query): Query<GridQuery>,
) -> Result<Json<GridResponse>, ApiError> {
    let outcome = state.service().teacher_grid(&teacher_id, query.policy()?)?;
    Ok(Json(GridResponse {
        grid: outcome.grid,
        dropped: outcome.dropped.iter().map(ToString::to_string).collect(),
    }))
}

async fn export_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Response, ApiError> {
    let sheet_header = SheetHeader {
        school_name: state.school_name.to_string(),
        title: "Jadwal Pelajaran".to_string(),
        owner_label: format!("Kelas {class_id}"),
    };
    let mut body = Vec::new();
    state
        .service()
        .export_class_sheet(&class_id, &sheet_header, &mut body)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name("Jadwal", &class_id, "csv")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn import_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<ImportReport>, ApiError> {
    let owner = OwnerContext::new(class_id, query.teacher_id);
    let report = state.service().import_class_sheet(
        &owner,
        body.as_bytes(),
        SheetLayout::default(),
        query.strict,
    )?;
    Ok(Json(report))
}
