//! Event log routes.
//!
//! All endpoints are admin-only; the router is mounted behind `require_admin`.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use domain::models::{
    CreateLogRequest, DeleteLogsRequest, ExportLogsQuery, FilterOptions, ListLogsQuery, LogRecord,
    LogStats, ReadableLog,
};
use domain::services::{event_log::DEFAULT_STATS_DAYS, render, ExportFormat};
use serde::{Deserialize, Serialize};
use shared::pagination::{PageRequest, Pagination};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ClientIp;
use crate::middleware::UserAuth;
use crate::routes::log_files;

/// Create event log router, mounted at `/api/v1/logs`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_logs).post(create_log).delete(delete_logs))
        .route("/stats", get(get_stats))
        .route("/export", get(export_logs))
        .route("/files", get(log_files::list_files))
        .route("/files/:filename", get(log_files::get_file))
        .route("/:log_id", get(get_log))
}

#[derive(Debug, Serialize)]
pub struct ListLogsResponse {
    pub data: Vec<ReadableLog>,
    pub pagination: Pagination,
    pub filters: FilterOptions,
}

#[derive(Debug, Serialize)]
pub struct LogDetailResponse {
    pub log: LogRecord,
    pub readable: ReadableLog,
}

#[derive(Debug, Serialize)]
pub struct DeleteLogsResponse {
    pub deleted: u64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

/// List business events, newest first.
#[axum::debug_handler]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<ListLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.to_filter().map_err(ApiError::Validation)?;
    let page = state
        .events
        .list(&filter, PageRequest::new(query.page, query.limit))
        .await?;

    let response = ListLogsResponse {
        data: page.records.iter().map(render).collect(),
        pagination: page.pagination,
        filters: page.filters,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// One record with its rendered form.
#[axum::debug_handler]
pub async fn get_log(
    State(state): State<AppState>,
    Path(log_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let log = state.events.get(log_id).await?;
    let readable = render(&log);

    Ok((StatusCode::OK, Json(LogDetailResponse { log, readable })))
}

#[axum::debug_handler]
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<LogStats>, ApiError> {
    let stats = state
        .events
        .stats(query.days.unwrap_or(DEFAULT_STATS_DAYS), Utc::now())
        .await?;
    Ok(Json(stats))
}

/// Download the matching records as CSV (default) or JSON.
#[axum::debug_handler]
pub async fn export_logs(
    State(state): State<AppState>,
    user: UserAuth,
    Query(query): Query<ExportLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let format = match query.format.as_deref().map(str::trim) {
        None | Some("") => ExportFormat::default(),
        Some(f) => f.parse::<ExportFormat>().map_err(ApiError::Validation)?,
    };
    let filter = query
        .to_list_query()
        .to_filter()
        .map_err(ApiError::Validation)?;

    let file = state.events.export(&filter, format, Utc::now()).await?;
    info!(
        user_id = %user.user_id,
        count = file.count,
        format = format.extension(),
        "Log export downloaded"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file.filename),
            ),
        ],
        file.body,
    ))
}

/// Manually append a record, attributed to the caller.
#[axum::debug_handler]
pub async fn create_log(
    State(state): State<AppState>,
    user: UserAuth,
    ClientIp(ip_address): ClientIp,
    Json(request): Json<CreateLogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let input = request
        .to_new_record()
        .map_err(ApiError::Validation)?
        .with_actor(user.user_id.clone(), user.user_name.clone())
        .with_ip_address(ip_address);

    match state.events.record(input).await? {
        Some(record) => Ok((StatusCode::CREATED, Json(record)).into_response()),
        // Debug records are written to the transport log only.
        None => Ok(StatusCode::ACCEPTED.into_response()),
    }
}

/// Guarded bulk delete. See [`domain::services::EventLogService::delete`].
#[axum::debug_handler]
pub async fn delete_logs(
    State(state): State<AppState>,
    user: UserAuth,
    ClientIp(ip_address): ClientIp,
    Json(request): Json<DeleteLogsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = user.actor(ip_address);
    let outcome = state.events.delete(&request, &actor).await?;

    let response = DeleteLogsResponse {
        deleted: outcome.deleted,
        message: format!("{} Log-Einträge wurden gelöscht", outcome.deleted),
    };

    Ok((StatusCode::OK, Json(response)))
}
