//! Access to the rotated log files, mounted below `/api/v1/logs/files`.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::log_files::{list_log_files, tail_log_file};
use crate::services::{LogFileInfo, LogFileTail};

#[derive(Debug, Serialize)]
pub struct LogFilesResponse {
    pub files: Vec<LogFileInfo>,
}

#[derive(Debug, Deserialize)]
pub struct TailQuery {
    pub lines: Option<usize>,
}

#[axum::debug_handler]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<LogFilesResponse>, ApiError> {
    let files = list_log_files(&state.config.logging.directory).await?;
    Ok(Json(LogFilesResponse { files }))
}

/// The last `lines` lines of one file (1000 by default).
#[axum::debug_handler]
pub async fn get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<TailQuery>,
) -> Result<Json<LogFileTail>, ApiError> {
    let tail = tail_log_file(&state.config.logging.directory, &filename, query.lines).await?;
    Ok(Json(tail))
}
