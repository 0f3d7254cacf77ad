//! System settings routes.

use axum::{extract::State, Json};
use domain::models::{SystemSettings, UpdateSettingsRequest};
use domain::services::{change_record, ChangeContext};
use persistence::repositories::SystemSettingsRepository;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ClientIp;
use crate::middleware::UserAuth;

/// Entity type of the settings singleton in change records.
pub const SETTINGS_ENTITY: &str = "setting";

/// Entity id of the settings singleton in change records.
pub const SETTINGS_ENTITY_ID: &str = "system";

/// Current settings, created with defaults on first access.
#[axum::debug_handler]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SystemSettings>, ApiError> {
    let repo = SystemSettingsRepository::new(state.pool.clone());
    let settings = repo.get_or_create().await?;
    Ok(Json(settings))
}

/// Merge, validate and persist an update, then audit the field changes.
#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<AppState>,
    user: UserAuth,
    ClientIp(ip_address): ClientIp,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SystemSettings>, ApiError> {
    request.validate()?;
    if let Some(ref installments) = request.payment_installments {
        installments.validate()?;
    }

    let repo = SystemSettingsRepository::new(state.pool.clone());
    let current = repo.get_or_create().await?;
    let merged = current.apply(&request, &user.user_name)?;
    let saved = repo.save(&merged).await?;

    let ctx = ChangeContext::new(SETTINGS_ENTITY, SETTINGS_ENTITY_ID, "Systemeinstellungen")
        .by(user.user_id.clone(), user.user_name.clone());

    if let Some(record) = change_record(&ctx, &current.snapshot(), &saved.snapshot()) {
        info!(user_id = %user.user_id, fields = record.changes.len(), "System settings updated");
        state.audit.dispatch(record.with_ip_address(ip_address));
    }

    Ok(Json(saved))
}
