//! Settings API
//!
//! Backs the admin settings form: the grouped listing drives rendering
//! (options and `depends_on` included), updates go through the registry so
//! values are validated and the shared cache is invalidated.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use parker_common::settings::{keys, GroupedSettings, SettingRecord, SettingValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SettingValueResponse {
    pub key: String,
    /// null when the stored value is NULL
    pub value: Option<SettingValue>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: SettingValue,
}

/// GET /api/settings
pub async fn list_settings(State(state): State<AppState>) -> ApiResult<Json<GroupedSettings>> {
    Ok(Json(state.settings.get_all_grouped().await?))
}

/// GET /api/settings/:key
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SettingValueResponse>> {
    let record = state
        .settings
        .get_record(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Setting not found: {}", key)))?;

    Ok(Json(SettingValueResponse {
        key,
        value: record.value,
    }))
}

/// PUT /api/settings/:key
///
/// A new `general.log_level` also takes effect on the running logger.
pub async fn update_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<UpdateSettingRequest>,
) -> ApiResult<Json<SettingRecord>> {
    let record = state.settings.update(&key, request.value).await?;

    if record.key == keys::LOG_LEVEL {
        if let Some(level) = &record.value {
            if let Err(e) = state.log_control.update_level(&level.to_string()) {
                warn!("Stored log level {} could not be applied: {}", level, e);
            }
        }
    }

    Ok(Json(record))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(list_settings))
        .route("/api/settings/:key", get(get_setting).put(update_setting))
}
