//! Login page appearance
//!
//! Combines the seasonal effect for the day with the login background
//! settings. Settings are read through the shared cache; values whose
//! dependency is not satisfied are left out.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use parker_common::login_effects;
use parker_common::settings::{keys, SettingsSnapshot};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AppearanceQuery {
    /// Preview another day (YYYY-MM-DD); defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct LoginAppearance {
    pub app_name: Option<String>,
    pub season: Option<&'static str>,
    pub effect: Option<&'static str>,
    pub background_style: Option<String>,
    pub solid_color: Option<String>,
    pub static_cover: Option<String>,
}

/// GET /api/login/appearance
pub async fn login_appearance(
    State(state): State<AppState>,
    Query(query): Query<AppearanceQuery>,
) -> ApiResult<Json<LoginAppearance>> {
    let active = match query.date {
        Some(date) => login_effects::active_effect_on(date),
        None => login_effects::active_effect(),
    };

    let snapshot = state.settings.snapshot().await?;
    let active_value = |key: &str| -> Option<String> {
        let depends_on = state
            .settings
            .catalog()
            .get(key)
            .and_then(|d| d.depends_on.as_ref());
        if snapshot.is_active(depends_on) {
            string_value(&snapshot, key)
        } else {
            None
        }
    };

    Ok(Json(LoginAppearance {
        app_name: string_value(&snapshot, keys::APP_NAME),
        season: active.map(|e| e.season),
        effect: active.map(|e| e.effect),
        background_style: string_value(&snapshot, keys::LOGIN_BACKGROUND_STYLE),
        solid_color: active_value(keys::LOGIN_SOLID_COLOR),
        static_cover: active_value(keys::LOGIN_STATIC_COVER),
    }))
}

fn string_value(snapshot: &SettingsSnapshot, key: &str) -> Option<String> {
    snapshot.get_str(key).map(str::to_string)
}

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/api/login/appearance", get(login_appearance))
}
