//! Admin endpoints: build information and log download

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use parker_common::logging;
use parker_common::settings::keys;
use parker_common::Error as CommonError;
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AboutResponse {
    pub app_name: Option<String>,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
    pub platform: &'static str,
    pub architecture: &'static str,
    pub log_level: &'static str,
}

/// GET /api/admin/about
pub async fn about(State(state): State<AppState>) -> ApiResult<Json<AboutResponse>> {
    let snapshot = state.settings.snapshot().await?;

    Ok(Json(AboutResponse {
        app_name: snapshot.get_str(keys::APP_NAME).map(str::to_string),
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        build_profile: env!("BUILD_PROFILE"),
        platform: std::env::consts::OS,
        architecture: std::env::consts::ARCH,
        log_level: state.log_control.current_level().as_str(),
    }))
}

/// GET /api/admin/logs/download
///
/// Sends the most recently modified log file as a plain-text attachment.
pub async fn download_latest_log(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let log_dir = state.log_control.log_directory().to_path_buf();
    let path = tokio::task::spawn_blocking(move || logging::latest_log_file(&log_dir))
        .await
        .map_err(|e| CommonError::Internal(format!("Log lookup task failed: {}", e)))??;
    let content = tokio::fs::read(&path).await?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("parker.log")
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        content,
    ))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/about", get(about))
        .route("/api/admin/logs/download", get(download_latest_log))
}
