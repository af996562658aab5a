//! parker-server library - comic library HTTP API
//!
//! Router and handlers are exposed as a library so integration tests can
//! drive them with `tower::ServiceExt::oneshot`.

use axum::Router;
use parker_common::enrichment::EventDescriptions;
use parker_common::logging::LogControl;
use parker_common::settings::{SettingsCache, SettingsRegistry};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Typed settings access; owns the shared settings cache
    pub settings: SettingsRegistry,
    /// Runtime log level control and log directory
    pub log_control: LogControl,
    /// Story-arc event descriptions (may be empty)
    pub events: Arc<EventDescriptions>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        settings: SettingsRegistry,
        log_control: LogControl,
        events: EventDescriptions,
    ) -> Self {
        Self {
            db,
            settings,
            log_control,
            events: Arc::new(events),
        }
    }

    /// Shared settings cache
    pub fn cache(&self) -> &Arc<SettingsCache> {
        self.settings.cache()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::settings_routes())
        .merge(api::comics_routes())
        .merge(api::collections_routes())
        .merge(api::login_routes())
        .merge(api::events_routes())
        .merge(api::admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
