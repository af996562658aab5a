//! Event description lookup

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DescriptionQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DescriptionResponse {
    pub name: String,
    /// None when the event is unknown or no description table is loaded
    pub description: Option<String>,
}

/// GET /api/events/description?name=
pub async fn event_description(
    State(state): State<AppState>,
    Query(query): Query<DescriptionQuery>,
) -> ApiResult<Json<DescriptionResponse>> {
    if query.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Event name is empty".to_string()));
    }

    let description = state.events.description_for(&query.name).map(str::to_string);

    Ok(Json(DescriptionResponse {
        name: query.name,
        description,
    }))
}

pub fn events_routes() -> Router<AppState> {
    Router::new().route("/api/events/description", get(event_description))
}
