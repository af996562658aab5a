//! Collection listing endpoint

use axum::{extract::State, routing::get, Json, Router};
use parker_common::collections::{self, CollectionSummary};

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/collections
pub async fn list_collections(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CollectionSummary>>> {
    Ok(Json(collections::list_collections(&state.db).await?))
}

pub fn collections_routes() -> Router<AppState> {
    Router::new().route("/api/collections", get(list_collections))
}
