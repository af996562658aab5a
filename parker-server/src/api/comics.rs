//! Comic browsing endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use parker_common::comics::{self, ComicDetail, ComicList};

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/comics
pub async fn list_comics(State(state): State<AppState>) -> ApiResult<Json<ComicList>> {
    Ok(Json(comics::list_comics(&state.db).await?))
}

/// GET /api/comics/:id
pub async fn get_comic(
    State(state): State<AppState>,
    Path(comic_id): Path<i64>,
) -> ApiResult<Json<ComicDetail>> {
    Ok(Json(comics::get_comic(&state.db, comic_id).await?))
}

pub fn comics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/comics", get(list_comics))
        .route("/api/comics/:id", get(get_comic))
}
