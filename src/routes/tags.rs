use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::Tag;
use crate::db::queries;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<Tag>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/tag", get(list_tags))
}

async fn list_tags(State(state): State<AppState>) -> AppResult<Json<TagsResponse>> {
    let tags = state.storage.run(|conn| queries::all_tags(conn)).await?;
    Ok(Json(TagsResponse { tags }))
}
