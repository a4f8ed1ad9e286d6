use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_id, CurrentUser, LimitQuery};
use crate::routes::now;
use crate::state::AppState;
use crate::views::{ReactionView, Renderer};

#[derive(Debug, Deserialize)]
pub struct PostReactionRequest {
    pub emoji_name: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/livestream/{livestream_id}/reaction",
        get(list_reactions).post(post_reaction),
    )
}

async fn list_reactions(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(livestream_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<ReactionView>>> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let limit = query.parse()?;
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();

    let views = state
        .storage
        .run(move |conn| {
            let reactions = queries::reactions_for(conn, livestream_id, limit)?;
            Renderer::new(conn, &caches, &fallback).reactions(reactions)
        })
        .await?;
    Ok(Json(views))
}

async fn post_reaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(livestream_id): Path<String>,
    Json(req): Json<PostReactionRequest>,
) -> AppResult<(StatusCode, Json<ReactionView>)> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    if req.emoji_name.is_empty() {
        return Err(AppError::BadRequest("emoji_name must not be empty".into()));
    }
    let created_at = now();
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();

    let view = state
        .storage
        .transaction(move |tx| {
            if queries::livestream_by_id(tx, livestream_id)?.is_none() {
                return Err(AppError::NotFound("livestream not found".into()));
            }
            let id =
                queries::insert_reaction(tx, user.id, livestream_id, &req.emoji_name, created_at)?;
            let reaction = queries::reaction_by_id(tx, id)?
                .ok_or_else(|| AppError::Internal("created reaction vanished".into()))?;
            Renderer::new(tx, &caches, &fallback).reaction(reaction)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}
