use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_id, CurrentUser, LimitQuery};
use crate::routes::now;
use crate::state::AppState;
use crate::views::{LivecommentView, Renderer, ReportView};

#[derive(Debug, Deserialize)]
pub struct PostLivecommentRequest {
    pub comment: String,
    #[serde(default)]
    pub tip: i64,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/livestream/{livestream_id}/livecomment",
            get(list_livecomments).post(post_livecomment),
        )
        .route(
            "/api/livestream/{livestream_id}/livecomment/{livecomment_id}/report",
            post(report_livecomment),
        )
}

// --- Handlers ---

async fn list_livecomments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(livestream_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<LivecommentView>>> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let limit = query.parse()?;
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();

    let views = state
        .storage
        .run(move |conn| {
            let comments = queries::visible_livecomments(conn, livestream_id, limit)?;
            Renderer::new(conn, &caches, &fallback).livecomments(comments)
        })
        .await?;
    Ok(Json(views))
}

async fn post_livecomment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(livestream_id): Path<String>,
    Json(req): Json<PostLivecommentRequest>,
) -> AppResult<(StatusCode, Json<LivecommentView>)> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let comment = state
        .moderation
        .post_comment(user.id, livestream_id, req.comment, req.tip, now())
        .await?;

    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();
    let view = state
        .storage
        .run(move |conn| Renderer::new(conn, &caches, &fallback).livecomment(comment))
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn report_livecomment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((livestream_id, livecomment_id)): Path<(String, String)>,
) -> AppResult<(StatusCode, Json<ReportView>)> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let livecomment_id = parse_id(&livecomment_id, "livecomment_id")?;
    let created_at = now();
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();

    let view = state
        .storage
        .transaction(move |tx| {
            if queries::livestream_by_id(tx, livestream_id)?.is_none() {
                return Err(AppError::NotFound("livestream not found".into()));
            }
            let comment = queries::livecomment_by_id(tx, livecomment_id)?
                .filter(|c| c.livestream_id == livestream_id)
                .ok_or_else(|| AppError::NotFound("livecomment not found".into()))?;

            let id = queries::insert_report(tx, user.id, livestream_id, comment.id, created_at)?;
            let report = queries::report_by_id(tx, id)?
                .ok_or_else(|| AppError::Internal("created report vanished".into()))?;
            Renderer::new(tx, &caches, &fallback).report(report)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}
