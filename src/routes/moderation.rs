use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::BannedWord;
use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_id, CurrentUser};
use crate::routes::now;
use crate::state::AppState;
use crate::views::{Renderer, ReportView};

#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    #[serde(alias = "ng_word")]
    pub word: String,
}

#[derive(Debug, Serialize)]
pub struct ModerateResponse {
    pub word_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/livestream/{livestream_id}/moderate", post(moderate))
        .route("/api/livestream/{livestream_id}/ngwords", get(list_banned_words))
        .route("/api/livestream/{livestream_id}/report", get(list_reports))
}

async fn moderate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(livestream_id): Path<String>,
    Json(req): Json<ModerateRequest>,
) -> AppResult<(StatusCode, Json<ModerateResponse>)> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let added = state
        .moderation
        .add_rule(user.id, livestream_id, req.word, now())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ModerateResponse {
            word_id: added.word_id,
        }),
    ))
}

async fn list_banned_words(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(livestream_id): Path<String>,
) -> AppResult<Json<Vec<BannedWord>>> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let words = state
        .storage
        .run(move |conn| queries::banned_words_registered_by(conn, user.id, livestream_id))
        .await?;
    Ok(Json(words))
}

/// Reports filed against the caller's own livestream.
async fn list_reports(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(livestream_id): Path<String>,
) -> AppResult<Json<Vec<ReportView>>> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();

    let views = state
        .storage
        .run(move |conn| {
            let livestream = queries::livestream_by_id(conn, livestream_id)?
                .ok_or_else(|| AppError::NotFound("livestream not found".into()))?;
            if livestream.user_id != user.id {
                return Err(AppError::PermissionDenied(
                    "can't get other streamer's livecomment reports".into(),
                ));
            }
            let reports = queries::reports_for(conn, livestream_id)?;
            Renderer::new(conn, &caches, &fallback).reports(reports)
        })
        .await?;
    Ok(Json(views))
}
