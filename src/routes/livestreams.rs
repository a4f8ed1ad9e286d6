use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_id, CurrentUser};
use crate::routes::now;
use crate::state::AppState;
use crate::views::{LivestreamView, Renderer};

#[derive(Debug, Deserialize)]
pub struct CreateLivestreamRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_at: i64,
    pub end_at: i64,
}

fn validate(req: &CreateLivestreamRequest) -> AppResult<()> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".into()));
    }
    if req.end_at < req.start_at {
        return Err(AppError::BadRequest(
            "end_at must not be earlier than start_at".into(),
        ));
    }
    Ok(())
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/livestream", post(create_livestream))
        .route("/api/livestream/{livestream_id}", get(get_livestream))
        .route("/api/livestream/{livestream_id}/enter", post(enter))
        .route("/api/livestream/{livestream_id}/exit", delete(exit))
}

// --- Handlers ---

async fn create_livestream(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateLivestreamRequest>,
) -> AppResult<(StatusCode, Json<LivestreamView>)> {
    validate(&req)?;

    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();
    let view = state
        .storage
        .transaction(move |tx| {
            let id = queries::insert_livestream(
                tx,
                user.id,
                &req.title,
                &req.description,
                req.start_at,
                req.end_at,
            )?;
            let livestream = queries::livestream_by_id(tx, id)?
                .ok_or_else(|| AppError::Internal("created livestream vanished".into()))?;
            Renderer::new(tx, &caches, &fallback).livestream(livestream)
        })
        .await?;

    tracing::info!("Livestream {} created by {}", view.id, view.owner.name);
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_livestream(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(livestream_id): Path<String>,
) -> AppResult<Json<LivestreamView>> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();
    let view = state
        .storage
        .run(move |conn| {
            let livestream = queries::livestream_by_id(conn, livestream_id)?
                .ok_or_else(|| AppError::NotFound("livestream not found".into()))?;
            Renderer::new(conn, &caches, &fallback).livestream(livestream)
        })
        .await?;
    Ok(Json(view))
}

async fn enter(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(livestream_id): Path<String>,
) -> AppResult<StatusCode> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let created_at = now();
    state
        .storage
        .transaction(move |tx| {
            if queries::livestream_by_id(tx, livestream_id)?.is_none() {
                return Err(AppError::NotFound("livestream not found".into()));
            }
            queries::insert_viewer(tx, user.id, livestream_id, created_at)
        })
        .await?;
    Ok(StatusCode::OK)
}

async fn exit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(livestream_id): Path<String>,
) -> AppResult<StatusCode> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    state
        .storage
        .transaction(move |tx| queries::delete_viewer(tx, user.id, livestream_id))
        .await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, start_at: i64, end_at: i64) -> CreateLivestreamRequest {
        CreateLivestreamRequest {
            title: title.to_string(),
            description: String::new(),
            start_at,
            end_at,
        }
    }

    #[test]
    fn create_validates_title_and_window() {
        assert!(validate(&request("live", 10, 20)).is_ok());
        assert!(validate(&request("live", 10, 10)).is_ok());
        assert!(validate(&request("  ", 10, 20)).is_err());
        assert!(validate(&request("live", 20, 10)).is_err());
    }
}
