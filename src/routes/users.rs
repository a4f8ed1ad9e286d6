use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::cache::icon_hash;
use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::views::{Renderer, ThemeView, UserView};

// --- Request/Response types ---

#[derive(Debug, Deserialize)]
pub struct PostIconRequest {
    /// Base64-encoded image bytes
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct PostIconResponse {
    pub id: i64,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/user/{username}", get(get_user))
        .route("/api/user/{username}/theme", get(get_theme))
        .route("/api/user/{username}/icon", get(get_icon))
        .route("/api/icon", post(post_icon))
}

// --- Handlers ---

async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<UserView>> {
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();
    let view = state
        .storage
        .run(move |conn| {
            let user = queries::user_by_name(conn, &username)?
                .ok_or_else(|| AppError::NotFound("user not found".into()))?;
            Renderer::new(conn, &caches, &fallback).user(user)
        })
        .await?;
    Ok(Json(view))
}

async fn get_theme(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<ThemeView>> {
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();
    let theme = state
        .storage
        .run(move |conn| {
            let user = queries::user_by_name(conn, &username)?
                .ok_or_else(|| AppError::NotFound("user not found".into()))?;
            let modes = Renderer::new(conn, &caches, &fallback).dark_modes(&[user.id])?;
            Ok(ThemeView {
                id: user.id,
                dark_mode: modes.get(&user.id).copied().unwrap_or(false),
            })
        })
        .await?;
    Ok(Json(theme))
}

/// `If-None-Match` value without surrounding quotes or a weak prefix.
fn requested_etag(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::IF_NONE_MATCH)?.to_str().ok()?.trim();
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    Some(raw.trim_matches('"'))
}

fn not_modified(hash: &str) -> Response {
    (
        StatusCode::NOT_MODIFIED,
        [(header::ETAG, format!("\"{}\"", hash))],
    )
        .into_response()
}

async fn get_icon(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let requested = requested_etag(&headers).map(str::to_string);

    // A cached digest answers a conditional request without touching storage
    if let (Some(requested), Some(cached)) =
        (&requested, state.caches.icon_hashes.get(&username))
    {
        if *requested == cached {
            return Ok(not_modified(&cached));
        }
    }

    let name = username.clone();
    let image = state
        .storage
        .run(move |conn| {
            let user = queries::user_by_name(conn, &name)?
                .ok_or_else(|| AppError::NotFound("user not found".into()))?;
            queries::icon_image(conn, user.id)
        })
        .await?;

    let (image, hash) = match image {
        Some(image) => {
            let hash = icon_hash(&image);
            // The upload handler owns freshness; only fill an empty slot
            state.caches.icon_hashes.set_if_absent(username, hash.clone());
            (Bytes::from(image), hash)
        }
        None => {
            let fallback = state.fallback_icon.clone();
            let image = fallback
                .image
                .ok_or_else(|| AppError::NotFound("icon not found".into()))?;
            (image, fallback.hash)
        }
    };

    if requested.as_deref() == Some(hash.as_str()) {
        return Ok(not_modified(&hash));
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::ETAG, format!("\"{}\"", hash)),
        ],
        image,
    )
        .into_response())
}

async fn post_icon(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PostIconRequest>,
) -> AppResult<(StatusCode, Json<PostIconResponse>)> {
    let image = base64::engine::general_purpose::STANDARD
        .decode(req.image.as_bytes())
        .map_err(|_| AppError::BadRequest("image must be base64 encoded".into()))?;
    let hash = icon_hash(&image);

    let user_id = user.id;
    let id = state
        .storage
        .transaction(move |tx| queries::replace_icon(tx, user_id, &image))
        .await?;

    state.caches.icon_hashes.set(user.name.clone(), hash);
    tracing::info!("User {} uploaded icon {}", user.name, id);
    Ok((StatusCode::CREATED, Json(PostIconResponse { id })))
}
