use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::session;
use crate::db::queries;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::views::{Renderer, UserView};

const BCRYPT_COST: u32 = 10;

/// Names that collide with infrastructure and cannot be registered.
const RESERVED_NAMES: &[&str] = &["pipe"];

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct ThemeRequest {
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub password: String,
    #[serde(default)]
    pub theme: ThemeRequest,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    if req.name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if RESERVED_NAMES.contains(&req.name.as_str()) {
        return Err(AppError::BadRequest(format!(
            "the username '{}' is reserved",
            req.name
        )));
    }
    if req.password.is_empty() {
        return Err(AppError::BadRequest("password must not be empty".into()));
    }
    Ok(())
}

async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

// -- Handlers --

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    validate_registration(&req)?;

    let password = req.password.clone();
    let password_hash = run_blocking(move || {
        bcrypt::hash(password, BCRYPT_COST)
            .map_err(|e| AppError::Internal(format!("failed to hash password: {}", e)))
    })
    .await?;

    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();
    let view = state
        .storage
        .transaction(move |tx| {
            if queries::user_by_name(tx, &req.name)?.is_some() {
                return Err(AppError::BadRequest(format!(
                    "user {} already exists",
                    req.name
                )));
            }
            let id = queries::insert_user(
                tx,
                &req.name,
                &req.display_name,
                &req.description,
                &password_hash,
            )?;
            queries::upsert_theme(tx, id, req.theme.dark_mode)?;

            let user = queries::user_by_id(tx, id)?
                .ok_or_else(|| AppError::Internal("registered user vanished".into()))?;
            Renderer::new(tx, &caches, &fallback).user(user)
        })
        .await?;

    tracing::info!("Registered user {} ({})", view.name, view.id);
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let username = req.username.clone();
    let user = state
        .storage
        .run(move |conn| queries::user_by_name(conn, &username))
        .await?
        .ok_or(AppError::Unauthorized)?;

    let hash = user.password_hash.clone();
    let password = req.password;
    let valid = run_blocking(move || {
        bcrypt::verify(password, &hash)
            .map_err(|e| AppError::Internal(format!("failed to verify password: {}", e)))
    })
    .await?;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    let hours = state.config.auth.session_hours;
    let user_id = user.id;
    let token = state
        .storage
        .transaction(move |tx| {
            session::purge_expired(tx)?;
            session::create_session(tx, user_id, hours)
        })
        .await?;

    tracing::info!("User {} logged in", user.name);
    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&state.config.auth.cookie_name, &token, hours),
        )],
    )
        .into_response())
}

pub async fn me(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<UserView>> {
    let caches = state.caches.clone();
    let fallback = state.fallback_icon.hash.clone();
    let view = state
        .storage
        .run(move |conn| {
            let user = queries::user_by_id(conn, current.id)?
                .ok_or_else(|| AppError::NotFound("user not found".into()))?;
            Renderer::new(conn, &caches, &fallback).user(user)
        })
        .await?;
    Ok(Json(view))
}
