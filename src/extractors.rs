use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?
            .to_string();

        state
            .storage
            .run(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT u.id, u.name FROM sessions s \
                         JOIN users u ON u.id = s.user_id \
                         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                        params![token],
                        |row| {
                            Ok(CurrentUser {
                                id: row.get(0)?,
                                name: row.get(1)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

pub fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}

/// Parses a numeric path segment, naming it in the error.
pub fn parse_id(raw: &str, name: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("{} in path must be integer", name)))
}

/// `?limit=N` on list endpoints. Kept as a string so a malformed value is a
/// 400 with our error body instead of axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

impl LimitQuery {
    pub fn parse(&self) -> AppResult<Option<u32>> {
        match self.limit.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<u32>()
                .map(Some)
                .map_err(|_| AppError::BadRequest("limit query parameter must be integer".into())),
        }
    }
}
