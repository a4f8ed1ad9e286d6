use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::extractors::{parse_id, CurrentUser};
use crate::state::AppState;
use crate::stats::{self, LivestreamStatistics, UserStatistics};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/statistics/user/{username}", get(user_statistics))
        .route(
            "/api/statistics/livestream/{livestream_id}",
            get(livestream_statistics),
        )
}

async fn user_statistics(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<UserStatistics>> {
    let stats = state
        .storage
        .run(move |conn| stats::user_statistics(conn, &username))
        .await?;
    Ok(Json(stats))
}

async fn livestream_statistics(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(livestream_id): Path<String>,
) -> AppResult<Json<LivestreamStatistics>> {
    let livestream_id = parse_id(&livestream_id, "livestream_id")?;
    let stats = state
        .storage
        .run(move |conn| stats::livestream_statistics(conn, livestream_id))
        .await?;
    Ok(Json(stats))
}
