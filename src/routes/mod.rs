pub mod auth;
pub mod livecomments;
pub mod livestreams;
pub mod moderation;
pub mod payment;
pub mod reactions;
pub mod statistics;
pub mod tags;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(livestreams::router())
        .merge(livecomments::router())
        .merge(reactions::router())
        .merge(moderation::router())
        .merge(statistics::router())
        .merge(payment::router())
        .merge(tags::router())
}

/// Current wall-clock time in unix seconds.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
