// Library exports for tipstream
// This allows integration tests and the binary to share one router

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod moderation;
pub mod ranking;
pub mod routes;
pub mod state;
pub mod stats;
pub mod views;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
