use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::queries;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentResult {
    pub total_tip: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/payment", get(payment))
}

/// Every tip ever posted, including those on comments later hidden.
async fn payment(State(state): State<AppState>) -> AppResult<Json<PaymentResult>> {
    let total_tip = state.storage.run(|conn| queries::total_tip(conn)).await?;
    Ok(Json(PaymentResult { total_tip }))
}
