use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::models::Strategy;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_strategies))
}

pub async fn list_strategies(State(state): State<AppState>) -> Json<Vec<Strategy>> {
    info!("GET /strategies - Listing strategy catalog");
    Json(state.calculator.catalog().strategies().to_vec())
}
