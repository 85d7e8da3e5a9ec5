use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::StockDetails;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:symbol/details", get(get_stock_details))
}

pub async fn get_stock_details(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StockDetails>, AppError> {
    info!("GET /stocks/{}/details - Getting trading data and info", symbol);
    let symbol = symbol.trim().to_uppercase();
    let details = state.calculator.stock_details(&[symbol.clone()]).await;
    if details.daily.is_empty() && details.info.is_empty() {
        warn!("No market data available for {}", symbol);
        return Err(AppError::External(format!("No market data available for {}", symbol)));
    }
    Ok(Json(details))
}
