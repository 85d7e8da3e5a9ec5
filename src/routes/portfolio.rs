use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{PortfolioReport, PortfolioRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/calculate", post(calculate_portfolio))
}

pub async fn calculate_portfolio(
    State(state): State<AppState>,
    Json(request): Json<PortfolioRequest>,
) -> Result<Json<PortfolioReport>, AppError> {
    info!(
        "POST /portfolio/calculate - ${:.2} with {:?} + {:?}",
        request.amount, request.primary_strategy, request.secondary_strategy
    );
    let today = Utc::now().date_naive();
    let report = state
        .calculator
        .calculate(&request, today)
        .await
        .map_err(|e| {
            match &e {
                AppError::Validation(_) | AppError::UnknownStrategy(_) => {
                    warn!("Rejected portfolio request: {}", e)
                }
                AppError::CalculationInProgress => warn!("{}", e),
                _ => error!("Portfolio calculation failed: {}", e),
            }
            e
        })?;
    Ok(Json(report))
}
