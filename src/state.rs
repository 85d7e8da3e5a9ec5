use std::sync::Arc;
use crate::services::portfolio_service::PortfolioCalculator;

#[derive(Clone)]
pub struct AppState {
    pub calculator: Arc<PortfolioCalculator>,
}
