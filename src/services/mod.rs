pub mod allocation_service;
pub mod market_data_service;
pub mod metrics_service;
pub mod portfolio_service;
pub mod rate_limiter;
pub mod retry;
pub mod valuation_service;
