use async_trait::async_trait;
use thiserror::Error;

use crate::models::{HistoryWindow, OhlcvBar, StockInfo};

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited,
}

impl MarketDataError {
    /// Only rate limiting is worth asking again for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketDataError::RateLimited)
    }
}

/// Black-box source of daily OHLCV series and info snapshots.
///
/// An empty or single-bar series is a valid answer, not an error.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_history(
        &self,
        symbol: &str,
        window: HistoryWindow,
    ) -> Result<Vec<OhlcvBar>, MarketDataError>;

    async fn fetch_info(&self, symbol: &str) -> Result<StockInfo, MarketDataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limit_is_retryable() {
        assert!(MarketDataError::RateLimited.is_retryable());
        assert!(!MarketDataError::NotFound.is_retryable());
        assert!(!MarketDataError::Network("reset".into()).is_retryable());
        assert!(!MarketDataError::Parse("eof".into()).is_retryable());
    }
}
