use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::external::market_data_provider::MarketDataProvider;
use crate::models::{HistoryWindow, OhlcvBar, Period, StockInfo};
use crate::services::rate_limiter::{RateLimitGuard, RateLimiter};
use crate::services::retry::{fetch_with_retry, RetryPolicy};

/// Retry policies per fetch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicies {
    /// Info snapshots, yearly history and the detail tables.
    pub info: RetryPolicy,
    /// Current price and valuation history.
    pub price: RetryPolicy,
}

impl Default for FetchPolicies {
    fn default() -> Self {
        Self {
            info: RetryPolicy::info(),
            price: RetryPolicy::price(),
        }
    }
}

/// Market data access for one calculation. Every lookup either yields data
/// or `None`; provider failures never escape as errors.
#[derive(Clone)]
pub struct MarketDataClient {
    provider: Arc<dyn MarketDataProvider>,
    policies: FetchPolicies,
    limiter: Option<Arc<RateLimiter>>,
}

impl MarketDataClient {
    pub fn new(provider: Arc<dyn MarketDataProvider>, policies: FetchPolicies) -> Self {
        Self {
            provider,
            policies,
            limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn policies(&self) -> &FetchPolicies {
        &self.policies
    }

    async fn history(
        &self,
        policy: &RetryPolicy,
        symbol: &str,
        window: HistoryWindow,
    ) -> Option<Vec<OhlcvBar>> {
        let what = format!("{} history ({})", symbol, window);
        let bars = fetch_with_retry(policy, &what, || async move {
            let _guard = self.pace().await;
            self.provider.fetch_history(symbol, window).await
        })
        .await?;
        debug!("Fetched {} bars for {}", bars.len(), what);
        Some(bars)
    }

    async fn pace(&self) -> Option<RateLimitGuard> {
        match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await),
            None => None,
        }
    }

    pub async fn stock_info(&self, symbol: &str) -> Option<StockInfo> {
        let what = format!("{} info", symbol);
        fetch_with_retry(&self.policies.info, &what, || async move {
            let _guard = self.pace().await;
            self.provider.fetch_info(symbol).await
        })
        .await
    }

    /// One year of daily bars, the input of the metric calculator.
    pub async fn yearly_history(&self, symbol: &str) -> Option<Vec<OhlcvBar>> {
        self.history(&self.policies.info, symbol, HistoryWindow::Period(Period::OneYear))
            .await
    }

    /// Last five trading days, for the detail tables.
    pub async fn recent_history(&self, symbol: &str) -> Option<Vec<OhlcvBar>> {
        self.history(&self.policies.info, symbol, HistoryWindow::Period(Period::FiveDays))
            .await
    }

    /// Bars in `[start, end)`, for the valuation series.
    pub async fn history_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Vec<OhlcvBar>> {
        self.history(&self.policies.price, symbol, HistoryWindow::Range { start, end })
            .await
    }

    /// Most recent close in a one-day window.
    pub async fn current_price(&self, symbol: &str) -> Option<f64> {
        let bars = self
            .history(&self.policies.price, symbol, HistoryWindow::Period(Period::OneDay))
            .await?;
        match bars.last() {
            Some(bar) => Some(bar.close),
            None => {
                warn!("Empty one-day window for {}, no current price", symbol);
                None
            }
        }
    }
}
