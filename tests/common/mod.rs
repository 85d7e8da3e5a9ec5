#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use smartfolio::external::market_data_provider::{MarketDataError, MarketDataProvider};
use smartfolio::external::mock_provider::MockProvider;
use smartfolio::models::{HistoryWindow, OhlcvBar, StockInfo, StrategyCatalog};
use smartfolio::services::market_data_service::{FetchPolicies, MarketDataClient};
use smartfolio::services::portfolio_service::PortfolioCalculator;
use tokio::sync::{Notify, Semaphore};

pub const BARS_PER_YEAR: usize = 252;

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

/// Daily bars ending at `as_of()`, closes moving linearly from `first` to
/// `last`. Volumes alternate 900k / 1.1M so every fixture has the same
/// volume trend.
pub fn linear_series(first: f64, last: f64) -> Vec<OhlcvBar> {
    let n = BARS_PER_YEAR;
    let start = as_of() - Duration::days(n as i64 - 1);
    (0..n)
        .map(|i| {
            let close = first + (last - first) * i as f64 / (n - 1) as f64;
            let volume = if i % 2 == 0 { 900_000.0 } else { 1_100_000.0 };
            OhlcvBar::from_close(start + Duration::days(i as i64), close, volume)
        })
        .collect()
}

pub fn info(symbol: &str) -> StockInfo {
    StockInfo {
        symbol: symbol.to_string(),
        market_cap: Some(1.0e11),
        forward_pe: Some(22.0),
        dividend_yield: Some(0.01),
        fifty_two_week_high: Some(110.0),
        fifty_two_week_low: Some(90.0),
        average_volume: Some(1.0e6),
    }
}

/// AAPL +5%, ADBE flat, NSRGY -2% over the year.
pub fn ethical_provider() -> MockProvider {
    MockProvider::new(as_of())
        .with_history("AAPL", linear_series(100.0, 105.0))
        .with_history("ADBE", linear_series(100.0, 100.0))
        .with_history("NSRGY", linear_series(100.0, 98.0))
        .with_info(info("AAPL"))
        .with_info(info("ADBE"))
        .with_info(info("NSRGY"))
}

pub fn calculator_with(provider: Arc<dyn MarketDataProvider>, catalog: StrategyCatalog) -> PortfolioCalculator {
    let client = MarketDataClient::new(provider, FetchPolicies::default());
    PortfolioCalculator::new(client, catalog, 5000.0, 1)
}

/// Counts every provider call before delegating.
pub struct CountingProvider<P> {
    pub inner: P,
    pub calls: AtomicUsize,
}

impl<P> CountingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CountingProvider<P> {
    async fn fetch_history(
        &self,
        symbol: &str,
        window: HistoryWindow,
    ) -> Result<Vec<OhlcvBar>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_history(symbol, window).await
    }

    async fn fetch_info(&self, symbol: &str) -> Result<StockInfo, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_info(symbol).await
    }
}

/// Always rate limited.
pub struct ThrottledProvider;

#[async_trait]
impl MarketDataProvider for ThrottledProvider {
    async fn fetch_history(
        &self,
        _symbol: &str,
        _window: HistoryWindow,
    ) -> Result<Vec<OhlcvBar>, MarketDataError> {
        Err(MarketDataError::RateLimited)
    }

    async fn fetch_info(&self, _symbol: &str) -> Result<StockInfo, MarketDataError> {
        Err(MarketDataError::RateLimited)
    }
}

/// Holds every request until `open()` is called.
pub struct GatedProvider {
    pub inner: MockProvider,
    pub entered: Notify,
    gate: Semaphore,
}

impl GatedProvider {
    pub fn new(inner: MockProvider) -> Self {
        Self { inner, entered: Notify::new(), gate: Semaphore::new(0) }
    }

    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    async fn wait(&self) {
        self.entered.notify_one();
        let _permit = self.gate.acquire().await;
    }
}

#[async_trait]
impl MarketDataProvider for GatedProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        window: HistoryWindow,
    ) -> Result<Vec<OhlcvBar>, MarketDataError> {
        self.wait().await;
        self.inner.fetch_history(symbol, window).await
    }

    async fn fetch_info(&self, symbol: &str) -> Result<StockInfo, MarketDataError> {
        self.wait().await;
        self.inner.fetch_info(symbol).await
    }
}
