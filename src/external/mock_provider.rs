use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::external::market_data_provider::{MarketDataError, MarketDataProvider};
use crate::models::{HistoryWindow, OhlcvBar, Period, StockInfo};

/// In-memory provider. Serves fixed series for tests and synthetic random
/// walks for offline runs. Relative periods are resolved against `as_of`.
#[derive(Debug, Clone)]
pub struct MockProvider {
    as_of: NaiveDate,
    history: HashMap<String, Vec<OhlcvBar>>,
    info: HashMap<String, StockInfo>,
}

impl MockProvider {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            history: HashMap::new(),
            info: HashMap::new(),
        }
    }

    pub fn with_history(mut self, symbol: &str, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        self.history.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_info(mut self, info: StockInfo) -> Self {
        self.info.insert(info.symbol.clone(), info);
        self
    }

    /// One year of weekday bars per symbol, seeded by the symbol so repeated
    /// runs see the same data.
    pub fn synthetic<S: AsRef<str>>(symbols: &[S], as_of: NaiveDate) -> Self {
        symbols.iter().fold(Self::new(as_of), |provider, symbol| {
            let symbol = symbol.as_ref();
            let bars = generate_mock(symbol, as_of, Period::OneYear.calendar_days());
            let last_close = bars.last().map(|b| b.close).unwrap_or(100.0);
            let info = StockInfo {
                symbol: symbol.to_string(),
                market_cap: Some(last_close * 1.0e9),
                forward_pe: Some(20.0),
                dividend_yield: Some(0.01),
                fifty_two_week_high: bars.iter().map(|b| b.high).reduce(f64::max),
                fifty_two_week_low: bars.iter().map(|b| b.low).reduce(f64::min),
                average_volume: Some(
                    bars.iter().map(|b| b.volume).sum::<f64>() / bars.len().max(1) as f64,
                ),
            };
            provider.with_history(symbol, bars).with_info(info)
        })
    }

    fn select(&self, bars: &[OhlcvBar], window: HistoryWindow) -> Vec<OhlcvBar> {
        match window {
            HistoryWindow::Period(Period::OneDay) => bars
                .iter()
                .rev()
                .find(|b| b.date <= self.as_of)
                .cloned()
                .into_iter()
                .collect(),
            HistoryWindow::Period(period) => {
                let from = self.as_of - Duration::days(period.calendar_days());
                bars.iter()
                    .filter(|b| b.date > from && b.date <= self.as_of)
                    .cloned()
                    .collect()
            }
            HistoryWindow::Range { start, end } => bars
                .iter()
                .filter(|b| b.date >= start && b.date < end)
                .cloned()
                .collect(),
        }
    }
}

fn symbol_seed(symbol: &str) -> u64 {
    symbol
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

/// Random-walk daily bars covering `days` calendar days up to `as_of`.
pub fn generate_mock(symbol: &str, as_of: NaiveDate, days: i64) -> Vec<OhlcvBar> {
    let mut rng = StdRng::seed_from_u64(symbol_seed(symbol));
    let mut current = 50.0 + rng.random::<f64>() * 150.0;
    let base_volume = 1.0e6 + rng.random::<f64>() * 9.0e6;

    (0..days)
        .rev()
        .map(|i| as_of - Duration::days(i))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .map(|date| {
            let open = current;
            current *= 1.0 + (rng.random::<f64>() - 0.5) * 0.02;
            let spread = current * rng.random::<f64>() * 0.01;
            let volume = (base_volume * (0.5 + rng.random::<f64>())).round();
            OhlcvBar::new(
                date,
                open,
                open.max(current) + spread,
                open.min(current) - spread,
                current,
                volume,
            )
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        window: HistoryWindow,
    ) -> Result<Vec<OhlcvBar>, MarketDataError> {
        let bars = self.history.get(symbol).ok_or(MarketDataError::NotFound)?;
        Ok(self.select(bars, window))
    }

    async fn fetch_info(&self, symbol: &str) -> Result<StockInfo, MarketDataError> {
        self.info.get(symbol).cloned().ok_or(MarketDataError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily(start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| OhlcvBar::from_close(start + Duration::days(i as i64), *c, 1000.0))
            .collect()
    }

    #[tokio::test]
    async fn one_day_period_returns_latest_bar() {
        let provider = MockProvider::new(date(2024, 3, 10))
            .with_history("AAPL", daily(date(2024, 3, 1), &[1.0, 2.0, 3.0]));

        let bars = provider
            .fetch_history("AAPL", HistoryWindow::Period(Period::OneDay))
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 3.0);
    }

    #[tokio::test]
    async fn range_is_end_exclusive() {
        let provider = MockProvider::new(date(2024, 3, 10))
            .with_history("AAPL", daily(date(2024, 3, 1), &[1.0, 2.0, 3.0, 4.0]));

        let bars = provider
            .fetch_history(
                "AAPL",
                HistoryWindow::Range { start: date(2024, 3, 2), end: date(2024, 3, 4) },
            )
            .await
            .unwrap();
        assert_eq!(bars.iter().map(|b| b.close).collect::<Vec<_>>(), vec![2.0, 3.0]);
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let provider = MockProvider::new(date(2024, 3, 10));
        let err = provider.fetch_info("NOPE").await.unwrap_err();
        assert!(matches!(err, MarketDataError::NotFound));
    }

    #[test]
    fn synthetic_data_is_deterministic_and_skips_weekends() {
        let as_of = date(2024, 6, 28);
        let a = generate_mock("MSFT", as_of, 365);
        let b = generate_mock("MSFT", as_of, 365);
        assert_eq!(a, b);
        assert!(a.len() > 250 && a.len() < 265);
        assert!(a
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(a.iter().all(|bar| bar.low <= bar.close && bar.close <= bar.high));
    }
}
