use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::ohlcv::{closes, volumes};
use crate::models::OhlcvBar;
use crate::services::market_data_service::MarketDataClient;

/// Lowest score any symbol can get, so every symbol keeps a share of the allocation.
pub const FLOOR_SCORE: f64 = 0.1;

const SHARPE_WEIGHT: f64 = 0.3;
const ROI_WEIGHT: f64 = 0.3;
const AVG_RETURN_WEIGHT: f64 = 0.2;
const VOLUME_TREND_WEIGHT: f64 = 0.2;

/// Raw metrics for one symbol's yearly series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetrics {
    /// Mean day-over-day percentage change (as a fraction)
    pub avg_return: f64,
    /// Sample standard deviation of day-over-day change
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// (last close - first close) / first close
    pub roi: f64,
    /// mean(volume) / stddev(volume)
    pub volume_trend: f64,
    /// Weighted composite, before the floor is applied
    pub score: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("insufficient data: {observations} closing prices, need at least 2")]
    InsufficientData { observations: usize },

    #[error("non-finite {0}")]
    NonFinite(&'static str),
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; 0 for fewer than two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    variance.sqrt()
}

fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn finite(value: f64, name: &'static str) -> Result<f64, MetricsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MetricsError::NonFinite(name))
    }
}

/// Day-over-day percentage change of consecutive closes.
pub fn pct_change(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

pub fn compute_metrics(bars: &[OhlcvBar]) -> Result<SymbolMetrics, MetricsError> {
    let prices = closes(bars);
    if prices.len() < 2 {
        return Err(MetricsError::InsufficientData { observations: prices.len() });
    }

    let returns = pct_change(&prices);
    let avg_return = finite(mean(&returns), "average return")?;
    let volatility = finite(sample_std(&returns), "volatility")?;
    let sharpe_ratio = ratio_or_zero(avg_return, volatility);

    let first = prices[0];
    let last = prices[prices.len() - 1];
    let roi = finite((last - first) / first, "roi")?;

    let vols = volumes(bars);
    let volume_trend = finite(ratio_or_zero(mean(&vols), sample_std(&vols)), "volume trend")?;

    let score = finite(
        SHARPE_WEIGHT * sharpe_ratio
            + ROI_WEIGHT * roi
            + AVG_RETURN_WEIGHT * avg_return
            + VOLUME_TREND_WEIGHT * volume_trend,
        "score",
    )?;

    Ok(SymbolMetrics {
        avg_return,
        volatility,
        sharpe_ratio,
        roi,
        volume_trend,
        score,
    })
}

/// Composite score with the floor applied. Never fails: anything that goes
/// wrong for a symbol yields `FLOOR_SCORE`.
pub fn composite_score(symbol: &str, bars: &[OhlcvBar]) -> f64 {
    match compute_metrics(bars) {
        Ok(metrics) => metrics.score.max(FLOOR_SCORE),
        Err(e) => {
            warn!("Using floor score for {}: {}", symbol, e);
            FLOOR_SCORE
        }
    }
}

/// Fetch a year of history for `symbol` and score it.
pub async fn score_symbol(client: &MarketDataClient, symbol: &str) -> f64 {
    match client.yearly_history(symbol).await {
        Some(bars) => composite_score(symbol, &bars),
        None => {
            warn!("No yearly history for {}, using floor score", symbol);
            FLOOR_SCORE
        }
    }
}
