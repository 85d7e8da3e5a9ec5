use crate::external::market_data_provider::{MarketDataError, MarketDataProvider};
use crate::models::{HistoryWindow, OhlcvBar, StockInfo};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

/// Yahoo Finance provider - no API key required.
pub struct YahooFinanceProvider {
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; Smartfolio/0.1)")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response, MarketDataError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::NotFound);
        }
        if !status.is_success() {
            return Err(MarketDataError::BadResponse(format!("HTTP {}", status)));
        }
        Ok(resp)
    }

    async fn quote_info(&self, symbol: &str) -> Result<StockInfo, MarketDataError> {
        let body: YahooQuoteResponse = self
            .get(QUOTE_URL, &[("symbols", symbol.to_string())])
            .await?
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        let snapshot = body
            .quote_response
            .result
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .ok_or(MarketDataError::NotFound)?;

        Ok(StockInfo {
            symbol: symbol.to_string(),
            market_cap: snapshot.market_cap,
            forward_pe: snapshot.forward_pe,
            dividend_yield: snapshot.trailing_annual_dividend_yield,
            fifty_two_week_high: snapshot.fifty_two_week_high,
            fifty_two_week_low: snapshot.fifty_two_week_low,
            average_volume: snapshot.average_daily_volume3_month,
        })
    }

    async fn chart_info(&self, symbol: &str) -> Result<StockInfo, MarketDataError> {
        let url = format!("{}/{}", CHART_URL, symbol);
        let query = [("interval", "1d".to_string()), ("range", "3mo".to_string())];
        let body: YahooChartResponse = self
            .get(&url, &query)
            .await?
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        info_from_chart(symbol, body)
    }
}

impl Default for YahooFinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    #[serde(default)]
    meta: YahooMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteResponse {
    quote_response: YahooQuoteResult,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResult {
    result: Vec<YahooQuoteSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteSnapshot {
    symbol: String,
    market_cap: Option<f64>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<f64>,
    trailing_annual_dividend_yield: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    average_daily_volume3_month: Option<f64>,
}

fn window_query(window: HistoryWindow) -> Vec<(&'static str, String)> {
    let mut query = vec![("interval", "1d".to_string())];
    match window {
        HistoryWindow::Period(period) => query.push(("range", period.as_range().to_string())),
        HistoryWindow::Range { start, end } => {
            query.push(("period1", unix_midnight(start).to_string()));
            query.push(("period2", unix_midnight(end).to_string()));
        }
    }
    query
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn chart_result(body: YahooChartResponse) -> Result<YahooResult, MarketDataError> {
    if let Some(error) = body.chart.error {
        if error.description.contains("No data found") {
            return Err(MarketDataError::NotFound);
        }
        return Err(MarketDataError::BadResponse(error.description));
    }

    body.chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or(MarketDataError::NotFound)
}

fn parse_chart(body: YahooChartResponse) -> Result<Vec<OhlcvBar>, MarketDataError> {
    bars_from(chart_result(body)?)
}

/// Reduced info snapshot from a chart response: 52-week range from `meta`,
/// average volume over the returned bars. Valuation fields stay empty.
fn info_from_chart(symbol: &str, body: YahooChartResponse) -> Result<StockInfo, MarketDataError> {
    let mut result = chart_result(body)?;
    let meta = std::mem::take(&mut result.meta);
    let bars = bars_from(result)?;
    let average_volume = if bars.is_empty() {
        None
    } else {
        Some(bars.iter().map(|b| b.volume).sum::<f64>() / bars.len() as f64)
    };

    Ok(StockInfo {
        symbol: symbol.to_string(),
        market_cap: None,
        forward_pe: None,
        dividend_yield: None,
        fifty_two_week_high: meta.fifty_two_week_high,
        fifty_two_week_low: meta.fifty_two_week_low,
        average_volume,
    })
}

fn bars_from(result: YahooResult) -> Result<Vec<OhlcvBar>, MarketDataError> {
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    if quote.close.len() != result.timestamp.len() && !result.timestamp.is_empty() {
        return Err(MarketDataError::Parse(
            "Timestamp and close price arrays have different lengths".into(),
        ));
    }

    let field = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let mut bars: Vec<OhlcvBar> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            // Skip null rows (market holidays, halted sessions)
            let close = field(&quote.close, i)?;
            let date = chrono::DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(OhlcvBar {
                date,
                open: field(&quote.open, i).unwrap_or(close),
                high: field(&quote.high, i).unwrap_or(close),
                low: field(&quote.low, i).unwrap_or(close),
                close,
                volume: field(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();

    bars.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(bars)
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        window: HistoryWindow,
    ) -> Result<Vec<OhlcvBar>, MarketDataError> {
        let url = format!("{}/{}", CHART_URL, symbol);
        let body: YahooChartResponse = self
            .get(&url, &window_query(window))
            .await?
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        parse_chart(body)
    }

    async fn fetch_info(&self, symbol: &str) -> Result<StockInfo, MarketDataError> {
        match self.quote_info(symbol).await {
            // The quote endpoint often rejects requests without a session crumb
            Err(MarketDataError::BadResponse(reason)) => {
                debug!("Quote lookup for {} rejected ({}), using chart metadata", symbol, reason);
                self.chart_info(symbol).await
            }
            other => other,
        }
    }
}
