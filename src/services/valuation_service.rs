use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::models::{Allocation, OhlcvBar, PortfolioValuePoint, Position, Valuation};
use crate::services::market_data_service::MarketDataClient;

/// Calendar days covered by the portfolio value series, `as_of` included.
pub const TRAILING_DAYS: i64 = 5;

/// Half-open fetch bounds for the value series: the `TRAILING_DAYS` calendar
/// days ending on `as_of`.
pub fn trailing_window(as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
    (as_of - Duration::days(TRAILING_DAYS - 1), as_of + Duration::days(1))
}

/// Turn allocation entries and their current prices into positions.
///
/// `prices[i]` belongs to `allocation.entries[i]`. Entries without a usable
/// price are skipped and their symbol returned in the second vector; their
/// amount is not redistributed.
pub fn build_positions(allocation: &Allocation, prices: &[Option<f64>]) -> (Vec<Position>, Vec<String>) {
    let mut positions = Vec::with_capacity(allocation.entries.len());
    let mut skipped = Vec::new();

    for (entry, price) in allocation.entries.iter().zip(prices) {
        let current_price = match price {
            Some(p) if p.is_finite() && *p > 0.0 => *p,
            _ => {
                warn!("No usable current price for {}, skipping", entry.symbol);
                skipped.push(entry.symbol.clone());
                continue;
            }
        };

        let shares = entry.amount / current_price;
        let allocation_percentage = if allocation.total_amount != 0.0 {
            entry.amount / allocation.total_amount * 100.0
        } else {
            0.0
        };

        positions.push(Position {
            symbol: entry.symbol.clone(),
            allocated_amount: entry.amount,
            shares,
            current_price,
            value: shares * current_price,
            allocation_percentage,
        });
    }

    (positions, skipped)
}

/// Sum `shares * close` per date across holdings. A holding with no bar on a
/// date adds nothing to that date.
pub fn aggregate_history(holdings: &[(f64, Vec<OhlcvBar>)]) -> Vec<PortfolioValuePoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (shares, bars) in holdings {
        for bar in bars {
            *by_date.entry(bar.date).or_insert(0.0) += bar.close * shares;
        }
    }
    by_date
        .into_iter()
        .map(|(date, value)| PortfolioValuePoint { date, value })
        .collect()
}

/// Price the allocation and build its trailing value series ending at `as_of`.
pub async fn value_allocation(
    client: &MarketDataClient,
    allocation: &Allocation,
    as_of: NaiveDate,
    concurrency: usize,
) -> Valuation {
    let concurrency = concurrency.max(1);

    let prices: Vec<Option<f64>> = stream::iter(allocation.entries.clone())
        .map(|entry| {
            let client = client.clone();
            async move { client.current_price(&entry.symbol).await }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let (positions, skipped) = build_positions(allocation, &prices);

    let (start, end) = trailing_window(as_of);
    let holdings: Vec<(f64, Vec<OhlcvBar>)> = stream::iter(positions.clone())
        .map(|position| {
            let client = client.clone();
            async move {
                let bars = client
                    .history_between(&position.symbol, start, end)
                    .await
                    .unwrap_or_else(|| {
                        warn!("No recent history for {}, excluded from value series", position.symbol);
                        Vec::new()
                    });
                (position.shares, bars)
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let history = aggregate_history(&holdings);

    info!(
        "Valued {} of {} positions, {} history points",
        positions.len(),
        allocation.entries.len(),
        history.len()
    );

    Valuation {
        positions,
        skipped,
        history,
    }
}
