use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::models::{Allocation, SymbolAllocation, SymbolScore};
use crate::services::market_data_service::MarketDataClient;
use crate::services::metrics_service;

/// Split `total_amount` proportionally to the scores.
///
/// One entry per score, in order; duplicate symbols are separate entries.
/// Scores are expected to be positive (the metric floor guarantees it). If
/// they sum to zero or less, or are not finite, the amount is split evenly.
pub fn allocate_by_scores(scores: &[SymbolScore], total_amount: f64) -> Allocation {
    let total_score: f64 = scores.iter().map(|s| s.score).sum();
    let proportional = total_score > 0.0 && total_score.is_finite();
    if !proportional && !scores.is_empty() {
        warn!("Total score {} is not usable, splitting {} evenly", total_score, total_amount);
    }

    let entries = scores
        .iter()
        .map(|s| {
            let weight = if proportional {
                s.score / total_score
            } else {
                1.0 / scores.len() as f64
            };
            SymbolAllocation {
                symbol: s.symbol.clone(),
                score: s.score,
                amount: weight * total_amount,
            }
        })
        .collect();

    Allocation { total_amount, entries }
}

/// Score every symbol from its yearly history and split `total_amount`.
///
/// Precondition: the caller has validated `total_amount` (minimum investment).
/// Per-symbol data problems only lower that symbol to the floor score.
pub async fn calculate_smart_allocation(
    client: &MarketDataClient,
    symbols: &[String],
    total_amount: f64,
    concurrency: usize,
) -> Allocation {
    let scores: Vec<SymbolScore> = stream::iter(symbols.to_vec())
        .map(|symbol| {
            let client = client.clone();
            async move {
                let score = metrics_service::score_symbol(&client, &symbol).await;
                SymbolScore { symbol, score }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for s in &scores {
        info!("Score for {}: {:.4}", s.symbol, s.score);
    }

    allocate_by_scores(&scores, total_amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(symbol: &str, score: f64) -> SymbolScore {
        SymbolScore { symbol: symbol.to_string(), score }
    }

    #[test]
    fn allocations_sum_to_total() {
        let scores = vec![score("AAPL", 1.7), score("ADBE", 0.1), score("NSRGY", 0.45)];
        let allocation = allocate_by_scores(&scores, 6000.0);
        assert!((allocation.allocated_total() - 6000.0).abs() < 1e-9);
        assert!(allocation.entries.iter().all(|e| e.amount > 0.0));
    }

    #[test]
    fn allocation_is_proportional_to_score() {
        let scores = vec![score("A", 3.0), score("B", 1.0)];
        let allocation = allocate_by_scores(&scores, 10_000.0);
        assert!((allocation.entries[0].amount - 7500.0).abs() < 1e-9);
        assert!((allocation.entries[1].amount - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn duplicates_are_separate_entries() {
        let scores = vec![score("AAPL", 1.0), score("MSFT", 1.0), score("AAPL", 1.0)];
        let allocation = allocate_by_scores(&scores, 9000.0);
        assert_eq!(allocation.len(), 3);
        assert_eq!(
            allocation.entries.iter().filter(|e| e.symbol == "AAPL").count(),
            2
        );
        assert!((allocation.allocated_total() - 9000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_score_splits_evenly() {
        let scores = vec![score("A", 0.0), score("B", 0.0)];
        let allocation = allocate_by_scores(&scores, 5000.0);
        assert_eq!(allocation.entries[0].amount, 2500.0);
        assert_eq!(allocation.entries[1].amount, 2500.0);
    }

    #[test]
    fn no_symbols_no_entries() {
        let allocation = allocate_by_scores(&[], 5000.0);
        assert!(allocation.is_empty());
        assert_eq!(allocation.total_amount, 5000.0);
    }

    #[test]
    fn same_scores_same_allocation() {
        let scores = vec![score("A", 0.7), score("B", 2.2)];
        assert_eq!(allocate_by_scores(&scores, 7000.0), allocate_by_scores(&scores, 7000.0));
    }
}
