use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::allocation::SymbolScore;
use crate::models::ohlcv::OhlcvBar;
use crate::models::stock_info::StockInfo;

/// A valued holding derived from an allocation entry. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub allocated_amount: f64,
    pub shares: f64,
    pub current_price: f64,
    pub value: f64,
    pub allocation_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Result of valuing an allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub positions: Vec<Position>,
    /// Symbols dropped because no current price was available.
    pub skipped: Vec<String>,
    pub history: Vec<PortfolioValuePoint>,
}

impl Valuation {
    pub fn total_value(&self) -> f64 {
        self.positions.iter().map(|p| p.value).sum()
    }

    pub fn valued_amount(&self) -> f64 {
        self.positions.iter().map(|p| p.allocated_amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub requested_amount: f64,
    pub total_value: f64,
    /// Requested amount that did not end up in any valued position.
    pub unvalued_amount: f64,
    pub skipped_symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub symbol: String,
    #[serde(flatten)]
    pub bar: OhlcvBar,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockDetails {
    pub daily: Vec<DailyRow>,
    pub info: Vec<StockInfo>,
}

/// Everything the presentation layer needs after one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub calculation_id: Uuid,
    pub as_of: NaiveDate,
    pub symbols: Vec<String>,
    pub scores: Vec<SymbolScore>,
    pub positions: Vec<Position>,
    pub summary: PortfolioSummary,
    pub pie: Vec<PieSlice>,
    pub history: Vec<PortfolioValuePoint>,
    pub details: StockDetails,
}

/// Body of a calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub amount: f64,
    pub primary_strategy: Option<String>,
    pub secondary_strategy: Option<String>,
}
