use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a symbol. Providers leave fields they
/// cannot supply as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    pub symbol: String,
    pub market_cap: Option<f64>,
    pub forward_pe: Option<f64>,
    /// Fraction, e.g. 0.005 for 0.5%
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub average_volume: Option<f64>,
}
