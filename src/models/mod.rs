pub mod allocation;
pub mod ohlcv;
pub mod portfolio;
pub mod stock_info;
pub mod strategy;

pub use allocation::{Allocation, SymbolAllocation, SymbolScore};
pub use ohlcv::{HistoryWindow, OhlcvBar, Period};
pub use portfolio::{
    DailyRow, PieSlice, PortfolioReport, PortfolioRequest, PortfolioSummary,
    PortfolioValuePoint, Position, StockDetails, Valuation,
};
pub use stock_info::StockInfo;
pub use strategy::{Strategy, StrategyCatalog};
