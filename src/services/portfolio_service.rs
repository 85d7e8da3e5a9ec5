use std::panic::AssertUnwindSafe;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Allocation, DailyRow, PieSlice, PortfolioReport, PortfolioRequest, PortfolioSummary,
    StockDetails, StrategyCatalog, SymbolScore, Valuation,
};
use crate::services::allocation_service;
use crate::services::market_data_service::MarketDataClient;
use crate::services::valuation_service;

fn selected(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

/// Runs portfolio calculations, one at a time.
pub struct PortfolioCalculator {
    client: MarketDataClient,
    catalog: StrategyCatalog,
    min_investment: f64,
    concurrency: usize,
    in_flight: Mutex<()>,
}

impl PortfolioCalculator {
    pub fn new(
        client: MarketDataClient,
        catalog: StrategyCatalog,
        min_investment: f64,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            catalog,
            min_investment,
            concurrency: concurrency.max(1),
            in_flight: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn validate_amount(&self, amount: f64) -> Result<(), AppError> {
        if !amount.is_finite() {
            return Err(AppError::Validation("Please enter a valid investment amount".into()));
        }
        if amount < self.min_investment {
            return Err(AppError::Validation(format!(
                "Minimum investment amount is ${:.0}",
                self.min_investment
            )));
        }
        Ok(())
    }

    /// Symbols of the selected strategies, primary first. Symbols shared by
    /// both strategies appear twice.
    pub fn resolve_symbols(
        &self,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) -> Result<Vec<String>, AppError> {
        let primary = selected(primary)
            .ok_or_else(|| AppError::Validation("Please select at least one strategy".into()))?;

        let mut symbols = Vec::new();
        for name in std::iter::once(primary).chain(selected(secondary)) {
            let strategy_symbols = self
                .catalog
                .symbols_for(name)
                .ok_or_else(|| AppError::UnknownStrategy(name.to_string()))?;
            symbols.extend(strategy_symbols.iter().cloned());
        }
        Ok(symbols)
    }

    /// Validate, allocate, value and describe a portfolio as of `as_of`.
    ///
    /// Fails fast with `CalculationInProgress` while another calculation runs.
    pub async fn calculate(
        &self,
        request: &PortfolioRequest,
        as_of: NaiveDate,
    ) -> Result<PortfolioReport, AppError> {
        self.validate_amount(request.amount)?;
        let symbols = self.resolve_symbols(
            request.primary_strategy.as_deref(),
            request.secondary_strategy.as_deref(),
        )?;

        let _guard = self.in_flight.try_lock().map_err(|_| {
            warn!("Rejected calculation request, another one is running");
            AppError::CalculationInProgress
        })?;

        let calculation_id = Uuid::new_v4();
        let span = info_span!("calculation", id = %calculation_id);

        AssertUnwindSafe(self.run(calculation_id, symbols, request.amount, as_of))
            .catch_unwind()
            .instrument(span)
            .await
            .map_err(|_| {
                error!("Portfolio calculation {} panicked", calculation_id);
                AppError::Internal("An unexpected error occurred during the calculation".into())
            })
    }

    async fn run(
        &self,
        calculation_id: Uuid,
        symbols: Vec<String>,
        amount: f64,
        as_of: NaiveDate,
    ) -> PortfolioReport {
        info!("Calculating portfolio of ${:.2} across {:?}", amount, symbols);

        let allocation = allocation_service::calculate_smart_allocation(
            &self.client,
            &symbols,
            amount,
            self.concurrency,
        )
        .await;

        let valuation =
            valuation_service::value_allocation(&self.client, &allocation, as_of, self.concurrency)
                .await;

        let details = self.stock_details(&symbols).await;

        build_report(calculation_id, as_of, symbols, &allocation, valuation, details)
    }

    /// Last five trading days and an info snapshot per distinct symbol.
    /// Symbols whose lookups fail are left out.
    pub async fn stock_details(&self, symbols: &[String]) -> StockDetails {
        let mut distinct: Vec<String> = Vec::new();
        for s in symbols {
            if !distinct.contains(s) {
                distinct.push(s.clone());
            }
        }

        let fetched: Vec<_> = stream::iter(distinct)
            .map(|symbol| {
                let client = self.client.clone();
                async move {
                    let bars = client.recent_history(&symbol).await;
                    let info = client.stock_info(&symbol).await;
                    (symbol, bars, info)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut details = StockDetails::default();
        for (symbol, bars, info) in fetched {
            match bars {
                Some(bars) => details.daily.extend(
                    bars.into_iter().map(|bar| DailyRow { symbol: symbol.clone(), bar }),
                ),
                None => warn!("No recent trading data for {}", symbol),
            }
            match info {
                Some(info) => details.info.push(info),
                None => warn!("No stock info for {}", symbol),
            }
        }
        details
    }
}

/// Assemble presentation data from the calculation results.
pub fn build_report(
    calculation_id: Uuid,
    as_of: NaiveDate,
    symbols: Vec<String>,
    allocation: &Allocation,
    valuation: Valuation,
    details: StockDetails,
) -> PortfolioReport {
    let total_value = valuation.total_value();
    let summary = PortfolioSummary {
        requested_amount: allocation.total_amount,
        total_value,
        unvalued_amount: allocation.total_amount - valuation.valued_amount(),
        skipped_symbols: valuation.skipped.clone(),
    };

    let pie = valuation
        .positions
        .iter()
        .map(|p| PieSlice {
            label: p.symbol.clone(),
            value: p.value,
            percentage: p.allocation_percentage,
        })
        .collect();

    let scores = allocation
        .entries
        .iter()
        .map(|e| SymbolScore { symbol: e.symbol.clone(), score: e.score })
        .collect();

    PortfolioReport {
        calculation_id,
        as_of,
        symbols,
        scores,
        positions: valuation.positions,
        summary,
        pie,
        history: valuation.history,
        details,
    }
}
