use std::sync::Arc;

use chrono::Utc;
use tokio::net::TcpListener;

use smartfolio::app;
use smartfolio::config::{AppConfig, ProviderKind};
use smartfolio::external::market_data_provider::MarketDataProvider;
use smartfolio::external::mock_provider::MockProvider;
use smartfolio::external::yahoofinance::YahooFinanceProvider;
use smartfolio::logging::{init_logging, LoggingConfig};
use smartfolio::services::market_data_service::MarketDataClient;
use smartfolio::services::portfolio_service::PortfolioCalculator;
use smartfolio::services::rate_limiter::RateLimiter;
use smartfolio::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    let logging = LoggingConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    init_logging(&logging).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let config = AppConfig::from_env().map_err(anyhow::Error::msg)?;
    let catalog = config.strategy_catalog().map_err(anyhow::Error::msg)?;

    let provider: Arc<dyn MarketDataProvider> = match config.provider {
        ProviderKind::Yahoo => {
            tracing::info!("Using market data provider: Yahoo Finance");
            Arc::new(YahooFinanceProvider::new())
        }
        ProviderKind::Mock => {
            tracing::info!("Using market data provider: synthetic mock data");
            let symbols: Vec<&String> = catalog
                .strategies()
                .iter()
                .flat_map(|s| s.symbols.iter())
                .collect();
            Arc::new(MockProvider::synthetic(&symbols, Utc::now().date_naive()))
        }
    };

    let mut client = MarketDataClient::new(provider, config.fetch_policies());
    if let Some(rpm) = config.requests_per_minute {
        tracing::info!("Pacing market data requests at {} per minute", rpm);
        client = client.with_rate_limiter(Arc::new(RateLimiter::new(config.fetch_concurrency, rpm)));
    }

    let calculator = PortfolioCalculator::new(
        client,
        catalog,
        config.min_investment,
        config.fetch_concurrency,
    );
    let state = AppState {
        calculator: Arc::new(calculator),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Smartfolio backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
