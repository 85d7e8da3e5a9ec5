pub mod market_data_provider;
pub mod mock_provider;
pub mod yahoofinance;
