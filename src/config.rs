use std::net::SocketAddr;
use std::str::FromStr;

use tokio::time::Duration;

use crate::models::StrategyCatalog;
use crate::services::market_data_service::FetchPolicies;
use crate::services::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(format!(
                "Invalid MARKET_DATA_PROVIDER: {}. Must be 'yahoo' or 'mock'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub provider: ProviderKind,
    pub min_investment: f64,
    pub fetch_max_attempts: u32,
    pub info_retry_delay: Duration,
    pub price_retry_delay: Duration,
    pub fetch_concurrency: usize,
    pub requests_per_minute: Option<u32>,
    pub strategy_catalog_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            provider: ProviderKind::Yahoo,
            min_investment: 5000.0,
            fetch_max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            info_retry_delay: RetryPolicy::info().delay,
            price_retry_delay: RetryPolicy::price().delay,
            fetch_concurrency: 1,
            requests_per_minute: None,
            strategy_catalog_path: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, String> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid value for {}: {}", key, raw)),
        _ => Ok(None),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let config = Self {
            bind_addr: env_parse("BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            provider: env_parse("MARKET_DATA_PROVIDER")?.unwrap_or(defaults.provider),
            min_investment: env_parse("MIN_INVESTMENT")?.unwrap_or(defaults.min_investment),
            fetch_max_attempts: env_parse("FETCH_MAX_ATTEMPTS")?
                .unwrap_or(defaults.fetch_max_attempts),
            info_retry_delay: env_parse("INFO_RETRY_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.info_retry_delay),
            price_retry_delay: env_parse("PRICE_RETRY_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.price_retry_delay),
            fetch_concurrency: env_parse("FETCH_CONCURRENCY")?
                .unwrap_or(defaults.fetch_concurrency),
            requests_per_minute: env_parse("REQUESTS_PER_MINUTE")?,
            strategy_catalog_path: std::env::var("STRATEGY_CATALOG_PATH").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fetch_max_attempts == 0 {
            return Err("FETCH_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if self.fetch_concurrency == 0 {
            return Err("FETCH_CONCURRENCY must be at least 1".to_string());
        }
        if !(self.min_investment.is_finite() && self.min_investment > 0.0) {
            return Err("MIN_INVESTMENT must be a positive amount".to_string());
        }
        if self.requests_per_minute == Some(0) {
            return Err("REQUESTS_PER_MINUTE must be at least 1 when set".to_string());
        }
        Ok(())
    }

    pub fn fetch_policies(&self) -> FetchPolicies {
        FetchPolicies {
            info: RetryPolicy::new(self.fetch_max_attempts, self.info_retry_delay),
            price: RetryPolicy::new(self.fetch_max_attempts, self.price_retry_delay),
        }
    }

    pub fn strategy_catalog(&self) -> Result<StrategyCatalog, String> {
        match &self.strategy_catalog_path {
            Some(path) => StrategyCatalog::from_json_file(path),
            None => Ok(StrategyCatalog::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_investment, 5000.0);
        let policies = config.fetch_policies();
        assert_eq!(policies, FetchPolicies::default());
        assert_eq!(policies.info.max_attempts, 3);
        assert_eq!(policies.info.delay, Duration::from_secs(5));
        assert_eq!(policies.price.delay, Duration::from_secs(10));
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!("Yahoo".parse::<ProviderKind>(), Ok(ProviderKind::Yahoo));
        assert_eq!("mock".parse::<ProviderKind>(), Ok(ProviderKind::Mock));
        assert!("twelvedata".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let config = AppConfig { fetch_max_attempts: 0, ..AppConfig::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { fetch_concurrency: 0, ..AppConfig::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { min_investment: -1.0, ..AppConfig::default() };
        assert!(config.validate().is_err());
    }
}
