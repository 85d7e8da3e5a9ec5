use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is true but LOKI_URL is not set")]
    MissingLokiUrl,
    #[error("Invalid LOKI_URL: {0}")]
    InvalidLokiUrl(#[from] url::ParseError),
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),
    #[error("Unknown LOG_FORMAT '{0}', expected 'full' or 'compact'")]
    InvalidFormat(String),
    #[cfg(feature = "loki")]
    #[error("Failed to build Loki layer: {0}")]
    Loki(#[from] tracing_loki::Error),
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Full,
    Compact,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            other => Err(LoggingError::InvalidFormat(other.to_string())),
        }
    }
}

/// Subscriber settings. `loki` is `Some` only when shipping was requested
/// and the URL parsed.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
    pub service_name: String,
    pub environment: String,
    pub loki: Option<Url>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Full,
            service_name: "smartfolio".to_string(),
            environment: "development".to_string(),
            loki: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, LoggingError> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let loki_enabled = var("LOKI_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(false);
        Self::from_parts(
            var("RUST_LOG"),
            var("LOG_FORMAT"),
            var("SERVICE_NAME"),
            var("ENVIRONMENT"),
            loki_enabled,
            var("LOKI_URL"),
        )
    }

    fn from_parts(
        filter: Option<String>,
        format: Option<String>,
        service_name: Option<String>,
        environment: Option<String>,
        loki_enabled: bool,
        loki_url: Option<String>,
    ) -> Result<Self, LoggingError> {
        let defaults = Self::default();
        let loki = match (loki_enabled, loki_url) {
            (false, _) => None,
            (true, None) => return Err(LoggingError::MissingLokiUrl),
            (true, Some(raw)) => Some(Url::parse(&raw)?),
        };

        Ok(Self {
            filter: filter.unwrap_or(defaults.filter),
            format: format.map(|f| f.parse()).transpose()?.unwrap_or(defaults.format),
            service_name: service_name.unwrap_or(defaults.service_name),
            environment: environment.unwrap_or(defaults.environment),
            loki,
        })
    }

    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.filter).map_err(|_| LoggingError::InvalidFilter(self.filter.clone()))
    }
}

/// Install the global subscriber. Must run inside the tokio runtime when
/// Loki shipping is configured.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = config.env_filter()?;
    let full = (config.format == LogFormat::Full).then(|| fmt::layer());
    let compact = (config.format == LogFormat::Compact).then(|| fmt::layer().compact());

    #[cfg(feature = "loki")]
    let loki = match &config.loki {
        Some(url) => {
            let (layer, task) = tracing_loki::builder()
                .label("service", &config.service_name)?
                .label("environment", &config.environment)?
                .build_url(url.clone())?;
            // ships batched events for the lifetime of the runtime
            tokio::spawn(task);
            Some(layer)
        }
        None => None,
    };
    #[cfg(not(feature = "loki"))]
    let loki: Option<tracing_subscriber::layer::Identity> = None;

    tracing_subscriber::registry()
        .with(filter)
        .with(full)
        .with(compact)
        .with(loki)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    match &config.loki {
        Some(url) if cfg!(feature = "loki") => tracing::info!(
            service = %config.service_name,
            environment = %config.environment,
            "Logging to console and Loki at {}", url
        ),
        Some(_) => tracing::warn!("LOKI_URL set but built without the loki feature, console only"),
        None => tracing::info!(
            service = %config.service_name,
            environment = %config.environment,
            "Console logging initialized"
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loki_requires_a_valid_url() {
        let missing = LoggingConfig::from_parts(None, None, None, None, true, None);
        assert!(matches!(missing, Err(LoggingError::MissingLokiUrl)));

        let bad = LoggingConfig::from_parts(None, None, None, None, true, Some("not a url".into()));
        assert!(matches!(bad, Err(LoggingError::InvalidLokiUrl(_))));

        let config = LoggingConfig::from_parts(
            None,
            None,
            None,
            None,
            true,
            Some("http://localhost:3100".into()),
        )
        .unwrap();
        assert_eq!(config.loki.unwrap().as_str(), "http://localhost:3100/");
    }

    #[test]
    fn url_alone_does_not_enable_loki() {
        let config =
            LoggingConfig::from_parts(None, None, None, None, false, Some("http://localhost:3100".into()))
                .unwrap();
        assert!(config.loki.is_none());
    }

    #[test]
    fn defaults_are_full_console_at_info() {
        let config = LoggingConfig::from_parts(None, None, None, None, false, None).unwrap();
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Full);
        assert_eq!(config.service_name, "smartfolio");
        assert_eq!(config.environment, "development");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn format_and_filter_are_checked() {
        assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!("json".parse::<LogFormat>(), Err(LoggingError::InvalidFormat(_))));

        let config = LoggingConfig {
            filter: "smartfolio=loudest".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(config.env_filter(), Err(LoggingError::InvalidFilter(_))));
    }
}
