use std::path::Path;

use serde::{Deserialize, Serialize};

/// A named investing theme and the symbols it buys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub symbols: Vec<String>,
}

/// Immutable, ordered catalog of strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyCatalog {
    strategies: Vec<Strategy>,
}

impl StrategyCatalog {
    pub fn new(strategies: Vec<Strategy>) -> Result<Self, String> {
        for (i, s) in strategies.iter().enumerate() {
            if s.name.trim().is_empty() {
                return Err("Strategy name cannot be empty".to_string());
            }
            if s.symbols.is_empty() {
                return Err(format!("Strategy '{}' has no symbols", s.name));
            }
            if strategies[..i].iter().any(|other| other.name == s.name) {
                return Err(format!("Duplicate strategy '{}'", s.name));
            }
        }
        Ok(Self { strategies })
    }

    /// Load a catalog from a JSON array of `{ "name": ..., "symbols": [...] }`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read strategy catalog {}: {}", path.display(), e))?;
        let strategies: Vec<Strategy> = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid strategy catalog {}: {}", path.display(), e))?;
        Self::new(strategies)
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|s| s.name.as_str())
    }

    pub fn symbols_for(&self, name: &str) -> Option<&[String]> {
        self.strategies
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.symbols.as_slice())
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        let strategy = |name: &str, symbols: [&str; 3]| Strategy {
            name: name.to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            strategies: vec![
                strategy("Ethical Investing", ["AAPL", "ADBE", "NSRGY"]),
                strategy("Growth Investing", ["TSLA", "NVDA", "AMZN"]),
                strategy("Index Investing", ["VTI", "IXUS", "ILTB"]),
                strategy("Quality Investing", ["MSFT", "JNJ", "V"]),
                strategy("Value Investing", ["BRK-B", "JPM", "PG"]),
            ],
        }
    }
}
