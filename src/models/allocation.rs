use serde::{Deserialize, Serialize};

/// Composite score computed for one requested symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolScore {
    pub symbol: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAllocation {
    pub symbol: String,
    pub score: f64,
    pub amount: f64,
}

/// Dollar split across the requested symbols, one entry per requested symbol
/// in request order. A symbol requested twice has two entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub total_amount: f64,
    pub entries: Vec<SymbolAllocation>,
}

impl Allocation {
    pub fn allocated_total(&self) -> f64 {
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
