use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily trading summary for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { date, open, high, low, close, volume }
    }

    /// Bar where open/high/low all equal the close. Handy for fixtures and
    /// providers that only report closing prices.
    pub fn from_close(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self::new(date, close, close, close, close, volume)
    }
}

/// Closing prices of a series, oldest first.
pub fn closes(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn volumes(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
}

/// Relative time span supported by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    OneDay,
    FiveDays,
    OneYear,
}

impl Period {
    pub fn calendar_days(&self) -> i64 {
        match self {
            Period::OneDay => 1,
            Period::FiveDays => 5,
            Period::OneYear => 365,
        }
    }

    /// Range token understood by the Yahoo chart endpoint.
    pub fn as_range(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneYear => "1y",
        }
    }
}

/// Either a relative period ending now, or an explicit `[start, end)` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Period(Period),
    Range { start: NaiveDate, end: NaiveDate },
}

impl HistoryWindow {
    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        HistoryWindow::Range {
            start: end - chrono::Duration::days(days),
            end,
        }
    }
}

impl std::fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryWindow::Period(p) => write!(f, "period={}", p.as_range()),
            HistoryWindow::Range { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_window_spans_calendar_days() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let window = HistoryWindow::trailing_days(end, 5);
        assert_eq!(
            window,
            HistoryWindow::Range {
                start: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
                end,
            }
        );
        assert_eq!(window.to_string(), "2024-03-03..2024-03-08");
    }

    #[test]
    fn closes_keep_series_order() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = vec![
            OhlcvBar::from_close(d, 10.0, 100.0),
            OhlcvBar::from_close(d.succ_opt().unwrap(), 11.0, 200.0),
        ];
        assert_eq!(closes(&bars), vec![10.0, 11.0]);
        assert_eq!(volumes(&bars), vec![100.0, 200.0]);
    }
}
