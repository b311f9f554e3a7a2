use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One daily bar: timestamp and close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub t: DateTime<Utc>,
    pub c: f64,
}

/// One point of a simplified price line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub t: DateTime<Utc>,
    pub v: f64,
}

/// Market data for one symbol, in the symbol's native currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol, uppercased
    pub symbol: String,

    /// Latest traded price
    pub last: f64,

    /// Change versus the previous session close
    #[serde(default)]
    pub change: f64,

    /// Daily bars, preferred source for history
    #[serde(default)]
    pub bars: Vec<Bar>,

    /// Simplified price line, used when no bars are available
    #[serde(default)]
    pub line: Vec<LinePoint>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, last: f64, change: f64) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            last,
            change,
            bars: Vec::new(),
            line: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_bars(mut self, bars: Vec<Bar>) -> Self {
        self.bars = bars;
        self
    }

    #[must_use]
    pub fn with_line(mut self, line: Vec<LinePoint>) -> Self {
        self.line = line;
        self
    }

    /// `last` if it is a usable price.
    pub fn live_price(&self) -> Option<f64> {
        (self.last.is_finite() && self.last > 0.0).then_some(self.last)
    }

    /// Historical observations as `(t, price)`: bars when present, the price
    /// line otherwise. Not sorted.
    pub fn history(&self) -> Vec<(DateTime<Utc>, f64)> {
        if !self.bars.is_empty() {
            self.bars.iter().map(|b| (b.t, b.c)).collect()
        } else {
            self.line.iter().map(|p| (p.t, p.v)).collect()
        }
    }

    /// Close of the latest observation with `t <= at`.
    pub fn price_at(&self, at: DateTime<Utc>) -> Option<f64> {
        self.history()
            .into_iter()
            .filter(|(t, price)| *t <= at && price.is_finite() && *price > 0.0)
            .max_by_key(|(t, _)| *t)
            .map(|(_, price)| price)
    }
}
