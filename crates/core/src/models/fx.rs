use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PIVOT_CURRENCY: &str = "USD";

/// A point-in-time USD-pivot rate table.
///
/// `rates[CCY]` is the number of CCY units per 1 USD. There is no history:
/// valuation of past dates uses this same snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRates {
    /// Always "USD"
    pub base: String,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// CCY → units per USD
    pub rates: HashMap<String, f64>,
}

impl FxRates {
    pub fn new(timestamp: DateTime<Utc>, rates: HashMap<String, f64>) -> Self {
        let rates = rates
            .into_iter()
            .map(|(code, rate)| (code.trim().to_uppercase(), rate))
            .collect();
        Self {
            base: PIVOT_CURRENCY.to_string(),
            timestamp,
            rates,
        }
    }

    /// Units of `code` per USD, if present, finite and non-zero.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(&code.to_uppercase())
            .copied()
            .filter(|r| r.is_finite() && *r != 0.0)
    }
}

impl Default for FxRates {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH, HashMap::new())
    }
}
