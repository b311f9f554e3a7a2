use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::fx::FxRates;
use super::quote::Quote;

/// Immutable market inputs for one valuation pass: quotes by symbol plus
/// the FX snapshot they are converted with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub quotes: HashMap<String, Quote>,
    pub fx: FxRates,
}

impl MarketSnapshot {
    pub fn new(quotes: impl IntoIterator<Item = Quote>, fx: FxRates) -> Self {
        Self {
            quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
            fx,
        }
    }

    /// Re-key quotes by upper-cased symbol and upper-case the FX codes.
    /// Needed for snapshots that were deserialized rather than fetched.
    #[must_use]
    pub fn normalized(self) -> Self {
        let quotes = self.quotes.into_values().map(|mut quote| {
            quote.symbol = quote.symbol.trim().to_uppercase();
            quote
        });
        Self::new(quotes, FxRates::new(self.fx.timestamp, self.fx.rates))
    }

    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(&symbol.trim().to_uppercase())
    }
}
