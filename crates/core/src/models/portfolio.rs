use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::holding::Holding;

/// A dated cash movement: positive for deposits, negative for withdrawals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashEvent {
    pub date: DateTime<Utc>,
    pub amount: f64,
}

/// A named collection of holdings with its own cash balance.
///
/// `tracking_enabled = false` keeps the data but removes the portfolio from
/// every aggregate: totals, value series, and period changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Unique identifier
    pub id: Uuid,

    /// Display name (e.g., "Brokerage", "Retirement")
    #[serde(default)]
    pub name: String,

    /// Currency the cash balance is held in
    pub base_currency: String,

    /// symbol → holding. BTreeMap keeps iteration order deterministic.
    #[serde(default)]
    pub holdings: BTreeMap<String, Holding>,

    /// Current cash balance in `base_currency`
    #[serde(default)]
    pub cash: f64,

    /// Deposit/withdrawal log, oldest first
    #[serde(default)]
    pub cash_events: Vec<CashEvent>,

    /// Symbols the user follows without holding them
    #[serde(default)]
    pub watchlist: Vec<String>,

    /// Whether this portfolio contributes to aggregate figures
    #[serde(default = "default_tracking_enabled")]
    pub tracking_enabled: bool,
}

fn default_tracking_enabled() -> bool {
    true
}

impl Portfolio {
    pub fn new(name: impl Into<String>, base_currency: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            base_currency: base_currency.into().trim().to_uppercase(),
            holdings: BTreeMap::new(),
            cash: 0.0,
            cash_events: Vec::new(),
            watchlist: Vec::new(),
            tracking_enabled: true,
        }
    }

    /// Look up a holding by symbol (case-insensitive).
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(&symbol.trim().to_uppercase())
    }

    /// All symbols that have at least one lot.
    pub fn traded_symbols(&self) -> impl Iterator<Item = &str> {
        self.holdings
            .values()
            .filter(|h| h.has_lots())
            .map(|h| h.symbol.as_str())
    }

    /// Upper-case holding symbols, currencies and the watchlist, re-keying
    /// holdings by symbol. Holdings that collide once upper-cased are
    /// merged. Lots end up in date order.
    ///
    /// Used on data that did not go through the mutation API (imports).
    pub fn normalize_symbols(&mut self) {
        let holdings = std::mem::take(&mut self.holdings);
        for (key, mut holding) in holdings {
            let symbol = if holding.symbol.trim().is_empty() { key } else { holding.symbol };
            holding.symbol = symbol.trim().to_uppercase();
            holding.currency = holding
                .currency
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty());

            match self.holdings.entry(holding.symbol.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(holding);
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    if existing.currency.is_none() {
                        existing.currency = holding.currency;
                    }
                    existing.lots.extend(holding.lots);
                }
            }
        }
        for holding in self.holdings.values_mut() {
            holding.lots.sort_by_key(|lot| lot.date);
        }

        let watchlist = std::mem::take(&mut self.watchlist);
        for symbol in watchlist {
            let upper = symbol.trim().to_uppercase();
            if !upper.is_empty() && !self.watchlist.contains(&upper) {
                self.watchlist.push(upper);
            }
        }
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new("Portfolio", "USD")
    }
}
