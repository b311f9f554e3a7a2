use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lot::{position_after, Lot};
use crate::services::currency_service::infer_currency;

/// A position in one symbol inside a portfolio.
///
/// Lots are kept ordered by `date` ascending; lots sharing a timestamp stay
/// in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol, uppercased (e.g., "AAPL", "VOD.L", "BTC-USD")
    pub symbol: String,

    /// Native trading currency. Authoritative when present; otherwise it is
    /// inferred from the symbol.
    #[serde(default)]
    pub currency: Option<String>,

    /// Execution history
    #[serde(default)]
    pub lots: Vec<Lot>,
}

impl Holding {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            currency: None,
            lots: Vec::new(),
        }
    }

    /// Create a holding with an explicit native currency.
    pub fn with_currency(symbol: impl Into<String>, currency: impl Into<String>) -> Self {
        let mut holding = Self::new(symbol);
        holding.currency = Some(currency.into().trim().to_uppercase());
        holding
    }

    /// The currency prices for this holding are quoted in.
    pub fn native_currency(&self) -> String {
        match &self.currency {
            Some(code) if !code.is_empty() => code.to_uppercase(),
            _ => infer_currency(&self.symbol),
        }
    }

    /// Net quantity from lots dated at or before `as_of`.
    ///
    /// This is the raw signed sum and can be negative when lots are
    /// inconsistent. Use [`Holding::position_size_as_of`] for valuation.
    pub fn quantity_as_of(&self, as_of: DateTime<Utc>) -> f64 {
        self.lots
            .iter()
            .filter(|lot| lot.date <= as_of)
            .map(Lot::signed_qty)
            .sum()
    }

    /// Quantity usable as a position size.
    ///
    /// Lots are folded in order with each sell clamped at zero, the same
    /// walk [`crate::compute_pnl`] does, so an early over-sell does not eat
    /// into units bought afterwards.
    pub fn position_size_as_of(&self, as_of: DateTime<Utc>) -> f64 {
        position_after(self.lots.iter().filter(|lot| lot.date <= as_of))
    }

    /// Lots dated at or before `as_of`, in chronological order.
    pub fn lots_as_of(&self, as_of: DateTime<Utc>) -> Vec<Lot> {
        self.lots
            .iter()
            .filter(|lot| lot.date <= as_of)
            .cloned()
            .collect()
    }

    pub fn has_lots(&self) -> bool {
        !self.lots.is_empty()
    }

    /// Insert a lot after every lot with the same or an earlier date.
    pub fn insert_lot(&mut self, lot: Lot) {
        let pos = self.lots.partition_point(|existing| existing.date <= lot.date);
        self.lots.insert(pos, lot);
    }
}
