use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Remaining quantities smaller than this are treated as fully sold.
pub const QTY_EPSILON: f64 = 1e-9;

/// Direction of a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LotSide {
    /// Acquiring units
    Buy,
    /// Disposing of units
    Sell,
}

impl std::fmt::Display for LotSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotSide::Buy => write!(f, "Buy"),
            LotSide::Sell => write!(f, "Sell"),
        }
    }
}

/// A single buy or sell execution.
///
/// `price` and `fee` are in the holding's native currency when stored.
/// The P&L calculator receives copies already converted into the
/// display currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Unique identifier, used for explicit edit/delete
    pub id: Uuid,

    /// Buy or Sell
    pub side: LotSide,

    /// Number of units (always positive)
    pub qty: f64,

    /// Unit price
    pub price: f64,

    /// Total fee charged on the execution
    #[serde(default)]
    pub fee: f64,

    /// Execution time
    pub date: DateTime<Utc>,

    /// Optional free-text notes (broker, memo)
    #[serde(default)]
    pub notes: Option<String>,
}

impl Lot {
    pub fn new(side: LotSide, qty: f64, price: f64, fee: f64, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            side,
            qty,
            price,
            fee,
            date,
            notes: None,
        }
    }

    pub fn buy(qty: f64, price: f64, fee: f64, date: DateTime<Utc>) -> Self {
        Self::new(LotSide::Buy, qty, price, fee, date)
    }

    pub fn sell(qty: f64, price: f64, fee: f64, date: DateTime<Utc>) -> Self {
        Self::new(LotSide::Sell, qty, price, fee, date)
    }

    /// Attach notes to the lot.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Quantity with sign applied: positive for buys, negative for sells.
    pub fn signed_qty(&self) -> f64 {
        match self.side {
            LotSide::Buy => self.qty,
            LotSide::Sell => -self.qty,
        }
    }

    /// Position held after applying this lot to `held`.
    ///
    /// A sell never takes the position below zero, and a later buy starts
    /// from that floor. Every quantity in the engine is folded this way.
    pub fn apply_to_position(&self, held: f64) -> f64 {
        match self.side {
            LotSide::Buy => held + self.qty,
            LotSide::Sell => {
                let left = (held - self.qty).max(0.0);
                if left < QTY_EPSILON {
                    0.0
                } else {
                    left
                }
            }
        }
    }
}

/// Position left after folding `lots` (in date order) from zero.
pub fn position_after<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> f64 {
    lots.into_iter()
        .fold(0.0, |held, lot| lot.apply_to_position(held))
}
