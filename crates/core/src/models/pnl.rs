use serde::{Deserialize, Serialize};

/// Output of the weighted-average cost-basis calculation.
///
/// Never persisted: always recomputed from the full lot history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PnLResult {
    /// Units still held
    pub qty: f64,

    /// Weighted average cost per unit, fees included
    pub avg_cost: f64,

    /// Gains locked in by sells, net of sell fees
    pub realized: f64,

    /// Mark-to-market gain on the remaining units
    pub unrealized: f64,
}

impl PnLResult {
    /// Realized plus unrealized.
    pub fn total(&self) -> f64 {
        self.realized + self.unrealized
    }

    /// Cost basis of the units still held, zero when nothing is held.
    pub fn cost_basis(&self) -> f64 {
        if self.qty > 0.0 {
            self.qty * self.avg_cost
        } else {
            0.0
        }
    }
}
