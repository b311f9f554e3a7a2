use chrono::{DateTime, Utc};

use crate::models::fx::FxRates;
use crate::models::holding::Holding;
use crate::models::lot::{Lot, LotSide, QTY_EPSILON};
use crate::models::pnl::PnLResult;
use crate::services::currency_service::CurrencyService;

/// Weighted-average cost basis over `lots`, marked at `current_price`.
///
/// `lots` must already be expressed in the currency of `current_price`.
/// They are processed by date; lots sharing a date keep their slice order.
///
/// - Buy: fees load into the basis, `avg_cost` is re-weighted.
/// - Sell: books `q * (p - avg_cost) - fee` as realized and leaves
///   `avg_cost` alone. Selling more than is held is not rejected; the
///   remaining quantity is clamped at zero.
pub fn compute_pnl(lots: &[Lot], current_price: f64) -> PnLResult {
    let mut ordered: Vec<&Lot> = lots.iter().collect();
    ordered.sort_by_key(|lot| lot.date);

    let mut qty = 0.0_f64;
    let mut avg_cost = 0.0_f64;
    let mut realized = 0.0_f64;

    for lot in ordered {
        let (q, p, f) = (lot.qty, lot.price, lot.fee);
        match lot.side {
            LotSide::Buy => {
                let new_qty = qty + q;
                if new_qty > 0.0 {
                    avg_cost = (qty * avg_cost + q * p + f) / new_qty;
                }
            }
            LotSide::Sell => {
                realized += q * (p - avg_cost) - f;
                if q > qty + QTY_EPSILON {
                    log::warn!(
                        "Sell of {q} on {} exceeds held quantity {qty}; clamping to 0",
                        lot.date
                    );
                }
            }
        }
        qty = lot.apply_to_position(qty);
    }

    let unrealized = if qty > 0.0 {
        qty * (current_price - avg_cost)
    } else {
        0.0
    };

    PnLResult {
        qty,
        avg_cost,
        realized,
        unrealized,
    }
}

/// Runs [`compute_pnl`] for a stored holding: filters lots by date and
/// converts everything into the display currency first.
pub struct PnlService {
    currency_service: CurrencyService,
}

impl PnlService {
    pub fn new() -> Self {
        Self {
            currency_service: CurrencyService::new(),
        }
    }

    /// P&L of `holding` using only lots dated at or before `as_of`.
    ///
    /// `native_price` is in the holding's native currency. When it is `None`
    /// the position is marked at its own average cost, so unrealized is 0.
    pub fn holding_pnl(
        &self,
        holding: &Holding,
        native_price: Option<f64>,
        rates: &FxRates,
        display_currency: &str,
        as_of: DateTime<Utc>,
    ) -> PnLResult {
        let native = holding.native_currency();
        let lots = self.currency_service.convert_lots(
            rates,
            &holding.lots_as_of(as_of),
            &native,
            display_currency,
        );

        match native_price {
            Some(price) => {
                let price = self
                    .currency_service
                    .convert_price(rates, price, &native, display_currency);
                compute_pnl(&lots, price)
            }
            None => {
                let mut result = compute_pnl(&lots, 0.0);
                result.unrealized = 0.0;
                result
            }
        }
    }
}

impl Default for PnlService {
    fn default() -> Self {
        Self::new()
    }
}
