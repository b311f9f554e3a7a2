use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::lot::{Lot, LotSide};
use crate::models::portfolio::{CashEvent, Portfolio};
use crate::models::settings::normalize_currency_code;

/// Mutations on a single portfolio: lots, cash events, watchlist.
///
/// Operates on `&mut Portfolio` only; no market data involved.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Record a lot against `symbol`, creating the holding if needed.
    ///
    /// Selling more than is held is accepted (the valuation engine clamps
    /// it) but logged, since it usually means a missing buy.
    pub fn add_lot(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        lot: Lot,
    ) -> Result<Uuid, CoreError> {
        Self::validate_lot(&lot)?;
        let symbol = normalize_symbol(symbol)?;

        let holding = portfolio
            .holdings
            .entry(symbol.clone())
            .or_insert_with(|| Holding::new(&symbol));

        if lot.side == LotSide::Sell {
            let held = holding.position_size_as_of(lot.date);
            if held < lot.qty {
                log::warn!(
                    "Sell of {} {symbol} on {} exceeds the {held} held at that time",
                    lot.qty,
                    lot.date
                );
            }
        }

        let id = lot.id;
        holding.insert_lot(lot);
        Ok(id)
    }

    /// Remove a lot by id. A holding left without lots is dropped unless it
    /// carries an explicit currency.
    pub fn remove_lot(&self, portfolio: &mut Portfolio, lot_id: Uuid) -> Result<Lot, CoreError> {
        let (symbol, idx) = Self::locate_lot(portfolio, lot_id)?;
        let holding = portfolio
            .holdings
            .get_mut(&symbol)
            .ok_or_else(|| CoreError::LotNotFound(lot_id.to_string()))?;
        let removed = holding.lots.remove(idx);
        if holding.lots.is_empty() && holding.currency.is_none() {
            portfolio.holdings.remove(&symbol);
        }
        Ok(removed)
    }

    /// Replace the contents of an existing lot, keeping its id.
    /// The lot is re-positioned if its date changed.
    pub fn update_lot(
        &self,
        portfolio: &mut Portfolio,
        lot_id: Uuid,
        updated: Lot,
    ) -> Result<(), CoreError> {
        Self::validate_lot(&updated)?;
        let (symbol, idx) = Self::locate_lot(portfolio, lot_id)?;
        let holding = portfolio
            .holdings
            .get_mut(&symbol)
            .ok_or_else(|| CoreError::LotNotFound(lot_id.to_string()))?;

        holding.lots.remove(idx);
        holding.insert_lot(Lot {
            id: lot_id,
            ..updated
        });
        Ok(())
    }

    /// Set or clear the explicit native currency of a holding.
    pub fn set_holding_currency(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        currency: Option<&str>,
    ) -> Result<(), CoreError> {
        let symbol = normalize_symbol(symbol)?;
        let currency = currency.map(normalize_currency_code).transpose()?;
        let holding = portfolio
            .holdings
            .entry(symbol.clone())
            .or_insert_with(|| Holding::new(&symbol));
        holding.currency = currency;
        Ok(())
    }

    /// Log a deposit (positive) or withdrawal (negative) and apply it to
    /// the cash balance.
    pub fn record_cash_event(
        &self,
        portfolio: &mut Portfolio,
        date: DateTime<Utc>,
        amount: f64,
    ) -> Result<(), CoreError> {
        if !amount.is_finite() || amount == 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Cash event amount must be a non-zero finite number (got {amount})"
            )));
        }
        let pos = portfolio.cash_events.partition_point(|e| e.date <= date);
        portfolio.cash_events.insert(pos, CashEvent { date, amount });
        portfolio.cash += amount;
        Ok(())
    }

    /// Add a symbol to the watchlist. Returns `false` if it was already there.
    pub fn add_to_watchlist(&self, portfolio: &mut Portfolio, symbol: &str) -> Result<bool, CoreError> {
        let symbol = normalize_symbol(symbol)?;
        if portfolio.watchlist.contains(&symbol) {
            return Ok(false);
        }
        portfolio.watchlist.push(symbol);
        Ok(true)
    }

    /// Remove a symbol from the watchlist. Returns `false` if it was absent.
    pub fn remove_from_watchlist(&self, portfolio: &mut Portfolio, symbol: &str) -> bool {
        let upper = symbol.trim().to_uppercase();
        let before = portfolio.watchlist.len();
        portfolio.watchlist.retain(|s| *s != upper);
        portfolio.watchlist.len() != before
    }

    /// Position sizes held at `as_of`, by symbol.
    /// Only symbols with a positive quantity are returned.
    pub fn get_holdings(&self, portfolio: &Portfolio, as_of: DateTime<Utc>) -> BTreeMap<String, f64> {
        portfolio
            .holdings
            .values()
            .map(|h| (h.symbol.clone(), h.position_size_as_of(as_of)))
            .filter(|(_, qty)| *qty > 0.0)
            .collect()
    }

    /// Rules:
    /// - Quantity must be positive
    /// - Price and fee must be non-negative
    /// - All numbers must be finite
    fn validate_lot(lot: &Lot) -> Result<(), CoreError> {
        if !lot.qty.is_finite() || lot.qty <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Lot quantity must be positive (got {})",
                lot.qty
            )));
        }
        if !lot.price.is_finite() || lot.price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Lot price must be zero or positive (got {})",
                lot.price
            )));
        }
        if !lot.fee.is_finite() || lot.fee < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Lot fee must be zero or positive (got {})",
                lot.fee
            )));
        }
        Ok(())
    }

    fn locate_lot(portfolio: &Portfolio, lot_id: Uuid) -> Result<(String, usize), CoreError> {
        portfolio
            .holdings
            .values()
            .find_map(|h| {
                h.lots
                    .iter()
                    .position(|l| l.id == lot_id)
                    .map(|idx| (h.symbol.clone(), idx))
            })
            .ok_or_else(|| CoreError::LotNotFound(lot_id.to_string()))
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_symbol(symbol: &str) -> Result<String, CoreError> {
    let upper = symbol.trim().to_uppercase();
    if upper.is_empty() {
        return Err(CoreError::ValidationError("Symbol must not be empty".into()));
    }
    Ok(upper)
}
