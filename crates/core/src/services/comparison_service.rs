use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::analytics::{ChangeRange, PeriodChange};
use crate::models::fx::FxRates;
use crate::models::holding::Holding;
use crate::models::portfolio::Portfolio;
use crate::models::quote::Quote;
use crate::services::currency_service::convert;
use crate::services::pnl_service::PnlService;

/// Period-over-period change in value and P&L.
///
/// Range changes are the difference between two P&L snapshots (now and the
/// start of the window). They are not cash-flow weighted returns.
pub struct ComparisonService {
    pnl_service: PnlService,
}

impl ComparisonService {
    pub fn new() -> Self {
        Self {
            pnl_service: PnlService::new(),
        }
    }

    /// Today's move: `quote.change × qty` summed over every held position
    /// in the tracked portfolios. Positions without a usable last price are
    /// left out of both the delta and the value.
    ///
    /// `percent` is relative to yesterday's value (today's value minus the
    /// delta), 0 when that value is 0.
    pub fn day_change(
        &self,
        portfolios: &[Portfolio],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        now: DateTime<Utc>,
    ) -> PeriodChange {
        let mut delta = 0.0;
        let mut current_value = 0.0;

        for holding in tracked_holdings(portfolios) {
            let qty = holding.position_size_as_of(now);
            if qty <= 0.0 {
                continue;
            }
            let Some((quote, last)) = quotes
                .get(&holding.symbol)
                .and_then(|q| Some((q, q.live_price()?)))
            else {
                log::debug!("No live quote for {}; excluded from day change", holding.symbol);
                continue;
            };
            let native = holding.native_currency();
            delta += qty * convert(rates, quote.change, &native, display_currency);
            current_value += qty * convert(rates, last, &native, display_currency);
        }

        let value_yesterday = current_value - delta;
        let percent = if value_yesterday != 0.0 {
            delta / value_yesterday.abs() * 100.0
        } else {
            0.0
        };
        PeriodChange { delta, percent }
    }

    /// Change in total P&L over `range`.
    pub fn range_change(
        &self,
        range: ChangeRange,
        portfolios: &[Portfolio],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        now: DateTime<Utc>,
    ) -> PeriodChange {
        match range.start_time(now) {
            None => self.all_time_change(portfolios, quotes, rates, display_currency, now),
            Some(start) => {
                self.window_change(start, portfolios, quotes, rates, display_currency, now)
            }
        }
    }

    /// [`ComparisonService::range_change`] for every range, in display order.
    pub fn all_range_changes(
        &self,
        portfolios: &[Portfolio],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        now: DateTime<Utc>,
    ) -> Vec<(ChangeRange, PeriodChange)> {
        ChangeRange::ALL_RANGES
            .iter()
            .map(|range| {
                let change =
                    self.range_change(*range, portfolios, quotes, rates, display_currency, now);
                (*range, change)
            })
            .collect()
    }

    /// Realized + unrealized over the whole history, relative to the cost
    /// basis of what is still held.
    fn all_time_change(
        &self,
        portfolios: &[Portfolio],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        now: DateTime<Utc>,
    ) -> PeriodChange {
        let mut delta = 0.0;
        let mut cost_basis = 0.0;

        for holding in tracked_holdings(portfolios).filter(|h| h.has_lots()) {
            let live = quotes.get(&holding.symbol).and_then(Quote::live_price);
            let pnl = self
                .pnl_service
                .holding_pnl(holding, live, rates, display_currency, now);
            delta += pnl.total();
            cost_basis += pnl.cost_basis();
        }

        PeriodChange {
            delta,
            percent: percent_of(delta, cost_basis),
        }
    }

    /// P&L now minus P&L as it stood at `start`, using only the lots known
    /// then and the latest price observed at or before `start`.
    fn window_change(
        &self,
        start: DateTime<Utc>,
        portfolios: &[Portfolio],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        now: DateTime<Utc>,
    ) -> PeriodChange {
        let mut delta = 0.0;
        let mut cost_basis = 0.0;

        for holding in tracked_holdings(portfolios).filter(|h| h.has_lots()) {
            let quote = quotes.get(&holding.symbol);
            let live = quote.and_then(Quote::live_price);
            let price_at_start = quote.and_then(|q| q.price_at(start)).or(live);

            let current = self
                .pnl_service
                .holding_pnl(holding, live, rates, display_currency, now);
            let at_start =
                self.pnl_service
                    .holding_pnl(holding, price_at_start, rates, display_currency, start);

            delta += current.total() - at_start.total();
            cost_basis += current.cost_basis();
        }

        PeriodChange {
            delta,
            percent: percent_of(delta, cost_basis),
        }
    }
}

impl Default for ComparisonService {
    fn default() -> Self {
        Self::new()
    }
}

fn tracked_holdings(portfolios: &[Portfolio]) -> impl Iterator<Item = &Holding> {
    portfolios
        .iter()
        .filter(|p| p.tracking_enabled)
        .flat_map(|p| p.holdings.values())
}

fn percent_of(delta: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        delta / denominator * 100.0
    } else {
        0.0
    }
}
