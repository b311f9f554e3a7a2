use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::models::analytics::{AllocationSlice, HoldingSummary, PortfolioTotals};
use crate::models::fx::FxRates;
use crate::models::portfolio::Portfolio;
use crate::models::quote::Quote;
use crate::services::currency_service::{convert, CurrencyService};
use crate::services::pnl_service::PnlService;

/// Unrealized amounts at or below this are noise for the mover ranking.
const TRIVIAL_UNREALIZED: f64 = 0.01;

/// Cross-portfolio totals: holdings value, cash, top movers, allocation.
///
/// Portfolios with tracking disabled are skipped entirely.
pub struct AnalyticsService {
    pnl_service: PnlService,
    currency_service: CurrencyService,
}

impl AnalyticsService {
    pub fn new() -> Self {
        Self {
            pnl_service: PnlService::new(),
            currency_service: CurrencyService::new(),
        }
    }

    /// Compute totals in `display_currency` as of `now`.
    ///
    /// A holding without a usable quote is valued at its average cost.
    #[allow(clippy::too_many_arguments)]
    pub fn get_portfolio_totals(
        &self,
        portfolios: &[Portfolio],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        now: DateTime<Utc>,
        top_movers: usize,
        allocation_slices: usize,
    ) -> PortfolioTotals {
        let tracked: Vec<&Portfolio> = portfolios.iter().filter(|p| p.tracking_enabled).collect();
        self.warn_missing_rates(&tracked, rates, display_currency);

        let mut cash = 0.0;
        let mut holdings = Vec::new();

        for portfolio in &tracked {
            cash += convert(rates, portfolio.cash, &portfolio.base_currency, display_currency);

            for holding in portfolio.holdings.values().filter(|h| h.has_lots()) {
                let native = holding.native_currency();
                let live = quotes.get(&holding.symbol).and_then(Quote::live_price);
                let pnl = self
                    .pnl_service
                    .holding_pnl(holding, live, rates, display_currency, now);

                let price = live.map(|p| convert(rates, p, &native, display_currency));
                let market_value = pnl.qty * price.unwrap_or(pnl.avg_cost);
                let basis = pnl.cost_basis();
                let unrealized_pct = if basis > 0.0 {
                    pnl.unrealized / basis * 100.0
                } else {
                    0.0
                };

                holdings.push(HoldingSummary {
                    portfolio_id: portfolio.id,
                    symbol: holding.symbol.clone(),
                    native_currency: native,
                    qty: pnl.qty,
                    avg_cost: pnl.avg_cost,
                    price,
                    market_value,
                    realized: pnl.realized,
                    unrealized: pnl.unrealized,
                    unrealized_pct,
                });
            }
        }

        let holdings_value: f64 = holdings.iter().map(|h| h.market_value).sum();
        let total_value = holdings_value + cash;

        holdings.sort_by(|a, b| b.market_value.total_cmp(&a.market_value));

        let mut movers: Vec<HoldingSummary> = holdings
            .iter()
            .filter(|h| h.cost_basis() > 0.0 || h.unrealized.abs() > TRIVIAL_UNREALIZED)
            .cloned()
            .collect();
        movers.sort_by(|a, b| b.unrealized_pct.total_cmp(&a.unrealized_pct));
        movers.truncate(top_movers);

        let allocation = allocation_slices_for(&holdings, total_value, allocation_slices);

        PortfolioTotals {
            currency: display_currency.to_uppercase(),
            portfolio_count: tracked.len(),
            holdings_value,
            cash,
            total_value,
            holdings,
            top_movers: movers,
            allocation,
        }
    }

    fn warn_missing_rates(&self, tracked: &[&Portfolio], rates: &FxRates, display_currency: &str) {
        let natives: Vec<String> = tracked
            .iter()
            .flat_map(|p| p.holdings.values().map(|h| h.native_currency()))
            .collect();
        let codes = natives
            .iter()
            .map(String::as_str)
            .chain(tracked.iter().map(|p| p.base_currency.as_str()))
            .chain(std::iter::once(display_currency));
        let missing = self.currency_service.missing_rates(rates, codes);
        if !missing.is_empty() {
            log::warn!(
                "FX snapshot has no usable rate for {}; affected amounts are shown unconverted",
                missing.join(", ")
            );
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest positions by combined value across portfolios, weighted against
/// holdings plus cash.
fn allocation_slices_for(
    holdings: &[HoldingSummary],
    total_value: f64,
    limit: usize,
) -> Vec<AllocationSlice> {
    let mut by_symbol: BTreeMap<&str, f64> = BTreeMap::new();
    for h in holdings {
        *by_symbol.entry(h.symbol.as_str()).or_insert(0.0) += h.market_value;
    }

    let mut slices: Vec<AllocationSlice> = by_symbol
        .into_iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|(symbol, value)| AllocationSlice {
            symbol: symbol.to_string(),
            value,
            weight: if total_value > 0.0 {
                value / total_value * 100.0
            } else {
                0.0
            },
        })
        .collect();
    slices.sort_by(|a, b| b.value.total_cmp(&a.value));
    slices.truncate(limit);
    slices
}
