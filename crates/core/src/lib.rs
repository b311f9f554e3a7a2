pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use errors::CoreError;
use models::{
    analytics::{ChangeRange, PeriodChange, PortfolioTotals},
    chart::SeriesPoint,
    lot::Lot,
    market::MarketSnapshot,
    pnl::PnLResult,
    portfolio::Portfolio,
    settings::{normalize_currency_code, Settings},
};
use providers::registry::MarketDataRegistry;
use services::{
    analytics_service::AnalyticsService, chart_service::ChartService,
    comparison_service::ComparisonService, market_data_service::MarketDataService,
    pnl_service::PnlService, portfolio_service::PortfolioService,
};

pub use services::currency_service::{convert, infer_currency};
pub use services::pnl_service::compute_pnl;

/// Days of daily history requested on a market-data refresh.
const HISTORY_LOOKBACK_DAYS: i64 = 730;

/// Main entry point for the holdings-tracker core library.
///
/// Holds the portfolios, the latest market snapshot, and the settings.
/// Every valuation call recomputes from these inputs; nothing is cached.
#[must_use]
pub struct HoldingsTracker {
    portfolios: Vec<Portfolio>,
    settings: Settings,
    market: MarketSnapshot,
    portfolio_service: PortfolioService,
    market_data_service: MarketDataService,
    pnl_service: PnlService,
    chart_service: ChartService,
    comparison_service: ComparisonService,
    analytics_service: AnalyticsService,
}

impl std::fmt::Debug for HoldingsTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoldingsTracker")
            .field("portfolios", &self.portfolios.len())
            .field("settings", &self.settings)
            .field("quotes", &self.market.quotes.len())
            .field("fx_timestamp", &self.market.fx.timestamp)
            .finish()
    }
}

impl HoldingsTracker {
    /// Create an empty tracker with default settings and providers.
    pub fn create_new() -> Self {
        Self::build(Vec::new(), Settings::default(), MarketDataRegistry::new_with_defaults())
    }

    /// Create a tracker with explicit settings and provider registry.
    pub fn with_registry(settings: Settings, registry: MarketDataRegistry) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(Vec::new(), settings, registry))
    }

    // ── Portfolios ──────────────────────────────────────────────────

    /// Create a new portfolio and return its id.
    pub fn add_portfolio(&mut self, name: &str, base_currency: &str) -> Result<Uuid, CoreError> {
        let base = normalize_currency_code(base_currency)?;
        let portfolio = Portfolio::new(name, base);
        let id = portfolio.id;
        self.portfolios.push(portfolio);
        Ok(id)
    }

    /// Delete a portfolio and everything in it.
    pub fn remove_portfolio(&mut self, portfolio_id: Uuid) -> Result<Portfolio, CoreError> {
        let idx = self
            .portfolios
            .iter()
            .position(|p| p.id == portfolio_id)
            .ok_or_else(|| CoreError::PortfolioNotFound(portfolio_id.to_string()))?;
        Ok(self.portfolios.remove(idx))
    }

    #[must_use]
    pub fn get_portfolio(&self, portfolio_id: Uuid) -> Option<&Portfolio> {
        self.portfolios.iter().find(|p| p.id == portfolio_id)
    }

    #[must_use]
    pub fn get_portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    /// Include or exclude a portfolio from every aggregate figure.
    pub fn set_tracking_enabled(&mut self, portfolio_id: Uuid, enabled: bool) -> Result<(), CoreError> {
        self.portfolio_mut(portfolio_id)?.tracking_enabled = enabled;
        Ok(())
    }

    // ── Lots & Cash ─────────────────────────────────────────────────

    /// Record a buy or sell lot. Returns the lot id.
    pub fn add_lot(&mut self, portfolio_id: Uuid, symbol: &str, lot: Lot) -> Result<Uuid, CoreError> {
        let portfolio = Self::find_mut(&mut self.portfolios, portfolio_id)?;
        self.portfolio_service.add_lot(portfolio, symbol, lot)
    }

    pub fn remove_lot(&mut self, portfolio_id: Uuid, lot_id: Uuid) -> Result<Lot, CoreError> {
        let portfolio = Self::find_mut(&mut self.portfolios, portfolio_id)?;
        self.portfolio_service.remove_lot(portfolio, lot_id)
    }

    pub fn update_lot(&mut self, portfolio_id: Uuid, lot_id: Uuid, updated: Lot) -> Result<(), CoreError> {
        let portfolio = Self::find_mut(&mut self.portfolios, portfolio_id)?;
        self.portfolio_service.update_lot(portfolio, lot_id, updated)
    }

    /// Set (or clear, with `None`) the native currency of a holding.
    pub fn set_holding_currency(
        &mut self,
        portfolio_id: Uuid,
        symbol: &str,
        currency: Option<&str>,
    ) -> Result<(), CoreError> {
        let portfolio = Self::find_mut(&mut self.portfolios, portfolio_id)?;
        self.portfolio_service.set_holding_currency(portfolio, symbol, currency)
    }

    /// Deposit (positive) or withdraw (negative) cash.
    pub fn record_cash_event(
        &mut self,
        portfolio_id: Uuid,
        date: DateTime<Utc>,
        amount: f64,
    ) -> Result<(), CoreError> {
        let portfolio = Self::find_mut(&mut self.portfolios, portfolio_id)?;
        self.portfolio_service.record_cash_event(portfolio, date, amount)
    }

    pub fn add_to_watchlist(&mut self, portfolio_id: Uuid, symbol: &str) -> Result<bool, CoreError> {
        let portfolio = Self::find_mut(&mut self.portfolios, portfolio_id)?;
        self.portfolio_service.add_to_watchlist(portfolio, symbol)
    }

    pub fn remove_from_watchlist(&mut self, portfolio_id: Uuid, symbol: &str) -> Result<bool, CoreError> {
        let portfolio = Self::find_mut(&mut self.portfolios, portfolio_id)?;
        Ok(self.portfolio_service.remove_from_watchlist(portfolio, symbol))
    }

    // ── Market Data ─────────────────────────────────────────────────

    /// Replace the market snapshot with already-fetched data.
    /// Symbols and currency codes are upper-cased on the way in.
    pub fn set_market_snapshot(&mut self, snapshot: MarketSnapshot) {
        self.market = snapshot.normalized();
    }

    #[must_use]
    pub fn market_snapshot(&self) -> &MarketSnapshot {
        &self.market
    }

    /// Every symbol that has lots or sits on a watchlist, sorted.
    #[must_use]
    pub fn tracked_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .portfolios
            .iter()
            .flat_map(|p| {
                p.traded_symbols()
                    .map(str::to_string)
                    .chain(p.watchlist.iter().cloned())
            })
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Fetch fresh quotes and FX rates for all tracked symbols.
    /// On failure the previous snapshot is kept.
    pub async fn refresh_market_data(&mut self) -> Result<(), CoreError> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(HISTORY_LOOKBACK_DAYS);
        let symbols = self.tracked_symbols();
        let snapshot = self
            .market_data_service
            .fetch_snapshot(&symbols, from, today)
            .await?;
        self.market = snapshot;
        Ok(())
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Holdings value over time in the display currency, ending with a
    /// live point for `now`.
    #[must_use]
    pub fn value_series(&self, now: DateTime<Utc>) -> Vec<SeriesPoint> {
        self.chart_service.build_value_series(
            &self.portfolios,
            &self.market.quotes,
            &self.market.fx,
            &self.settings.display_currency,
            now,
        )
    }

    /// Today's change across all tracked holdings.
    #[must_use]
    pub fn day_change(&self, now: DateTime<Utc>) -> PeriodChange {
        self.comparison_service.day_change(
            &self.portfolios,
            &self.market.quotes,
            &self.market.fx,
            &self.settings.display_currency,
            now,
        )
    }

    /// P&L change over `range`.
    #[must_use]
    pub fn range_change(&self, range: ChangeRange, now: DateTime<Utc>) -> PeriodChange {
        self.comparison_service.range_change(
            range,
            &self.portfolios,
            &self.market.quotes,
            &self.market.fx,
            &self.settings.display_currency,
            now,
        )
    }

    /// Totals, top movers, and allocation across tracked portfolios.
    #[must_use]
    pub fn totals(&self, now: DateTime<Utc>) -> PortfolioTotals {
        self.analytics_service.get_portfolio_totals(
            &self.portfolios,
            &self.market.quotes,
            &self.market.fx,
            &self.settings.display_currency,
            now,
            self.settings.top_movers,
            self.settings.allocation_slices,
        )
    }

    /// P&L of one holding in the display currency.
    pub fn holding_pnl(
        &self,
        portfolio_id: Uuid,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PnLResult>, CoreError> {
        let portfolio = self
            .get_portfolio(portfolio_id)
            .ok_or_else(|| CoreError::PortfolioNotFound(portfolio_id.to_string()))?;
        Ok(portfolio.holding(symbol).map(|holding| {
            let live = self.market.quote(&holding.symbol).and_then(|q| q.live_price());
            self.pnl_service.holding_pnl(
                holding,
                live,
                &self.market.fx,
                &self.settings.display_currency,
                now,
            )
        }))
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Set the display currency (e.g., "USD", "EUR", "SGD").
    /// Currency code must be a 3-letter alphabetic string.
    pub fn set_display_currency(&mut self, currency: &str) -> Result<(), CoreError> {
        self.settings.display_currency = normalize_currency_code(currency)?;
        Ok(())
    }

    /// Replace all settings after validating them.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), CoreError> {
        settings.validate()?;
        self.chart_service = ChartService::with_limits(settings.series_point_cap, settings.bad_tick_ratio);
        self.settings = settings;
        Ok(())
    }

    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export all portfolios as a JSON string.
    pub fn export_portfolios_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.portfolios)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize portfolios: {e}")))
    }

    /// Import portfolios from JSON, replacing any with the same id.
    /// Symbols are normalized the same way the mutation API does it.
    /// Returns the number of portfolios imported.
    pub fn import_portfolios_from_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let mut imported: Vec<Portfolio> = serde_json::from_str(json)?;
        for portfolio in &mut imported {
            portfolio.base_currency = normalize_currency_code(&portfolio.base_currency)?;
            portfolio.normalize_symbols();
        }
        let count = imported.len();
        for portfolio in imported {
            self.portfolios.retain(|p| p.id != portfolio.id);
            self.portfolios.push(portfolio);
        }
        Ok(count)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn portfolio_mut(&mut self, portfolio_id: Uuid) -> Result<&mut Portfolio, CoreError> {
        Self::find_mut(&mut self.portfolios, portfolio_id)
    }

    fn find_mut(portfolios: &mut [Portfolio], portfolio_id: Uuid) -> Result<&mut Portfolio, CoreError> {
        portfolios
            .iter_mut()
            .find(|p| p.id == portfolio_id)
            .ok_or_else(|| CoreError::PortfolioNotFound(portfolio_id.to_string()))
    }

    fn build(portfolios: Vec<Portfolio>, settings: Settings, registry: MarketDataRegistry) -> Self {
        let chart_service = ChartService::with_limits(settings.series_point_cap, settings.bad_tick_ratio);

        Self {
            portfolios,
            settings,
            market: MarketSnapshot::default(),
            portfolio_service: PortfolioService::new(),
            market_data_service: MarketDataService::new(registry),
            pnl_service: PnlService::new(),
            chart_service,
            comparison_service: ComparisonService::new(),
            analytics_service: AnalyticsService::new(),
        }
    }
}
