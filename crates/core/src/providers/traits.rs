use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::fx::FxRates;
use crate::models::quote::Quote;

/// Source of per-symbol market data: last price, day change, daily bars.
///
/// Prices are returned in the symbol's native currency.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest quote for `symbol`, with daily bars covering `from..=to`.
    async fn get_quote(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Quote, CoreError>;
}

/// Source of the USD-pivot exchange rate table.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait FxRateProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest rates as units of each currency per 1 USD.
    async fn get_latest_rates(&self) -> Result<FxRates, CoreError>;
}
