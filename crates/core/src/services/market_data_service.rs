use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::fx::FxRates;
use crate::models::market::MarketSnapshot;
use crate::models::quote::Quote;
use crate::providers::registry::MarketDataRegistry;

/// Fetches quotes and FX rates from the registered providers and packs
/// them into a [`MarketSnapshot`].
///
/// Providers are tried in registration order. A failure moves on to the
/// next provider; nothing is retried.
pub struct MarketDataService {
    registry: MarketDataRegistry,
}

impl MarketDataService {
    pub fn new(registry: MarketDataRegistry) -> Self {
        Self { registry }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    /// Fetch a snapshot for `symbols` with history covering `from..=to`.
    ///
    /// Symbols that no provider can serve are left out (the engine values
    /// them without a quote). Fails only when no FX provider answers.
    pub async fn fetch_snapshot(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<MarketSnapshot, CoreError> {
        let fx = self.fetch_rates().await?;

        let mut quotes: HashMap<String, Quote> = HashMap::new();
        for symbol in symbols {
            let upper = symbol.trim().to_uppercase();
            if upper.is_empty() || quotes.contains_key(&upper) {
                continue;
            }
            match self.fetch_quote(&upper, from, to).await {
                Ok(quote) => {
                    quotes.insert(upper, quote);
                }
                Err(e) => log::warn!("No quote for {upper}: {e}"),
            }
        }

        Ok(MarketSnapshot { quotes, fx })
    }

    /// Quote for one symbol, with fallback across providers.
    pub async fn fetch_quote(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Quote, CoreError> {
        let mut last_error = None;
        for provider in self.registry.quote_providers() {
            match provider.get_quote(symbol, from, to).await {
                Ok(mut quote) => {
                    quote.symbol = symbol.to_uppercase();
                    return Ok(quote);
                }
                Err(e) => {
                    log::warn!("{} failed for {symbol}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(format!("quote {symbol}"))))
    }

    /// Latest FX table, with fallback across providers.
    pub async fn fetch_rates(&self) -> Result<FxRates, CoreError> {
        let mut last_error = None;
        for provider in self.registry.fx_providers() {
            match provider.get_latest_rates().await {
                Ok(rates) => return Ok(rates),
                Err(e) => {
                    log::warn!("{} failed to supply FX rates: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("FX rates".into())))
    }
}
