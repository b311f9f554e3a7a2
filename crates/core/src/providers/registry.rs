use super::frankfurter::FrankfurterProvider;
use super::traits::{FxRateProvider, QuoteProvider};
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooFinanceProvider;

/// Registry of market-data providers, in priority order.
///
/// The first provider that answers wins; later ones are fallbacks.
pub struct MarketDataRegistry {
    quote_providers: Vec<Box<dyn QuoteProvider>>,
    fx_providers: Vec<Box<dyn FxRateProvider>>,
}

impl MarketDataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            quote_providers: Vec::new(),
            fx_providers: Vec::new(),
        }
    }

    /// Create a registry with the default providers pre-configured.
    pub fn new_with_defaults() -> Self {
        let mut registry = Self::new();

        // Yahoo Finance: quotes, no key. Native only.
        #[cfg(not(target_arch = "wasm32"))]
        {
            match YahooFinanceProvider::new() {
                Ok(yahoo) => registry.register_quote_provider(Box::new(yahoo)),
                Err(e) => log::warn!("Yahoo Finance provider unavailable: {e}"),
            }
        }

        // Frankfurter: ECB reference rates, no key
        registry.register_fx_provider(Box::new(FrankfurterProvider::new()));

        registry
    }

    pub fn register_quote_provider(&mut self, provider: Box<dyn QuoteProvider>) {
        self.quote_providers.push(provider);
    }

    pub fn register_fx_provider(&mut self, provider: Box<dyn FxRateProvider>) {
        self.fx_providers.push(provider);
    }

    pub fn quote_providers(&self) -> impl Iterator<Item = &dyn QuoteProvider> {
        self.quote_providers.iter().map(|p| p.as_ref())
    }

    pub fn fx_providers(&self) -> impl Iterator<Item = &dyn FxRateProvider> {
        self.fx_providers.iter().map(|p| p.as_ref())
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.quote_providers
            .iter()
            .map(|p| p.name().to_string())
            .chain(self.fx_providers.iter().map(|p| p.name().to_string()))
            .collect()
    }
}

impl Default for MarketDataRegistry {
    fn default() -> Self {
        Self::new()
    }
}
