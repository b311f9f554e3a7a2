// ═══════════════════════════════════════════════════════════════════
// Provider Tests — Registry, provider fallback, snapshot assembly
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashMap;

use holdings_tracker_core::errors::CoreError;
use holdings_tracker_core::models::fx::FxRates;
use holdings_tracker_core::models::quote::{Bar, Quote};
use holdings_tracker_core::providers::registry::MarketDataRegistry;
use holdings_tracker_core::providers::traits::{FxRateProvider, QuoteProvider};
use holdings_tracker_core::services::market_data_service::MarketDataService;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers — Mock Providers
// ═══════════════════════════════════════════════════════════════════

/// Answers every symbol with a fixed price, except those in `fails_for`.
struct MockQuoteProvider {
    name: String,
    price: f64,
    fails_for: Vec<String>,
}

impl MockQuoteProvider {
    fn new(name: &str, price: f64) -> Self {
        Self {
            name: name.to_string(),
            price,
            fails_for: Vec::new(),
        }
    }

    fn failing_for(mut self, symbol: &str) -> Self {
        self.fails_for.push(symbol.to_string());
        self
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_quote(
        &self,
        symbol: &str,
        from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Quote, CoreError> {
        if self.fails_for.iter().any(|s| s == symbol) {
            return Err(CoreError::Api {
                provider: self.name.clone(),
                message: format!("Unknown symbol {symbol}"),
            });
        }
        let bar = Bar {
            t: from.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            c: self.price,
        };
        // Lower-case on purpose: the service normalizes it.
        Ok(Quote {
            symbol: symbol.to_lowercase(),
            last: self.price,
            change: 1.0,
            bars: vec![bar],
            line: Vec::new(),
        })
    }
}

/// A quote provider that always fails.
struct FailingQuoteProvider {
    name: String,
}

#[async_trait]
impl QuoteProvider for FailingQuoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_quote(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Quote, CoreError> {
        Err(CoreError::Api {
            provider: self.name.clone(),
            message: format!("Failed for {symbol}"),
        })
    }
}

struct MockFxProvider {
    name: String,
    sgd: f64,
}

#[async_trait]
impl FxRateProvider for MockFxProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_latest_rates(&self) -> Result<FxRates, CoreError> {
        let mut rates = HashMap::new();
        rates.insert("USD".to_string(), 1.0);
        rates.insert("SGD".to_string(), self.sgd);
        Ok(FxRates::new(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(), rates))
    }
}

struct FailingFxProvider;

#[async_trait]
impl FxRateProvider for FailingFxProvider {
    fn name(&self) -> &str {
        "BrokenFx"
    }

    async fn get_latest_rates(&self) -> Result<FxRates, CoreError> {
        Err(CoreError::Network("connection refused".into()))
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn service_with(
    quote_providers: Vec<Box<dyn QuoteProvider>>,
    fx_providers: Vec<Box<dyn FxRateProvider>>,
) -> MarketDataService {
    let mut registry = MarketDataRegistry::new();
    for p in quote_providers {
        registry.register_quote_provider(p);
    }
    for p in fx_providers {
        registry.register_fx_provider(p);
    }
    MarketDataService::new(registry)
}

fn good_fx() -> Box<dyn FxRateProvider> {
    Box::new(MockFxProvider {
        name: "MockFx".into(),
        sgd: 1.35,
    })
}

// ═══════════════════════════════════════════════════════════════════
// MarketDataRegistry
// ═══════════════════════════════════════════════════════════════════

mod registry {
    use super::*;

    #[test]
    fn new_creates_empty_registry() {
        let registry = MarketDataRegistry::new();
        assert_eq!(registry.quote_providers().count(), 0);
        assert_eq!(registry.fx_providers().count(), 0);
        assert!(registry.provider_names().is_empty());
    }

    #[test]
    fn default_creates_empty_registry() {
        let registry = MarketDataRegistry::default();
        assert!(registry.provider_names().is_empty());
    }

    #[test]
    fn preserves_registration_order() {
        let mut registry = MarketDataRegistry::new();
        registry.register_quote_provider(Box::new(MockQuoteProvider::new("A", 1.0)));
        registry.register_quote_provider(Box::new(MockQuoteProvider::new("B", 1.0)));
        registry.register_fx_provider(good_fx());

        let names: Vec<&str> = registry.quote_providers().map(|p| p.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(registry.provider_names(), vec!["A", "B", "MockFx"]);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn defaults_register_yahoo_and_frankfurter() {
        let registry = MarketDataRegistry::new_with_defaults();
        assert_eq!(registry.provider_names(), vec!["Yahoo Finance", "Frankfurter"]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// MarketDataService — quotes
// ═══════════════════════════════════════════════════════════════════

mod fetch_quote {
    use super::*;

    #[tokio::test]
    async fn first_provider_wins() {
        let service = service_with(
            vec![
                Box::new(MockQuoteProvider::new("Primary", 10.0)),
                Box::new(MockQuoteProvider::new("Fallback", 20.0)),
            ],
            vec![],
        );
        let quote = service.fetch_quote("aapl", day(2025, 1, 1), day(2025, 1, 10)).await.unwrap();
        assert_eq!(quote.last, 10.0);
        assert_eq!(quote.symbol, "AAPL");
    }

    #[tokio::test]
    async fn falls_back_after_failure() {
        let service = service_with(
            vec![
                Box::new(FailingQuoteProvider { name: "Broken".into() }),
                Box::new(MockQuoteProvider::new("Fallback", 20.0)),
            ],
            vec![],
        );
        let quote = service.fetch_quote("AAPL", day(2025, 1, 1), day(2025, 1, 10)).await.unwrap();
        assert_eq!(quote.last, 20.0);
    }

    #[tokio::test]
    async fn all_failing_returns_last_error() {
        let service = service_with(
            vec![
                Box::new(FailingQuoteProvider { name: "First".into() }),
                Box::new(FailingQuoteProvider { name: "Second".into() }),
            ],
            vec![],
        );
        let err = service
            .fetch_quote("AAPL", day(2025, 1, 1), day(2025, 1, 10))
            .await
            .unwrap_err();
        match err {
            CoreError::Api { provider, .. } => assert_eq!(provider, "Second"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_provider_registered() {
        let service = service_with(vec![], vec![]);
        let err = service
            .fetch_quote("AAPL", day(2025, 1, 1), day(2025, 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoProvider(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// MarketDataService — FX rates
// ═══════════════════════════════════════════════════════════════════

mod fetch_rates {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_next_fx_provider() {
        let service = service_with(vec![], vec![Box::new(FailingFxProvider), good_fx()]);
        let rates = service.fetch_rates().await.unwrap();
        assert_eq!(rates.rate("SGD"), Some(1.35));
    }

    #[tokio::test]
    async fn all_failing_returns_last_error() {
        let service = service_with(vec![], vec![Box::new(FailingFxProvider)]);
        let err = service.fetch_rates().await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn no_fx_provider_registered() {
        let service = service_with(vec![], vec![]);
        let err = service.fetch_rates().await.unwrap_err();
        assert!(matches!(err, CoreError::NoProvider(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// MarketDataService — snapshots
// ═══════════════════════════════════════════════════════════════════

mod fetch_snapshot {
    use super::*;

    #[tokio::test]
    async fn unavailable_symbols_are_left_out() {
        let service = service_with(
            vec![Box::new(MockQuoteProvider::new("Mock", 10.0).failing_for("DELISTED"))],
            vec![good_fx()],
        );
        let symbols = vec!["AAPL".to_string(), "DELISTED".to_string()];

        let snapshot = service
            .fetch_snapshot(&symbols, day(2025, 1, 1), day(2025, 1, 10))
            .await
            .unwrap();

        assert_eq!(snapshot.quotes.len(), 1);
        assert!(snapshot.quote("aapl").is_some());
        assert!(snapshot.quote("DELISTED").is_none());
        assert_eq!(snapshot.fx.rate("SGD"), Some(1.35));
    }

    #[tokio::test]
    async fn symbols_are_normalized_and_deduplicated() {
        let service = service_with(
            vec![Box::new(MockQuoteProvider::new("Mock", 10.0))],
            vec![good_fx()],
        );
        let symbols = vec!["vod.l".to_string(), " VOD.L ".to_string(), String::new()];

        let snapshot = service
            .fetch_snapshot(&symbols, day(2025, 1, 1), day(2025, 1, 10))
            .await
            .unwrap();

        assert_eq!(snapshot.quotes.len(), 1);
        assert_eq!(snapshot.quotes["VOD.L"].symbol, "VOD.L");
    }

    #[tokio::test]
    async fn missing_fx_fails_the_snapshot() {
        let service = service_with(
            vec![Box::new(MockQuoteProvider::new("Mock", 10.0))],
            vec![Box::new(FailingFxProvider)],
        );
        let result = service
            .fetch_snapshot(&["AAPL".to_string()], day(2025, 1, 1), day(2025, 1, 10))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_symbol_list_still_carries_rates() {
        let service = service_with(vec![], vec![good_fx()]);
        let snapshot = service
            .fetch_snapshot(&[], day(2025, 1, 1), day(2025, 1, 10))
            .await
            .unwrap();
        assert!(snapshot.quotes.is_empty());
        assert_eq!(snapshot.fx.rate("USD"), Some(1.0));
    }
}
