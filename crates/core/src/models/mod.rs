pub mod analytics;
pub mod chart;
pub mod fx;
pub mod holding;
pub mod lot;
pub mod market;
pub mod pnl;
pub mod portfolio;
pub mod quote;
pub mod settings;

/// ISO 4217 currency code, uppercased (e.g., "USD").
pub type CurrencyCode = String;
