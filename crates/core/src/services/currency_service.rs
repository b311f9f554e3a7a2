use crate::models::fx::{FxRates, PIVOT_CURRENCY};
use crate::models::lot::Lot;
use crate::models::CurrencyCode;

/// How a symbol is matched against a currency rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPattern {
    Contains(&'static str),
    EndsWith(&'static str),
}

impl SymbolPattern {
    fn matches(&self, symbol: &str) -> bool {
        match self {
            SymbolPattern::Contains(needle) => symbol.contains(needle),
            SymbolPattern::EndsWith(suffix) => symbol.ends_with(suffix),
        }
    }
}

/// Symbol → native currency rules, evaluated top to bottom on the
/// upper-cased symbol. The first match wins.
pub const CURRENCY_RULES: &[(SymbolPattern, &str)] = &[
    (SymbolPattern::Contains("-USD"), "USD"),
    (SymbolPattern::Contains("USD"), "USD"),
    (SymbolPattern::EndsWith(".L"), "GBP"),
    (SymbolPattern::EndsWith(".T"), "JPY"),
    (SymbolPattern::EndsWith(".TO"), "CAD"),
    (SymbolPattern::EndsWith(".AX"), "AUD"),
    (SymbolPattern::EndsWith(".HK"), "HKD"),
    (SymbolPattern::EndsWith(".PA"), "EUR"),
    (SymbolPattern::EndsWith(".DE"), "EUR"),
    (SymbolPattern::EndsWith(".SW"), "CHF"),
];

/// Currency used when no rule matches.
pub const DEFAULT_SYMBOL_CURRENCY: &str = "USD";

/// Infer the native trading currency of a ticker from its shape.
///
/// Only a fallback: an explicit currency on the holding always wins.
pub fn infer_currency(symbol: &str) -> CurrencyCode {
    let upper = symbol.trim().to_uppercase();
    CURRENCY_RULES
        .iter()
        .find(|(pattern, _)| pattern.matches(&upper))
        .map_or(DEFAULT_SYMBOL_CURRENCY, |(_, code)| *code)
        .to_string()
}

/// Convert `amount` between two currencies by pivoting through USD.
///
/// Never fails. A missing or zero rate leaves the amount at the last
/// currency it could be expressed in: an unknown source is treated as
/// already being USD, an unknown destination returns the USD amount.
/// Non-finite amounts convert to 0.
pub fn convert(rates: &FxRates, amount: f64, from: &str, to: &str) -> f64 {
    if !amount.is_finite() {
        return 0.0;
    }
    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();
    if from == to {
        return amount;
    }

    let amount_usd = if from == PIVOT_CURRENCY {
        amount
    } else {
        match rates.rate(&from) {
            Some(rate) => amount / rate,
            None => {
                log::debug!("No usable FX rate for {from}; treating amount as {PIVOT_CURRENCY}");
                amount
            }
        }
    };

    if to == PIVOT_CURRENCY {
        return amount_usd;
    }
    match rates.rate(&to) {
        Some(rate) => amount_usd * rate,
        None => {
            log::debug!("No usable FX rate for {to}; returning {PIVOT_CURRENCY} amount unconverted");
            amount_usd
        }
    }
}

/// Applies [`convert`] to whole positions and lot histories.
///
/// Stateless; the rate snapshot is passed in on every call.
pub struct CurrencyService;

impl CurrencyService {
    pub fn new() -> Self {
        Self
    }

    /// Convert a unit price from `from` into `to`.
    pub fn convert_price(&self, rates: &FxRates, price: f64, from: &str, to: &str) -> f64 {
        convert(rates, price, from, to)
    }

    /// Copy of `lots` with price and fee expressed in `to`.
    /// Quantities, dates, and order are untouched.
    pub fn convert_lots(&self, rates: &FxRates, lots: &[Lot], from: &str, to: &str) -> Vec<Lot> {
        lots.iter()
            .map(|lot| Lot {
                price: convert(rates, lot.price, from, to),
                fee: convert(rates, lot.fee, from, to),
                ..lot.clone()
            })
            .collect()
    }

    /// Codes among `codes` that would take the degraded conversion path.
    /// Sorted and deduplicated; USD never appears.
    pub fn missing_rates<'a>(
        &self,
        rates: &FxRates,
        codes: impl IntoIterator<Item = &'a str>,
    ) -> Vec<CurrencyCode> {
        let mut missing: Vec<CurrencyCode> = codes
            .into_iter()
            .map(|code| code.trim().to_uppercase())
            .filter(|code| code != PIVOT_CURRENCY && rates.rate(code).is_none())
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl Default for CurrencyService {
    fn default() -> Self {
        Self::new()
    }
}
