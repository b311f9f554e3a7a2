use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::quote::{Bar, Quote};
use super::traits::QuoteProvider;

/// Yahoo Finance quote provider.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices, crypto pairs (`BTC-USD`).
/// - **Data**: Latest quote + daily history.
///
/// Prices come back in the symbol's native currency (`VOD.L` in GBP,
/// `7203.T` in JPY). Conversion happens later in the engine.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| api_error(format!(
            "Failed to create connector: {e}"
        )))?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let ts = date.and_time(NaiveTime::MIN).and_utc().timestamp();
        OffsetDateTime::from_unix_timestamp(ts)
            .map_err(|e| api_error(format!("Invalid date {date}: {e}")))
    }

    fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(ts, 0)
    }
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: "Yahoo Finance".into(),
        message,
    }
}

/// Day change: `last` minus the close of the latest bar from an earlier
/// day than `last_at`. Zero when there is no earlier bar.
pub(crate) fn day_change(bars: &[Bar], last: f64, last_at: DateTime<Utc>) -> f64 {
    bars.iter()
        .filter(|b| b.t.date_naive() < last_at.date_naive())
        .max_by_key(|b| b.t)
        .map_or(0.0, |prev| last - prev.c)
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn get_quote(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Quote, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?; // inclusive end

        let history = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| api_error(format!("Failed to fetch history for {symbol}: {e}")))?;

        let raw = history
            .quotes()
            .map_err(|e| api_error(format!("Failed to parse quotes for {symbol}: {e}")))?;

        let mut bars: Vec<Bar> = raw
            .iter()
            .filter_map(|q| {
                Some(Bar {
                    t: Self::timestamp_to_datetime(q.timestamp)?,
                    c: q.close,
                })
            })
            .collect();
        bars.sort_by_key(|b| b.t);

        let latest = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| api_error(format!("Failed to fetch latest quote for {symbol}: {e}")))?;

        let last_quote = latest
            .last_quote()
            .map_err(|e| api_error(format!("No quote data for {symbol}: {e}")))?;
        let last_at = Self::timestamp_to_datetime(last_quote.timestamp).unwrap_or_else(Utc::now);

        let change = day_change(&bars, last_quote.close, last_at);
        Ok(Quote::new(symbol, last_quote.close, change).with_bars(bars))
    }
}
