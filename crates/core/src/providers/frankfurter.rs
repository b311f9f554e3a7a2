use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::fx::{FxRates, PIVOT_CURRENCY};
use super::traits::FxRateProvider;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter API provider for fiat exchange rates.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) reference rates.
/// - **Coverage**: ~30 currencies (EUR, USD, GBP, JPY, CHF, SGD, etc.)
///
/// Rates are requested with `base=USD` so the response is already a
/// USD-pivot table.
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the provider at another Frankfurter-compatible host.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct LatestResponse {
    date: String,
    rates: HashMap<String, f64>,
}

/// Turn a `/latest?base=USD` response into a rate table. USD itself is
/// always present at 1.0; unusable rates are dropped.
fn rates_from_response(resp: LatestResponse) -> FxRates {
    let timestamp = NaiveDate::parse_from_str(&resp.date, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(|_| Utc::now());

    let mut rates: HashMap<String, f64> = resp
        .rates
        .into_iter()
        .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
        .collect();
    rates.insert(PIVOT_CURRENCY.to_string(), 1.0);

    FxRates::new(timestamp, rates)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl FxRateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    async fn get_latest_rates(&self) -> Result<FxRates, CoreError> {
        let url = format!("{}/latest?base={PIVOT_CURRENCY}", self.base_url);

        let resp: LatestResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "Frankfurter".into(),
                message: format!("Failed to parse latest rates: {e}"),
            })?;

        Ok(rates_from_response(resp))
    }
}
