use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// Look-back window for period-over-period comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeRange {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "5D")]
    FiveDays,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl ChangeRange {
    pub const ALL_RANGES: [ChangeRange; 7] = [
        ChangeRange::OneDay,
        ChangeRange::FiveDays,
        ChangeRange::OneMonth,
        ChangeRange::SixMonths,
        ChangeRange::YearToDate,
        ChangeRange::OneYear,
        ChangeRange::All,
    ];

    /// Number of days to look back from `now`. `None` for [`ChangeRange::All`].
    pub fn lookback_days(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            ChangeRange::OneDay => Some(1),
            ChangeRange::FiveDays => Some(5),
            ChangeRange::OneMonth => Some(30),
            ChangeRange::SixMonths => Some(180),
            ChangeRange::YearToDate => Some(i64::from(now.ordinal0())),
            ChangeRange::OneYear => Some(365),
            ChangeRange::All => None,
        }
    }

    /// Start of the window, `now - N days`.
    pub fn start_time(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lookback_days(now).map(|days| now - Duration::days(days))
    }
}

impl std::fmt::Display for ChangeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ChangeRange::OneDay => "1D",
            ChangeRange::FiveDays => "5D",
            ChangeRange::OneMonth => "1M",
            ChangeRange::SixMonths => "6M",
            ChangeRange::YearToDate => "YTD",
            ChangeRange::OneYear => "1Y",
            ChangeRange::All => "ALL",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for ChangeRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1D" => Ok(ChangeRange::OneDay),
            "5D" => Ok(ChangeRange::FiveDays),
            "1M" => Ok(ChangeRange::OneMonth),
            "6M" => Ok(ChangeRange::SixMonths),
            "YTD" => Ok(ChangeRange::YearToDate),
            "1Y" => Ok(ChangeRange::OneYear),
            "ALL" => Ok(ChangeRange::All),
            _ => Err(CoreError::InvalidRange(s.to_string())),
        }
    }
}

/// Change in value or P&L over a period, in the display currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodChange {
    /// Absolute change
    pub delta: f64,

    /// Change relative to the period's denominator, in percent
    pub percent: f64,
}

/// Valuation of one holding in one portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub portfolio_id: Uuid,

    pub symbol: String,

    /// Native currency the holding trades in
    pub native_currency: String,

    /// Units held now (clamped to ≥0)
    pub qty: f64,

    /// Weighted average cost per unit in the display currency
    pub avg_cost: f64,

    /// Live price in the display currency, `None` when no quote exists
    pub price: Option<f64>,

    /// qty × price in the display currency
    pub market_value: f64,

    pub realized: f64,

    pub unrealized: f64,

    /// unrealized / (qty × avg_cost), in percent
    pub unrealized_pct: f64,
}

impl HoldingSummary {
    pub fn cost_basis(&self) -> f64 {
        self.qty * self.avg_cost
    }
}

/// Share of total value (holdings + cash) taken by one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub symbol: String,

    /// Combined market value across tracked portfolios
    pub value: f64,

    /// value / (holdings value + cash), in percent
    pub weight: f64,
}

/// Cross-portfolio totals in the display currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioTotals {
    /// Currency used for all monetary values
    pub currency: String,

    /// Number of portfolios included (tracking enabled)
    pub portfolio_count: usize,

    /// Sum of all position market values
    pub holdings_value: f64,

    /// Sum of all cash balances, converted from each portfolio's base currency
    pub cash: f64,

    /// holdings_value + cash
    pub total_value: f64,

    /// Every holding with lots, sorted by market value (largest first)
    pub holdings: Vec<HoldingSummary>,

    /// Holdings ranked by unrealized percent (best first)
    pub top_movers: Vec<HoldingSummary>,

    /// Largest positions with their weights
    pub allocation: Vec<AllocationSlice>,
}
