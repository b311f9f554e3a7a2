use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::chart::SeriesPoint;
use crate::models::fx::FxRates;
use crate::models::lot::{position_after, Lot};
use crate::models::portfolio::Portfolio;
use crate::models::quote::Quote;
use crate::services::currency_service::convert;

/// Default number of points kept in a value series.
pub const DEFAULT_SERIES_POINT_CAP: usize = 520;

/// Default bad-tick factor: a jump above 5x or below 1/5x is discarded.
pub const DEFAULT_BAD_TICK_RATIO: f64 = 5.0;

/// The lots of one holding, valued in that holding's native currency.
///
/// A symbol held in several portfolios appears once per holding. Each
/// position is clamped on its own before values are summed.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLots {
    pub symbol: String,

    /// Native currency of the holding
    pub currency: String,

    /// Lots sorted by date
    pub lots: Vec<Lot>,
}

/// Builds the chronological portfolio value series used by the chart.
///
/// Each call recomputes from scratch. Historical prices are converted with
/// the single FX snapshot given, so long look-backs drift with today's
/// rates. Cash is not part of the series.
pub struct ChartService {
    point_cap: usize,
    bad_tick_ratio: f64,
}

impl ChartService {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SERIES_POINT_CAP, DEFAULT_BAD_TICK_RATIO)
    }

    pub fn with_limits(point_cap: usize, bad_tick_ratio: f64) -> Self {
        Self {
            point_cap: point_cap.max(1),
            bad_tick_ratio,
        }
    }

    /// Value series over every tracked portfolio.
    ///
    /// Every holding is valued separately, so one portfolio's over-sold
    /// lots never offset another portfolio's units. Cash event dates of
    /// tracked portfolios add points to the timeline.
    pub fn build_value_series(
        &self,
        portfolios: &[Portfolio],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        now: DateTime<Utc>,
    ) -> Vec<SeriesPoint> {
        let tracked: Vec<&Portfolio> = portfolios.iter().filter(|p| p.tracking_enabled).collect();

        let positions: Vec<SymbolLots> = tracked
            .iter()
            .flat_map(|p| p.holdings.values())
            .filter(|h| h.has_lots())
            .map(|holding| {
                let mut lots = holding.lots.clone();
                lots.sort_by_key(|lot| lot.date);
                SymbolLots {
                    symbol: holding.symbol.clone(),
                    currency: holding.native_currency(),
                    lots,
                }
            })
            .collect();

        let cash_dates: BTreeSet<NaiveDate> = tracked
            .iter()
            .flat_map(|p| p.cash_events.iter().map(|e| e.date.date_naive()))
            .collect();

        self.value_series_from_lots(&positions, quotes, rates, display_currency, &cash_dates, now)
    }

    /// Value series for an explicit set of positions.
    ///
    /// `extra_dates` (cash event days) are merged into the timeline but add
    /// no value of their own.
    pub fn value_series_from_lots(
        &self,
        symbols: &[SymbolLots],
        quotes: &HashMap<String, Quote>,
        rates: &FxRates,
        display_currency: &str,
        extra_dates: &BTreeSet<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Vec<SeriesPoint> {
        // 1. Clean per-symbol price maps and collect the global timeline.
        let mut timeline: BTreeSet<NaiveDate> = extra_dates.clone();
        let mut clean: HashMap<&str, BTreeMap<NaiveDate, f64>> = HashMap::new();
        for s in symbols {
            if clean.contains_key(s.symbol.as_str()) {
                continue;
            }
            let Some(quote) = quotes.get(&s.symbol) else {
                log::debug!("No quote for {}; it contributes nothing to the series", s.symbol);
                continue;
            };
            timeline.extend(quote.history().iter().map(|(t, _)| t.date_naive()));
            clean.insert(s.symbol.as_str(), clean_price_history(quote, self.bad_tick_ratio));
        }
        let dates: Vec<NaiveDate> = timeline.into_iter().collect();

        // 2. Forward-fill and value every date.
        let mut totals = vec![0.0_f64; dates.len()];
        for s in symbols {
            let Some(prices) = clean.get(s.symbol.as_str()) else {
                continue;
            };
            let filled = forward_fill(prices, &dates);

            let mut lots = s.lots.iter().peekable();
            let mut held = 0.0_f64;
            for (idx, date) in dates.iter().enumerate() {
                while let Some(lot) = lots.next_if(|lot| lot.date.date_naive() <= *date) {
                    held = lot.apply_to_position(held);
                }
                if let Some(price) = filled[idx] {
                    if held > 0.0 {
                        totals[idx] += held * convert(rates, price, &s.currency, display_currency);
                    }
                }
            }
        }

        let mut series: Vec<SeriesPoint> = dates
            .iter()
            .zip(totals)
            .map(|(date, v)| SeriesPoint {
                t: start_of_day(*date),
                v,
            })
            .collect();

        // 3. Live point from current quotes.
        let live_value: f64 = symbols
            .iter()
            .filter_map(|s| {
                let quote = quotes.get(&s.symbol)?;
                let price = quote
                    .live_price()
                    .or_else(|| clean.get(s.symbol.as_str())?.values().next_back().copied())?;
                let qty = position_after(s.lots.iter().filter(|lot| lot.date <= now));
                Some(qty * convert(rates, price, &s.currency, display_currency))
            })
            .sum();
        let live = SeriesPoint { t: now, v: live_value };
        let same_day = series
            .last()
            .is_some_and(|last| last.t.date_naive() == now.date_naive());
        if same_day {
            series.pop();
        }
        series.push(live);

        // 4. Drop the leading run of zeros, keep the most recent points.
        let first_nonzero = series.iter().position(|p| p.v != 0.0).unwrap_or(series.len());
        series.drain(..first_nonzero);
        let excess = series.len().saturating_sub(self.point_cap);
        series.drain(..excess);
        series
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}

/// Day → price map from a quote's bars (or its price line when there are
/// no bars), scanned in time order.
///
/// A price above `ratio` times, or below `1/ratio` times, the last accepted
/// price is a bad tick and is skipped. Non-positive or non-finite prices are
/// skipped too. When a day has several observations the latest wins.
pub fn clean_price_history(quote: &Quote, ratio: f64) -> BTreeMap<NaiveDate, f64> {
    let mut points = quote.history();
    points.sort_by_key(|(t, _)| *t);

    let mut accepted = BTreeMap::new();
    let mut last_accepted: Option<f64> = None;
    for (t, price) in points {
        if !price.is_finite() || price <= 0.0 {
            log::debug!("Skipping unusable price {price} for {} at {t}", quote.symbol);
            continue;
        }
        if let Some(prev) = last_accepted {
            if price > prev * ratio || price < prev / ratio {
                log::debug!(
                    "Discarding bad tick for {} at {t}: {price} vs last accepted {prev}",
                    quote.symbol
                );
                continue;
            }
        }
        accepted.insert(t.date_naive(), price);
        last_accepted = Some(price);
    }
    accepted
}

/// Price for each of `dates` (sorted), carrying the last observation
/// forward. Dates before the first observation stay `None`.
pub fn forward_fill(prices: &BTreeMap<NaiveDate, f64>, dates: &[NaiveDate]) -> Vec<Option<f64>> {
    let mut last = None;
    dates
        .iter()
        .map(|date| {
            if let Some(price) = prices.get(date) {
                last = Some(*price);
            }
            last
        })
        .collect()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
