use chrono::{DateTime, Duration, TimeZone, Utc};
use holdings_tracker_core::models::analytics::ChangeRange;
use holdings_tracker_core::models::fx::FxRates;
use holdings_tracker_core::models::holding::Holding;
use holdings_tracker_core::models::lot::{position_after, Lot, LotSide};
use holdings_tracker_core::models::market::MarketSnapshot;
use holdings_tracker_core::models::pnl::PnLResult;
use holdings_tracker_core::models::portfolio::Portfolio;
use holdings_tracker_core::models::quote::{Bar, LinePoint, Quote};
use holdings_tracker_core::models::settings::Settings;
use std::collections::HashMap;

fn t(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
//  Lot
// ═══════════════════════════════════════════════════════════════════

mod lot {
    use super::*;

    #[test]
    fn display_side() {
        assert_eq!(LotSide::Buy.to_string(), "Buy");
        assert_eq!(LotSide::Sell.to_string(), "Sell");
    }

    #[test]
    fn signed_qty_follows_side() {
        assert_eq!(Lot::buy(3.0, 10.0, 0.0, t(2025, 1, 1)).signed_qty(), 3.0);
        assert_eq!(Lot::sell(2.0, 10.0, 0.0, t(2025, 1, 1)).signed_qty(), -2.0);
    }

    #[test]
    fn sells_floor_the_position_at_zero() {
        let lots = [
            Lot::buy(2.0, 10.0, 0.0, t(2025, 1, 1)),
            Lot::sell(3.0, 10.0, 0.0, t(2025, 1, 2)),
            Lot::buy(4.0, 10.0, 0.0, t(2025, 1, 3)),
        ];
        assert_eq!(lots[1].apply_to_position(2.0), 0.0);
        assert_eq!(position_after(&lots), 4.0);
        assert_eq!(position_after(&lots[..2]), 0.0);
    }

    #[test]
    fn each_lot_gets_a_fresh_id() {
        let a = Lot::buy(1.0, 1.0, 0.0, t(2025, 1, 1));
        let b = Lot::buy(1.0, 1.0, 0.0, t(2025, 1, 1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn with_notes_attaches_text() {
        let lot = Lot::buy(1.0, 1.0, 0.0, t(2025, 1, 1)).with_notes("IBKR");
        assert_eq!(lot.notes.as_deref(), Some("IBKR"));
    }

    #[test]
    fn deserializes_without_fee_or_notes() {
        let json = r#"{
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "side": "Sell",
            "qty": 4.0,
            "price": 12.5,
            "date": "2025-03-01T00:00:00Z"
        }"#;
        let lot: Lot = serde_json::from_str(json).unwrap();
        assert_eq!(lot.side, LotSide::Sell);
        assert_eq!(lot.fee, 0.0);
        assert!(lot.notes.is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Holding
// ═══════════════════════════════════════════════════════════════════

mod holding {
    use super::*;

    #[test]
    fn new_uppercases_symbol() {
        assert_eq!(Holding::new(" vod.l ").symbol, "VOD.L");
    }

    #[test]
    fn explicit_currency_wins_over_inference() {
        let h = Holding::with_currency("VOD.L", "usd");
        assert_eq!(h.native_currency(), "USD");
    }

    #[test]
    fn currency_is_inferred_when_absent() {
        assert_eq!(Holding::new("VOD.L").native_currency(), "GBP");
        assert_eq!(Holding::new("AAPL").native_currency(), "USD");
    }

    #[test]
    fn quantity_as_of_only_counts_past_lots() {
        let mut h = Holding::new("AAPL");
        h.insert_lot(Lot::buy(10.0, 100.0, 0.0, t(2025, 1, 1)));
        h.insert_lot(Lot::sell(4.0, 110.0, 0.0, t(2025, 2, 1)));
        h.insert_lot(Lot::buy(1.0, 120.0, 0.0, t(2025, 3, 1)));

        assert_eq!(h.quantity_as_of(t(2024, 12, 31)), 0.0);
        assert_eq!(h.quantity_as_of(t(2025, 1, 1)), 10.0);
        assert_eq!(h.quantity_as_of(t(2025, 2, 15)), 6.0);
        assert_eq!(h.quantity_as_of(t(2025, 3, 1)), 7.0);
    }

    #[test]
    fn oversold_quantity_is_negative_but_position_size_clamps() {
        let mut h = Holding::new("AAPL");
        h.insert_lot(Lot::buy(1.0, 100.0, 0.0, t(2025, 1, 1)));
        h.insert_lot(Lot::sell(3.0, 100.0, 0.0, t(2025, 1, 2)));

        assert_eq!(h.quantity_as_of(t(2025, 1, 3)), -2.0);
        assert_eq!(h.position_size_as_of(t(2025, 1, 3)), 0.0);
    }

    #[test]
    fn buy_after_oversell_starts_from_zero() {
        let mut h = Holding::new("AAPL");
        h.insert_lot(Lot::sell(5.0, 10.0, 0.0, t(2025, 1, 2)));
        h.insert_lot(Lot::buy(10.0, 10.0, 0.0, t(2025, 1, 3)));

        assert_eq!(h.quantity_as_of(t(2025, 1, 4)), 5.0);
        assert_eq!(h.position_size_as_of(t(2025, 1, 4)), 10.0);
        assert_eq!(h.position_size_as_of(t(2025, 1, 2)), 0.0);
    }

    #[test]
    fn insert_lot_keeps_date_order_and_insertion_order_on_ties() {
        let mut h = Holding::new("AAPL");
        let late = Lot::buy(1.0, 1.0, 0.0, t(2025, 5, 1));
        let first_tie = Lot::buy(2.0, 1.0, 0.0, t(2025, 3, 1));
        let second_tie = Lot::sell(1.0, 1.0, 0.0, t(2025, 3, 1));
        let early = Lot::buy(3.0, 1.0, 0.0, t(2025, 1, 1));

        let ids = [early.id, first_tie.id, second_tie.id, late.id];
        h.insert_lot(late);
        h.insert_lot(first_tie);
        h.insert_lot(second_tie);
        h.insert_lot(early);

        let got: Vec<_> = h.lots.iter().map(|l| l.id).collect();
        assert_eq!(got, ids);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Portfolio
// ═══════════════════════════════════════════════════════════════════

mod portfolio {
    use super::*;

    #[test]
    fn new_portfolio_is_tracked_and_empty() {
        let p = Portfolio::new("Brokerage", "sgd");
        assert_eq!(p.base_currency, "SGD");
        assert!(p.tracking_enabled);
        assert!(p.holdings.is_empty());
        assert_eq!(p.cash, 0.0);
    }

    #[test]
    fn tracking_defaults_to_true_when_missing_from_json() {
        let json = r#"{
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "base_currency": "USD"
        }"#;
        let p: Portfolio = serde_json::from_str(json).unwrap();
        assert!(p.tracking_enabled);
        assert!(p.watchlist.is_empty());
    }

    #[test]
    fn holding_lookup_is_case_insensitive() {
        let mut p = Portfolio::default();
        p.holdings.insert("AAPL".into(), Holding::new("AAPL"));
        assert!(p.holding("aapl").is_some());
        assert!(p.holding("MSFT").is_none());
    }

    #[test]
    fn traded_symbols_skip_holdings_without_lots() {
        let mut p = Portfolio::default();
        let mut aapl = Holding::new("AAPL");
        aapl.insert_lot(Lot::buy(1.0, 1.0, 0.0, t(2025, 1, 1)));
        p.holdings.insert("AAPL".into(), aapl);
        p.holdings.insert("VOD.L".into(), Holding::with_currency("VOD.L", "GBP"));

        let symbols: Vec<&str> = p.traded_symbols().collect();
        assert_eq!(symbols, vec!["AAPL"]);
    }

    #[test]
    fn normalize_symbols_rekeys_and_merges() {
        let mut p = Portfolio::default();
        let mut lower = Holding {
            symbol: "aapl".into(),
            currency: Some("usd".into()),
            lots: Vec::new(),
        };
        lower.lots.push(Lot::buy(2.0, 1.0, 0.0, t(2025, 2, 1)));
        let mut upper = Holding::new("AAPL");
        upper.insert_lot(Lot::buy(1.0, 1.0, 0.0, t(2025, 1, 1)));
        p.holdings.insert("aapl".into(), lower);
        p.holdings.insert("AAPL".into(), upper);
        p.watchlist = vec!["nvda".into(), "NVDA".into(), " ".into()];

        p.normalize_symbols();

        assert_eq!(p.holdings.len(), 1);
        let h = &p.holdings["AAPL"];
        assert_eq!(h.symbol, "AAPL");
        assert_eq!(h.currency.as_deref(), Some("USD"));
        let dates: Vec<_> = h.lots.iter().map(|l| l.date).collect();
        assert_eq!(dates, vec![t(2025, 1, 1), t(2025, 2, 1)]);
        assert_eq!(p.watchlist, vec!["NVDA".to_string()]);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Quote
// ═══════════════════════════════════════════════════════════════════

mod quote {
    use super::*;

    #[test]
    fn live_price_rejects_unusable_values() {
        assert_eq!(Quote::new("A", 10.0, 0.0).live_price(), Some(10.0));
        assert_eq!(Quote::new("A", 0.0, 0.0).live_price(), None);
        assert_eq!(Quote::new("A", f64::NAN, 0.0).live_price(), None);
    }

    #[test]
    fn history_prefers_bars_over_line() {
        let q = Quote::new("A", 1.0, 0.0)
            .with_bars(vec![Bar { t: t(2025, 1, 1), c: 5.0 }])
            .with_line(vec![LinePoint { t: t(2025, 1, 1), v: 7.0 }]);
        assert_eq!(q.history(), vec![(t(2025, 1, 1), 5.0)]);
    }

    #[test]
    fn history_falls_back_to_line() {
        let q = Quote::new("A", 1.0, 0.0).with_line(vec![LinePoint { t: t(2025, 1, 1), v: 7.0 }]);
        assert_eq!(q.history(), vec![(t(2025, 1, 1), 7.0)]);
    }

    #[test]
    fn price_at_picks_latest_bar_not_after_instant() {
        let q = Quote::new("A", 1.0, 0.0).with_bars(vec![
            Bar { t: t(2025, 1, 3), c: 30.0 },
            Bar { t: t(2025, 1, 1), c: 10.0 },
            Bar { t: t(2025, 1, 2), c: 20.0 },
        ]);
        assert_eq!(q.price_at(t(2025, 1, 2) + Duration::hours(5)), Some(20.0));
        assert_eq!(q.price_at(t(2025, 1, 3)), Some(30.0));
        assert_eq!(q.price_at(t(2024, 12, 31)), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  FxRates & MarketSnapshot
// ═══════════════════════════════════════════════════════════════════

mod fx {
    use super::*;

    #[test]
    fn codes_are_uppercased_and_base_is_usd() {
        let fx = FxRates::new(t(2025, 1, 1), HashMap::from([("sgd".to_string(), 1.35)]));
        assert_eq!(fx.base, "USD");
        assert_eq!(fx.rate("SGD"), Some(1.35));
        assert_eq!(fx.rate("sgd"), Some(1.35));
    }

    #[test]
    fn zero_and_non_finite_rates_are_unusable() {
        let fx = FxRates::new(
            t(2025, 1, 1),
            HashMap::from([
                ("EUR".to_string(), 0.0),
                ("JPY".to_string(), f64::INFINITY),
            ]),
        );
        assert_eq!(fx.rate("EUR"), None);
        assert_eq!(fx.rate("JPY"), None);
        assert_eq!(fx.rate("CHF"), None);
    }

    #[test]
    fn snapshot_indexes_quotes_by_symbol() {
        let snapshot = MarketSnapshot::new(vec![Quote::new("aapl", 200.0, 1.0)], FxRates::default());
        assert_eq!(snapshot.quote("AAPL").map(|q| q.last), Some(200.0));
        assert_eq!(snapshot.quote("aapl").map(|q| q.last), Some(200.0));
    }

    #[test]
    fn deserialized_snapshot_is_rekeyed_when_normalized() {
        let json = r#"{
            "quotes": {"vod.l": {"symbol": "vod.l", "last": 0.8}},
            "fx": {"base": "USD", "timestamp": "2025-01-01T00:00:00Z", "rates": {"gbp": 0.8}}
        }"#;
        let raw: MarketSnapshot = serde_json::from_str(json).unwrap();
        assert!(raw.quotes.get("VOD.L").is_none());

        let snapshot = raw.normalized();
        assert_eq!(snapshot.quotes["VOD.L"].symbol, "VOD.L");
        assert!(snapshot.fx.rates.contains_key("GBP"));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  PnLResult, ChangeRange, Settings
// ═══════════════════════════════════════════════════════════════════

mod pnl_result {
    use super::*;

    #[test]
    fn total_and_cost_basis() {
        let r = PnLResult { qty: 2.0, avg_cost: 50.0, realized: 10.0, unrealized: -4.0 };
        assert_eq!(r.total(), 6.0);
        assert_eq!(r.cost_basis(), 100.0);
    }

    #[test]
    fn cost_basis_is_zero_when_flat() {
        let r = PnLResult { qty: 0.0, avg_cost: 50.0, realized: 10.0, unrealized: 0.0 };
        assert_eq!(r.cost_basis(), 0.0);
    }
}

mod change_range {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip_labels() {
        for label in ["1D", "5D", "1M", "6M", "YTD", "1Y", "ALL"] {
            let range: ChangeRange = label.parse().unwrap();
            assert_eq!(range.to_string(), label);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("ytd".parse::<ChangeRange>().unwrap(), ChangeRange::YearToDate);
    }

    #[test]
    fn all_has_no_start() {
        assert_eq!(ChangeRange::All.start_time(t(2025, 6, 1)), None);
    }

    #[test]
    fn bounded_ranges_look_back_n_days() {
        let now = t(2025, 6, 15);
        assert_eq!(ChangeRange::OneDay.start_time(now), Some(now - Duration::days(1)));
        assert_eq!(ChangeRange::FiveDays.start_time(now), Some(now - Duration::days(5)));
        assert_eq!(ChangeRange::OneYear.start_time(now), Some(now - Duration::days(365)));
    }

    #[test]
    fn ytd_starts_on_january_first() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0).unwrap();
        let start = ChangeRange::YearToDate.start_time(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 1, 15, 30, 0).unwrap());
    }

    #[test]
    fn serde_uses_short_labels() {
        assert_eq!(serde_json::to_string(&ChangeRange::SixMonths).unwrap(), "\"6M\"");
    }
}

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.display_currency, "USD");
        assert_eq!(s.series_point_cap, 520);
        assert_eq!(s.bad_tick_ratio, 5.0);
    }

    #[test]
    fn from_json_fills_missing_fields_and_normalizes_currency() {
        let s = Settings::from_json(r#"{"display_currency": "sgd"}"#).unwrap();
        assert_eq!(s.display_currency, "SGD");
        assert_eq!(s.series_point_cap, 520);
    }

    #[test]
    fn from_json_rejects_bad_currency() {
        assert!(Settings::from_json(r#"{"display_currency": "dollars"}"#).is_err());
    }

    #[test]
    fn from_json_rejects_ratio_at_or_below_one() {
        assert!(Settings::from_json(r#"{"bad_tick_ratio": 1.0}"#).is_err());
    }

    #[test]
    fn from_json_rejects_zero_cap() {
        assert!(Settings::from_json(r#"{"series_point_cap": 0}"#).is_err());
    }

    #[test]
    fn to_json_roundtrips() {
        let s = Settings { display_currency: "EUR".into(), ..Settings::default() };
        let back = Settings::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(s, back);
    }
}
