//! Tests for the market data providers
//!
//! Covers the replay provider's cursor contract (advance on get, stay on
//! peek, wrap at the series end), spread derivation, the volatility proxy
//! floor, and the gated live placeholder.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use brokersim::services::{
    LiveMarketData, ManualClock, MarketDataError, MarketDataProvider, ReplayDataset,
    ReplayMarketData, SeriesConfig,
};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at(
        Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap(),
    ))
}

fn dataset_with(symbol: &str, series: Vec<f64>, spread_bps: Option<f64>) -> ReplayDataset {
    let mut symbols = BTreeMap::new();
    symbols.insert(symbol.to_string(), SeriesConfig { series, spread_bps });
    ReplayDataset { symbols }
}

mod replay_tests {
    use super::*;

    #[test]
    fn test_quote_shape() {
        let provider = ReplayMarketData::new(ReplayDataset::builtin(), 8.0, clock());
        let quote = provider.get_quote("AAPL").unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert!(quote.bid < quote.mid);
        assert!(quote.mid < quote.ask);
        // ask - bid = mid * spreadBps / 10000, up to 6-dp rounding of each leg
        let expected_spread = quote.mid * quote.spread_bps / 10_000.0;
        assert!((quote.ask - quote.bid - expected_spread).abs() < 2e-6);
        assert!(quote.volatility_proxy >= 0.001);
    }

    #[test]
    fn test_get_advances_peek_does_not() {
        let provider =
            ReplayMarketData::new(dataset_with("ACME", vec![10.0, 11.0, 12.0], None), 8.0, clock());

        assert_eq!(provider.peek_quote("ACME").unwrap().mid, 10.0);
        assert_eq!(provider.peek_quote("ACME").unwrap().mid, 10.0);
        assert_eq!(provider.get_quote("ACME").unwrap().mid, 10.0);
        assert_eq!(provider.peek_quote("ACME").unwrap().mid, 11.0);
        assert_eq!(provider.get_quote("ACME").unwrap().mid, 11.0);
    }

    #[test]
    fn test_cursor_wraps() {
        let provider =
            ReplayMarketData::new(dataset_with("ACME", vec![10.0, 11.0, 12.0], None), 8.0, clock());

        let first: Vec<f64> = (0..3).map(|_| provider.get_quote("ACME").unwrap().mid).collect();
        assert_eq!(first, vec![10.0, 11.0, 12.0]);
        assert_eq!(provider.get_quote("ACME").unwrap().mid, 10.0);
    }

    #[test]
    fn test_per_symbol_cursors_are_independent() {
        let mut symbols = BTreeMap::new();
        symbols.insert(
            "AAA".to_string(),
            SeriesConfig { series: vec![1.0, 2.0], spread_bps: None },
        );
        symbols.insert(
            "BBB".to_string(),
            SeriesConfig { series: vec![5.0, 6.0], spread_bps: None },
        );
        let provider = ReplayMarketData::new(ReplayDataset { symbols }, 8.0, clock());

        provider.get_quote("AAA").unwrap();
        assert_eq!(provider.peek_quote("AAA").unwrap().mid, 2.0);
        assert_eq!(provider.peek_quote("BBB").unwrap().mid, 5.0);
    }

    #[test]
    fn test_default_spread_applies_when_unset() {
        let provider =
            ReplayMarketData::new(dataset_with("ACME", vec![100.0], None), 20.0, clock());
        let quote = provider.peek_quote("ACME").unwrap();
        assert_eq!(quote.spread_bps, 20.0);
        // half = 100 * 20 / 20000 = 0.1
        assert_eq!(quote.bid, 99.9);
        assert_eq!(quote.ask, 100.1);
    }

    #[test]
    fn test_single_point_series_has_floor_volatility() {
        let provider = ReplayMarketData::new(dataset_with("ACME", vec![50.0], None), 8.0, clock());
        assert_eq!(provider.peek_quote("ACME").unwrap().volatility_proxy, 0.001);
    }

    #[test]
    fn test_unknown_symbol() {
        let provider = ReplayMarketData::new(ReplayDataset::builtin(), 8.0, clock());
        assert!(matches!(
            provider.get_quote("NOPE"),
            Err(MarketDataError::UnknownSymbol(_))
        ));
        assert!(matches!(
            provider.peek_quote("NOPE"),
            Err(MarketDataError::UnknownSymbol(_))
        ));
    }
}

mod live_tests {
    use super::*;

    #[test]
    fn test_disabled_refuses() {
        let provider = LiveMarketData::new(false);
        assert!(matches!(
            provider.get_quote("AAPL"),
            Err(MarketDataError::LiveDisabled)
        ));
    }

    #[test]
    fn test_enabled_is_still_a_placeholder() {
        let provider = LiveMarketData::new(true);
        assert!(matches!(
            provider.get_quote("AAPL"),
            Err(MarketDataError::LiveUnavailable)
        ));
        assert!(matches!(
            provider.peek_quote("AAPL"),
            Err(MarketDataError::LiveUnavailable)
        ));
    }
}
