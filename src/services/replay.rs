//! Replay Market Data
//!
//! Cycles through a canned per-symbol price series. The cursor advances
//! atomically on every `get_quote` and wraps modulo the series length, so
//! the feed never runs dry. Bid and ask are derived from the mid and the
//! configured spread; the volatility proxy is the coefficient of variation
//! over a trailing window of the series.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::services::clock::Clock;
use crate::services::dataset::ReplayDataset;
use crate::services::ledger::round6;
use crate::services::market_data::{MarketDataError, MarketDataProvider};
use crate::types::Quote;

/// Trailing window length for the volatility proxy.
const VOLATILITY_WINDOW: usize = 5;
/// Volatility proxy floor, also returned when the window has < 2 points.
const VOLATILITY_FLOOR: f64 = 0.001;

struct SymbolSeries {
    series: Vec<f64>,
    spread_bps: f64,
    cursor: AtomicUsize,
}

/// Replaying market data provider.
pub struct ReplayMarketData {
    symbols: HashMap<String, SymbolSeries>,
    clock: Arc<dyn Clock>,
}

impl ReplayMarketData {
    pub fn new(dataset: ReplayDataset, default_spread_bps: f64, clock: Arc<dyn Clock>) -> Self {
        let symbols = dataset
            .symbols
            .into_iter()
            .map(|(symbol, config)| {
                let entry = SymbolSeries {
                    series: config.series,
                    spread_bps: config.spread_bps.unwrap_or(default_spread_bps),
                    cursor: AtomicUsize::new(0),
                };
                (symbol.to_uppercase(), entry)
            })
            .collect();
        Self { symbols, clock }
    }

    fn entry(&self, symbol: &str) -> Result<&SymbolSeries, MarketDataError> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| MarketDataError::UnknownSymbol(symbol.to_string()))
    }

    fn quote_at(&self, symbol: &str, entry: &SymbolSeries, index: usize) -> Quote {
        let mid = entry.series[index];
        let half = round6(mid * entry.spread_bps / 20_000.0);
        Quote {
            symbol: symbol.to_string(),
            bid: round6(mid - half),
            ask: round6(mid + half),
            mid: round6(mid),
            spread_bps: entry.spread_bps,
            volatility_proxy: volatility_proxy(&entry.series, index),
            timestamp: self.clock.now().timestamp_millis(),
        }
    }
}

impl MarketDataProvider for ReplayMarketData {
    fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let entry = self.entry(symbol)?;
        let index = entry.cursor.fetch_add(1, Ordering::SeqCst) % entry.series.len();
        let quote = self.quote_at(symbol, entry, index);
        debug!("Quote {} mid={} (replay index {})", symbol, quote.mid, index);
        Ok(quote)
    }

    fn peek_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let entry = self.entry(symbol)?;
        let index = entry.cursor.load(Ordering::SeqCst) % entry.series.len();
        Ok(self.quote_at(symbol, entry, index))
    }
}

/// Coefficient of variation over the up-to-`VOLATILITY_WINDOW` values
/// ending at `index`. The window truncates at the series start, so the
/// first point reports the floor.
fn volatility_proxy(series: &[f64], index: usize) -> f64 {
    let start = index.saturating_sub(VOLATILITY_WINDOW - 1);
    let window = &series[start..=index];
    if window.len() < 2 {
        return VOLATILITY_FLOOR;
    }
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    if mean == 0.0 {
        return VOLATILITY_FLOOR;
    }
    let variance =
        window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
    (variance.sqrt() / mean).max(VOLATILITY_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatility_proxy_floor_on_flat_series() {
        let series = [100.0, 100.0, 100.0, 100.0, 100.0];
        assert_eq!(volatility_proxy(&series, 4), VOLATILITY_FLOOR);
    }

    #[test]
    fn test_volatility_proxy_first_point_is_floor() {
        let series = [100.0, 150.0, 200.0];
        assert_eq!(volatility_proxy(&series, 0), VOLATILITY_FLOOR);
    }

    #[test]
    fn test_volatility_proxy_truncates_at_series_start() {
        // At index 1 the window is just the first two points.
        let series = [100.0, 110.0, 999.0, 999.0, 999.0, 999.0];
        let mean = 105.0;
        let variance = ((100.0f64 - mean).powi(2) + (110.0 - mean).powi(2)) / 2.0;
        let expected = (variance.sqrt() / mean).max(VOLATILITY_FLOOR);
        assert!((volatility_proxy(&series, 1) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_proxy_full_window() {
        // At index 5 the window is indices 1..=5.
        let series = [999.0, 100.0, 102.0, 104.0, 106.0, 108.0];
        let window = [100.0, 102.0, 104.0, 106.0, 108.0];
        let mean: f64 = window.iter().sum::<f64>() / 5.0;
        let variance: f64 = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 5.0;
        let expected = (variance.sqrt() / mean).max(VOLATILITY_FLOOR);
        assert!((volatility_proxy(&series, 5) - expected).abs() < 1e-12);
    }
}
