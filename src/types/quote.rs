//! Quote Types

use serde::{Deserialize, Serialize};

/// Top-of-book quote served by a market data provider.
///
/// Holds `bid <= mid <= ask` with `ask - bid = mid * spreadBps / 10000`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
    pub spread_bps: f64,
    /// Short-window coefficient of variation of the mid; a slippage input
    pub volatility_proxy: f64,
    pub timestamp: i64,
}
