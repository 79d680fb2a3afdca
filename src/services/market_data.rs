//! Market Data Capability
//!
//! Price discovery behind a two-operation capability: `get_quote` returns
//! the current quote and advances the per-symbol cursor, `peek_quote`
//! returns it without advancing. The execution engine consumes advancing
//! quotes; valuation and accrual peek.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{Config, MarketDataMode};
use crate::services::clock::Clock;
use crate::services::dataset::ReplayDataset;
use crate::services::live::LiveMarketData;
use crate::services::replay::ReplayMarketData;
use crate::types::Quote;

/// Market data provider errors.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("live market data is disabled; set ENABLE_LIVE_MARKET_DATA=true to enable it")]
    LiveDisabled,

    #[error("live market data is enabled but not connected to a venue")]
    LiveUnavailable,
}

/// Price discovery capability used by the execution engine.
pub trait MarketDataProvider: Send + Sync {
    /// Return the current quote for `symbol` and advance its cursor.
    fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Return the current quote for `symbol` without advancing.
    fn peek_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;
}

/// Build the provider selected by `MARKET_DATA_MODE`.
pub fn provider_from_config(
    config: &Config,
    dataset: ReplayDataset,
    clock: Arc<dyn Clock>,
) -> Arc<dyn MarketDataProvider> {
    match config.market_data_mode {
        MarketDataMode::Live => Arc::new(LiveMarketData::new(config.enable_live_market_data)),
        MarketDataMode::Replay => Arc::new(ReplayMarketData::new(
            dataset,
            config.broker.base_spread_bps,
            clock,
        )),
    }
}
