//! Live Market Data (placeholder)
//!
//! Exists to prove the provider capability swaps cleanly between replay
//! and a real venue. It is disabled unless `ENABLE_LIVE_MARKET_DATA=true`,
//! and even enabled it reports that no venue is wired up.

use tracing::warn;

use crate::services::market_data::{MarketDataError, MarketDataProvider};
use crate::types::Quote;

/// Gated placeholder venue connection.
pub struct LiveMarketData {
    enabled: bool,
}

impl LiveMarketData {
    pub fn new(enabled: bool) -> Self {
        if enabled {
            warn!("Live market data enabled but no venue is configured; all quotes will fail");
        }
        Self { enabled }
    }

    fn refuse(&self) -> MarketDataError {
        if self.enabled {
            MarketDataError::LiveUnavailable
        } else {
            MarketDataError::LiveDisabled
        }
    }
}

impl MarketDataProvider for LiveMarketData {
    fn get_quote(&self, _symbol: &str) -> Result<Quote, MarketDataError> {
        Err(self.refuse())
    }

    fn peek_quote(&self, _symbol: &str) -> Result<Quote, MarketDataError> {
        Err(self.refuse())
    }
}
