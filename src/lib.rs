//! brokersim - Deterministic broker simulation engine
//!
//! Models a brokerage account's lifecycle over a replayable quote stream:
//! order intake and validation, trigger/fill evaluation, slippage and fee
//! pricing, signed-position bookkeeping with weighted-average cost, T+N
//! settlement, short-borrow accrual, and maintenance-margin liquidation.
//! Built for backtesting, teaching, and UI demos where venue connectivity
//! is undesirable but trader-visible broker semantics must hold.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use std::sync::Arc;

use config::Config;
use services::{BrokerService, MarketDataProvider};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub broker: Arc<BrokerService>,
    pub market_data: Arc<dyn MarketDataProvider>,
}
