//! Configuration
//!
//! Server settings and broker tunables, loaded from the environment the
//! same way everywhere: parseable override or the default.

use std::env;

/// Which market data provider to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketDataMode {
    /// Cycle through the canned replay dataset
    Replay,
    /// Placeholder venue connection; gated by ENABLE_LIVE_MARKET_DATA
    Live,
}

/// Broker tunables. Immutable for the lifetime of a `BrokerService`.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Seeds the deterministic random stream
    pub seed: u64,
    /// Cooperative delay between trigger evaluation and the fill quote (ms)
    pub execution_delay_ms: u64,
    /// Gate placement by the local clock
    pub enforce_market_hours: bool,
    pub market_open_hour: u32,
    pub market_open_minute: u32,
    pub market_close_hour: u32,
    pub market_close_minute: u32,
    /// Flat fee per fill
    pub commission_per_trade: f64,
    /// Proportional fee per fill, in basis points of notional
    pub fee_rate_bps: f64,
    pub base_slippage_bps: f64,
    /// Scales with log10(1 + quantity)
    pub size_impact_bps: f64,
    /// Scaled by a uniform random draw
    pub random_slippage_bps: f64,
    /// Replay spread when the dataset does not specify one
    pub base_spread_bps: f64,
    pub initial_margin_long: f64,
    pub initial_margin_short: f64,
    pub maintenance_margin_long: f64,
    pub maintenance_margin_short: f64,
    /// T+N in business days
    pub settlement_days_equities: u32,
    /// Daily rate applied to open short market value
    pub short_borrow_daily_rate: f64,
    pub force_liquidation_enabled: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            execution_delay_ms: 25,
            enforce_market_hours: false,
            market_open_hour: 9,
            market_open_minute: 30,
            market_close_hour: 16,
            market_close_minute: 0,
            commission_per_trade: 1.0,
            fee_rate_bps: 1.0,
            base_slippage_bps: 1.0,
            size_impact_bps: 2.0,
            random_slippage_bps: 1.5,
            base_spread_bps: 8.0,
            initial_margin_long: 0.5,
            initial_margin_short: 1.5,
            maintenance_margin_long: 0.25,
            maintenance_margin_short: 0.3,
            settlement_days_equities: 2,
            short_borrow_daily_rate: 0.0003,
            force_liquidation_enabled: true,
        }
    }
}

impl BrokerConfig {
    /// Load broker tunables from `BROKER_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            seed: parse_env("BROKER_SEED", defaults.seed),
            execution_delay_ms: parse_env("BROKER_EXECUTION_DELAY_MS", defaults.execution_delay_ms),
            enforce_market_hours: parse_env(
                "BROKER_ENFORCE_MARKET_HOURS",
                defaults.enforce_market_hours,
            ),
            market_open_hour: parse_env("BROKER_MARKET_OPEN_HOUR", defaults.market_open_hour),
            market_open_minute: parse_env("BROKER_MARKET_OPEN_MINUTE", defaults.market_open_minute),
            market_close_hour: parse_env("BROKER_MARKET_CLOSE_HOUR", defaults.market_close_hour),
            market_close_minute: parse_env(
                "BROKER_MARKET_CLOSE_MINUTE",
                defaults.market_close_minute,
            ),
            commission_per_trade: parse_env(
                "BROKER_COMMISSION_PER_TRADE",
                defaults.commission_per_trade,
            ),
            fee_rate_bps: parse_env("BROKER_FEE_RATE_BPS", defaults.fee_rate_bps),
            base_slippage_bps: parse_env("BROKER_BASE_SLIPPAGE_BPS", defaults.base_slippage_bps),
            size_impact_bps: parse_env("BROKER_SIZE_IMPACT_BPS", defaults.size_impact_bps),
            random_slippage_bps: parse_env(
                "BROKER_RANDOM_SLIPPAGE_BPS",
                defaults.random_slippage_bps,
            ),
            base_spread_bps: parse_env("BROKER_BASE_SPREAD_BPS", defaults.base_spread_bps),
            initial_margin_long: parse_env(
                "BROKER_INITIAL_MARGIN_LONG",
                defaults.initial_margin_long,
            ),
            initial_margin_short: parse_env(
                "BROKER_INITIAL_MARGIN_SHORT",
                defaults.initial_margin_short,
            ),
            maintenance_margin_long: parse_env(
                "BROKER_MAINTENANCE_MARGIN_LONG",
                defaults.maintenance_margin_long,
            ),
            maintenance_margin_short: parse_env(
                "BROKER_MAINTENANCE_MARGIN_SHORT",
                defaults.maintenance_margin_short,
            ),
            settlement_days_equities: parse_env(
                "BROKER_SETTLEMENT_DAYS_EQUITIES",
                defaults.settlement_days_equities,
            ),
            short_borrow_daily_rate: parse_env(
                "BROKER_SHORT_BORROW_DAILY_RATE",
                defaults.short_borrow_daily_rate,
            ),
            force_liquidation_enabled: parse_env(
                "BROKER_FORCE_LIQUIDATION_ENABLED",
                defaults.force_liquidation_enabled,
            ),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Market data provider selection.
    pub market_data_mode: MarketDataMode,
    /// Lets the live placeholder function (it still has no venue).
    pub enable_live_market_data: bool,
    /// Optional path to a replay dataset JSON file.
    pub replay_data_path: Option<String>,
    /// Broker tunables.
    pub broker: BrokerConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let market_data_mode = match env::var("MARKET_DATA_MODE")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            Ok("live") => MarketDataMode::Live,
            _ => MarketDataMode::Replay,
        };
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            market_data_mode,
            enable_live_market_data: parse_env("ENABLE_LIVE_MARKET_DATA", false),
            replay_data_path: env::var("REPLAY_DATA_PATH").ok(),
            broker: BrokerConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
