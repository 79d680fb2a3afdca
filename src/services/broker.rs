//! Broker Service
//!
//! The execution and accounting core. Handles:
//! - Account lifecycle (create, refresh, project)
//! - Order placement through a fixed validation/trigger/fill pipeline
//! - Slippage and fee pricing against the market data provider
//! - Signed-position bookkeeping and T+N cash settlement
//! - Short-borrow accrual and maintenance-margin forced liquidation
//!
//! Every operation on an account runs under that account's mutex, so the
//! observable behavior is per-account serializable while unrelated accounts
//! proceed in parallel. Business failures never cross the call boundary:
//! they become REJECTED orders in the account history, and only an unknown
//! account id is an out-of-band error.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{Datelike, Timelike, Weekday};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::services::clock::Clock;
use crate::services::ledger::{self, round6};
use crate::services::market_data::MarketDataProvider;
use crate::services::rng::DeterministicRng;
use crate::types::{
    Account, AccountSummary, Balances, Fill, MarginSummary, Order, OrderRequest, OrderSide,
    OrderStatus, OrderType, Position, PositionView, TimeInForce, TriggerState,
};

/// Broker service errors. Business rejections are not errors; see the
/// module docs.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Margin metrics over the current marks.
#[derive(Debug, Clone, Copy)]
pub struct MarginMetrics {
    pub long_value: f64,
    pub short_value: f64,
    pub market_value: f64,
    pub equity: f64,
    pub initial_required: f64,
    pub maintenance_required: f64,
    pub margin_excess: f64,
    pub available_cash: f64,
}

/// Account state plus its private random stream, guarded as one unit.
struct AccountState {
    account: Account,
    rng: DeterministicRng,
}

/// The broker simulation engine.
pub struct BrokerService {
    config: BrokerConfig,
    market_data: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn Clock>,
    /// Account registry (account_id -> serialized state)
    accounts: DashMap<String, Arc<Mutex<AccountState>>>,
    /// Broker-level stream for account ids
    id_rng: StdMutex<DeterministicRng>,
}

impl BrokerService {
    pub fn new(
        config: BrokerConfig,
        market_data: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let id_rng = StdMutex::new(DeterministicRng::seeded(config.seed));
        Self {
            config,
            market_data,
            clock,
            accounts: DashMap::new(),
            id_rng,
        }
    }

    // ==========================================================================
    // Account Lifecycle
    // ==========================================================================

    /// Open an account funded with `initial_capital` of settled cash.
    pub fn create_account(&self, initial_capital: f64) -> Result<String, BrokerError> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(BrokerError::InvalidRequest(
                "initialCapital must be a positive number".to_string(),
            ));
        }

        let now = self.clock.now();
        let id = {
            let mut rng = self.id_rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            format!("ACC-{}-{}", now.timestamp_millis(), rng.id_suffix())
        };
        let account = Account::new(
            id.clone(),
            now.timestamp_millis(),
            round6(initial_capital),
            now.date_naive(),
        );
        let rng = DeterministicRng::for_account(self.config.seed, &id);
        self.accounts
            .insert(id.clone(), Arc::new(Mutex::new(AccountState { account, rng })));

        info!("Opened account {} with {} initial capital", id, initial_capital);
        Ok(id)
    }

    fn account_cell(&self, account_id: &str) -> Result<Arc<Mutex<AccountState>>, BrokerError> {
        self.accounts
            .get(account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BrokerError::AccountNotFound(account_id.to_string()))
    }

    // ==========================================================================
    // Order Placement
    // ==========================================================================

    /// Run an order through the placement pipeline.
    ///
    /// Always returns the recorded order; rejected orders come back with
    /// status REJECTED and a reason rather than as an `Err`.
    pub async fn place_order(
        &self,
        account_id: &str,
        request: OrderRequest,
    ) -> Result<Order, BrokerError> {
        let cell = self.account_cell(account_id)?;
        let mut state = cell.lock().await;
        self.refresh(&mut state, true).await;
        let order = self.execute(&mut state, request).await;
        self.refresh(&mut state, true).await;
        Ok(order)
    }

    /// The placement pipeline. Runs with the account lock held; the caller
    /// is responsible for refreshing around it.
    async fn execute(&self, state: &mut AccountState, request: OrderRequest) -> Order {
        let now_ms = self.clock.now().timestamp_millis();

        let type_token = normalize_token(request.order_type);
        let side_token = normalize_token(request.side);
        let tif_token = match normalize_token(request.tif) {
            token if token.is_empty() => TimeInForce::default().to_string(),
            token => token,
        };
        let symbol = normalize_token(request.symbol);
        let bypass = request.bypass_margin_check;

        let mut order = Order {
            id: format!("ORD-{}-{}", now_ms, state.rng.id_suffix()),
            account_id: state.account.id.clone(),
            symbol: symbol.clone(),
            order_type: type_token.clone(),
            side: side_token.clone(),
            tif: tif_token.clone(),
            quantity: request.quantity.unwrap_or(0.0),
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            status: OrderStatus::Open,
            reason: None,
            created_at: now_ms,
            filled_at: None,
            fill_price: None,
            fees: 0.0,
            trigger_state: None,
            effective_type: None,
        };

        // Vocabulary and shape validation.
        let Some(order_type) = OrderType::parse(&type_token) else {
            return self.reject(state, order, "unsupported order type");
        };
        let Some(side) = OrderSide::parse(&side_token) else {
            return self.reject(state, order, "unsupported side");
        };
        let Some(tif) = TimeInForce::parse(&tif_token) else {
            return self.reject(state, order, "unsupported tif");
        };
        let quantity = match request.quantity {
            Some(q) if q.is_finite() && q > 0.0 => q,
            _ => return self.reject(state, order, "invalid quantity"),
        };
        let limit = request.limit_price.filter(|p| p.is_finite() && *p > 0.0);
        let stop = request.stop_price.filter(|p| p.is_finite() && *p > 0.0);
        match order_type {
            OrderType::Limit if limit.is_none() => {
                return self.reject(state, order, "invalid limit price");
            }
            OrderType::Stop if stop.is_none() => {
                return self.reject(state, order, "invalid stop price");
            }
            OrderType::StopLimit if limit.is_none() || stop.is_none() => {
                return self.reject(state, order, "invalid stop/limit prices");
            }
            _ => {}
        }
        if order_type == OrderType::Market && tif == TimeInForce::Gtc {
            return self.reject(state, order, "unsupported order type/tif combination");
        }

        if self.config.enforce_market_hours && !self.market_open_now() {
            return self.reject(state, order, "market closed");
        }

        // Symbol existence doubles as the first (advancing) quote.
        let first_quote = match self.market_data.get_quote(&symbol) {
            Ok(quote) => quote,
            Err(e) => {
                debug!("Quote refused for {}: {}", symbol, e);
                return self.reject(state, order, "unknown symbol");
            }
        };

        if side == OrderSide::BuyToCover {
            let has_short = state
                .account
                .positions
                .get(&symbol)
                .map_or(false, |p| p.quantity < 0.0);
            if !has_short {
                return self.reject(state, order, "no short position to cover");
            }
        }

        if !bypass {
            let metrics = self.compute_metrics(&state.account);
            if metrics.equity < metrics.maintenance_required {
                return self.reject(state, order, "margin deficiency: account below maintenance");
            }
        }

        // Trigger evaluation against the first quote's mid.
        let trigger_state = match (order_type, stop) {
            (OrderType::Stop | OrderType::StopLimit, Some(stop_price)) => {
                let triggered = if side.is_buy() {
                    first_quote.mid >= stop_price
                } else {
                    first_quote.mid <= stop_price
                };
                if !triggered {
                    state.account.orders.insert(0, order.clone());
                    info!(
                        "Parked {} {} {} x{} awaiting stop {}",
                        order.id, side, symbol, quantity, stop_price
                    );
                    return order;
                }
                if order_type == OrderType::Stop {
                    TriggerState::TriggeredToMarket
                } else {
                    TriggerState::TriggeredToLimit
                }
            }
            _ => TriggerState::NotRequired,
        };
        order.trigger_state = Some(trigger_state);

        // Execution delay, then re-quote.
        if self.config.execution_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.execution_delay_ms)).await;
        }
        let quote = match self.market_data.get_quote(&symbol) {
            Ok(quote) => quote,
            Err(e) => {
                debug!("Re-quote refused for {}: {}", symbol, e);
                return self.reject(state, order, "unknown symbol");
            }
        };
        let effective_type = match trigger_state {
            TriggerState::TriggeredToMarket => OrderType::Market,
            TriggerState::TriggeredToLimit => OrderType::Limit,
            _ => order_type,
        };
        order.effective_type = Some(effective_type);

        // Fill condition. Market always fills; limit-like needs the book
        // at or through the limit.
        if effective_type == OrderType::Limit {
            if let Some(limit_price) = limit {
                let fillable = if side.is_buy() {
                    quote.ask <= limit_price
                } else {
                    quote.bid >= limit_price
                };
                if !fillable {
                    state.account.orders.insert(0, order.clone());
                    info!(
                        "Parked {} {} {} x{} at limit {} (bid {} / ask {})",
                        order.id, side, symbol, quantity, limit_price, quote.bid, quote.ask
                    );
                    return order;
                }
            }
        }

        // Slippage and fees.
        let base_price = if side.is_buy() { quote.ask } else { quote.bid };
        let slippage_bps = self.config.base_slippage_bps
            + (1.0 + quantity).log10() * self.config.size_impact_bps
            + quote.volatility_proxy * 10_000.0 * 0.05
            + state.rng.next_fraction() * self.config.random_slippage_bps;
        let adjustment = slippage_bps / 10_000.0;
        let fill_price = round6(if side.is_buy() {
            base_price * (1.0 + adjustment)
        } else {
            base_price * (1.0 - adjustment)
        });
        let notional = round6(fill_price * quantity);
        let fees = round6(
            self.config.commission_per_trade + notional * self.config.fee_rate_bps / 10_000.0,
        );

        // Simulate the post-trade account on a copy before committing.
        let delta = side.position_delta(quantity);
        let settle_at =
            ledger::next_business_day(self.clock.now(), self.config.settlement_days_equities)
                .timestamp_millis();
        let mut trial = state.account.clone();
        ledger::apply_position_delta(&mut trial.positions, &symbol, delta, fill_price);
        ledger::apply_cash_movement(&mut trial, side, notional, fees, settle_at, &symbol);
        let trial_metrics = self.compute_metrics(&trial);
        if trial_metrics.available_cash < 0.0 || trial_metrics.equity < trial_metrics.initial_required
        {
            return self.reject(state, order, "insufficient available buying power / margin");
        }

        // Commit as a single step, then record the order and its fill.
        ledger::apply_position_delta(&mut state.account.positions, &symbol, delta, fill_price);
        ledger::apply_cash_movement(&mut state.account, side, notional, fees, settle_at, &symbol);

        let filled_ms = self.clock.now().timestamp_millis();
        order.status = OrderStatus::Filled;
        order.filled_at = Some(filled_ms);
        order.fill_price = Some(fill_price);
        order.fees = fees;
        let fill = Fill {
            id: format!("FIL-{}-{}", filled_ms, state.rng.id_suffix()),
            order_id: order.id.clone(),
            account_id: state.account.id.clone(),
            symbol: symbol.clone(),
            side,
            quantity,
            price: fill_price,
            notional,
            fees,
            timestamp: filled_ms,
        };
        state.account.orders.insert(0, order.clone());
        state.account.fills.insert(0, fill);

        info!(
            "Filled {} {} {} x{} at {} (notional {}, fees {})",
            order.id, side, symbol, quantity, fill_price, notional, fees
        );
        order
    }

    fn reject(&self, state: &mut AccountState, mut order: Order, reason: &str) -> Order {
        order.status = OrderStatus::Rejected;
        order.reason = Some(reason.to_string());
        state.account.orders.insert(0, order.clone());
        warn!("Rejected order {} on {}: {}", order.id, order.account_id, reason);
        order
    }

    fn market_open_now(&self) -> bool {
        let local = self.clock.local_now();
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let minutes = local.hour() * 60 + local.minute();
        let open = self.config.market_open_hour * 60 + self.config.market_open_minute;
        let close = self.config.market_close_hour * 60 + self.config.market_close_minute;
        minutes >= open && minutes <= close
    }

    // ==========================================================================
    // Lifecycle Maintenance
    // ==========================================================================

    /// Settle due cash, accrue short-borrow fees, and run the margin check.
    /// Runs before every read and on both sides of every placement.
    async fn refresh(&self, state: &mut AccountState, allow_liquidation: bool) {
        let now = self.clock.now();
        ledger::settle_due(&mut state.account, now.timestamp_millis());

        let today = now.date_naive();
        if state.account.last_borrow_fee_date != today {
            let days = (today - state.account.last_borrow_fee_date).num_days();
            if days > 0 {
                let mut short_value = 0.0;
                for position in state.account.positions.values() {
                    if position.quantity < 0.0 {
                        short_value += position.quantity.abs() * self.mark_mid(position);
                    }
                }
                if short_value > 0.0 {
                    let accrued = round6(
                        short_value * self.config.short_borrow_daily_rate * days as f64,
                    );
                    state.account.fees_due = round6(state.account.fees_due + accrued);
                    debug!(
                        "Accrued {} in short-borrow fees over {} day(s) on {}",
                        accrued, days, state.account.id
                    );
                }
            }
            state.account.last_borrow_fee_date = today;
        }

        if allow_liquidation && self.config.force_liquidation_enabled {
            self.force_liquidate_if_deficient(state).await;
        }
    }

    /// Close the largest absolute exposure when equity is below the
    /// maintenance requirement. The internal order carries the margin-check
    /// bypass and goes through the regular pipeline; it is invoked here
    /// directly (without a surrounding refresh), so the bypass is
    /// single-level and cannot re-enter this scan.
    async fn force_liquidate_if_deficient(&self, state: &mut AccountState) {
        if state.account.positions.is_empty() {
            return;
        }
        let metrics = self.compute_metrics(&state.account);
        if metrics.equity >= metrics.maintenance_required {
            return;
        }

        let Some((symbol, quantity, exposure)) = state
            .account
            .positions
            .values()
            .map(|p| (p.symbol.clone(), p.quantity, (p.quantity * self.mark_mid(p)).abs()))
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
        else {
            return;
        };
        let side = if quantity > 0.0 {
            OrderSide::Sell
        } else {
            OrderSide::BuyToCover
        };
        warn!(
            "Margin call on {}: equity {:.2} below maintenance {:.2}; force-liquidating {} ({:.2} exposure)",
            state.account.id, metrics.equity, metrics.maintenance_required, symbol, exposure
        );

        let request = OrderRequest {
            order_type: Some(OrderType::Market.to_string()),
            side: Some(side.to_string()),
            tif: Some(TimeInForce::Ioc.to_string()),
            symbol: Some(symbol.clone()),
            quantity: Some(quantity.abs()),
            limit_price: None,
            stop_price: None,
            bypass_margin_check: true,
        };
        let order = self.execute(state, request).await;
        if order.status == OrderStatus::Rejected {
            let now_ms = self.clock.now().timestamp_millis();
            let failure = Order {
                id: format!("ORD-{}-{}", now_ms, state.rng.id_suffix()),
                account_id: state.account.id.clone(),
                symbol,
                order_type: OrderType::Market.to_string(),
                side: side.to_string(),
                tif: TimeInForce::Ioc.to_string(),
                quantity: quantity.abs(),
                limit_price: None,
                stop_price: None,
                status: OrderStatus::Rejected,
                reason: Some("margin_call_forced_liquidation_failed".to_string()),
                created_at: now_ms,
                filled_at: None,
                fill_price: None,
                fees: 0.0,
                trigger_state: None,
                effective_type: None,
            };
            state.account.orders.insert(0, failure);
            warn!(
                "Forced liquidation failed on {}; deficiency persists",
                state.account.id
            );
        }
    }

    // ==========================================================================
    // Metrics
    // ==========================================================================

    /// Positions only exist for symbols the provider knows; fall back to
    /// cost if the feed refuses a mark.
    fn mark_mid(&self, position: &Position) -> f64 {
        self.market_data
            .peek_quote(&position.symbol)
            .map(|quote| quote.mid)
            .unwrap_or(position.avg_price)
    }

    fn compute_metrics(&self, account: &Account) -> MarginMetrics {
        let mut long_value = 0.0;
        let mut short_value = 0.0;
        let mut market_value = 0.0;
        for position in account.positions.values() {
            let value = position.quantity * self.mark_mid(position);
            market_value += value;
            if position.quantity > 0.0 {
                long_value += value;
            } else {
                short_value += -value;
            }
        }

        let equity =
            account.settled_cash + account.unsettled_cash + market_value - account.fees_due;
        let initial_required = self.config.initial_margin_long * long_value
            + self.config.initial_margin_short * short_value;
        let maintenance_required = self.config.maintenance_margin_long * long_value
            + self.config.maintenance_margin_short * short_value;

        MarginMetrics {
            long_value,
            short_value,
            market_value,
            equity,
            initial_required,
            maintenance_required,
            margin_excess: equity - maintenance_required,
            available_cash: account.settled_cash - account.reserved_cash - account.fees_due,
        }
    }

    // ==========================================================================
    // Projections
    // ==========================================================================

    /// Account summary with balances, equity, and margin metrics.
    pub async fn get_account(&self, account_id: &str) -> Result<AccountSummary, BrokerError> {
        let cell = self.account_cell(account_id)?;
        let mut state = cell.lock().await;
        self.refresh(&mut state, true).await;

        let metrics = self.compute_metrics(&state.account);
        let account = &state.account;
        Ok(AccountSummary {
            id: account.id.clone(),
            created_at: account.created_at,
            balances: Balances {
                settled: round6(account.settled_cash),
                unsettled: round6(account.unsettled_cash),
                available: round6(metrics.available_cash),
                reserved: round6(account.reserved_cash),
            },
            equity: round6(metrics.equity),
            margin: MarginSummary {
                long: round6(metrics.long_value),
                short: round6(metrics.short_value),
                initial: round6(metrics.initial_required),
                maintenance: round6(metrics.maintenance_required),
                excess: round6(metrics.margin_excess),
            },
            fees_due: round6(account.fees_due),
            open_positions: account.positions.len(),
            open_orders: account.open_order_count(),
        })
    }

    /// Positions marked against the live mid.
    pub async fn get_positions(&self, account_id: &str) -> Result<Vec<PositionView>, BrokerError> {
        let cell = self.account_cell(account_id)?;
        let mut state = cell.lock().await;
        self.refresh(&mut state, true).await;

        Ok(state
            .account
            .positions
            .values()
            .map(|position| {
                let mid = self.mark_mid(position);
                let unrealized = if position.quantity > 0.0 {
                    (mid - position.avg_price) * position.quantity
                } else {
                    (position.avg_price - mid) * position.quantity.abs()
                };
                PositionView {
                    symbol: position.symbol.clone(),
                    quantity: position.quantity,
                    avg_price: position.avg_price,
                    mid,
                    market_value: round6(position.quantity * mid),
                    unrealized_pnl: round6(unrealized),
                }
            })
            .collect())
    }

    /// Order history, newest first, optionally filtered by status
    /// (case-insensitive).
    pub async fn get_orders(
        &self,
        account_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Order>, BrokerError> {
        let cell = self.account_cell(account_id)?;
        let mut state = cell.lock().await;
        self.refresh(&mut state, true).await;

        let orders = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(filter) => state
                .account
                .orders
                .iter()
                .filter(|order| order.status.to_string().eq_ignore_ascii_case(filter))
                .cloned()
                .collect(),
            None => state.account.orders.clone(),
        };
        Ok(orders)
    }

    /// Fill history, newest first.
    pub async fn get_fills(&self, account_id: &str) -> Result<Vec<Fill>, BrokerError> {
        let cell = self.account_cell(account_id)?;
        let mut state = cell.lock().await;
        self.refresh(&mut state, true).await;
        Ok(state.account.fills.clone())
    }
}

fn normalize_token(value: Option<String>) -> String {
    value.map(|v| v.trim().to_uppercase()).unwrap_or_default()
}
