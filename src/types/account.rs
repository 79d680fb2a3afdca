//! Account Types
//!
//! In-memory account state (positions, cash buckets, histories, pending
//! settlements) plus the read-side projection views served by the API.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Fill, Order, OrderStatus};

/// A signed position. Positive quantity is long, negative is short.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    /// Weighted-average cost; always > 0 while the position exists
    pub avg_price: f64,
}

/// Direction of a pending cash settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementDirection {
    /// Cash leaves settled funds when due (a purchase)
    Debit,
    /// Cash moves from unsettled to settled when due (a sale)
    Credit,
}

/// Cash in flight under T+N settlement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSettlement {
    pub amount: f64,
    pub direction: SettlementDirection,
    /// Due instant, epoch milliseconds
    pub settle_at: i64,
    pub symbol: String,
}

/// Process-resident account state.
///
/// Orders and fills are append-only histories kept newest first. Positions
/// are keyed by symbol in a `BTreeMap` so that valuation sums and the
/// forced-liquidation scan iterate in a stable order.
#[derive(Debug, Clone)]
pub struct Account {
    /// `ACC-<ts>-<rand4>`
    pub id: String,
    pub created_at: i64,
    pub settled_cash: f64,
    pub unsettled_cash: f64,
    pub reserved_cash: f64,
    pub fees_due: f64,
    pub positions: BTreeMap<String, Position>,
    pub orders: Vec<Order>,
    pub fills: Vec<Fill>,
    pub pending_settlements: Vec<PendingSettlement>,
    /// Last calendar date short-borrow fees were accrued through
    pub last_borrow_fee_date: NaiveDate,
}

impl Account {
    pub fn new(id: String, created_at: i64, settled_cash: f64, today: NaiveDate) -> Self {
        Self {
            id,
            created_at,
            settled_cash,
            unsettled_cash: 0.0,
            reserved_cash: 0.0,
            fees_due: 0.0,
            positions: BTreeMap::new(),
            orders: Vec::new(),
            fills: Vec::new(),
            pending_settlements: Vec::new(),
            last_borrow_fee_date: today,
        }
    }

    /// Number of orders still parked OPEN.
    pub fn open_order_count(&self) -> usize {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .count()
    }
}

// =============================================================================
// Projection Views
// =============================================================================

/// Cash buckets as shown to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub settled: f64,
    pub unsettled: f64,
    /// `settled - reserved - feesDue`
    pub available: f64,
    pub reserved: f64,
}

/// Margin requirements and headroom.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    /// Market value of long positions
    pub long: f64,
    /// Absolute market value of short positions
    pub short: f64,
    pub initial: f64,
    pub maintenance: f64,
    /// `equity - maintenance`
    pub excess: f64,
}

/// Read-side account summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub created_at: i64,
    pub balances: Balances,
    pub equity: f64,
    pub margin: MarginSummary,
    pub fees_due: f64,
    pub open_positions: usize,
    pub open_orders: usize,
}

/// A position marked against the live mid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub symbol: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub mid: f64,
    /// Signed `quantity * mid`
    pub market_value: f64,
    pub unrealized_pnl: f64,
}
