//! Order Types
//!
//! Wire types for order intake and the append-only order/fill history.
//! Order records keep the normalized request tokens as strings so that a
//! rejected order still shows exactly what was asked for; the enums below
//! carry the validated vocabulary the engine works with.

use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute immediately at best available price
    Market,
    /// Execute at the limit price or better
    Limit,
    /// Becomes a market order once the stop price trades through
    Stop,
    /// Becomes a limit order once the stop price trades through
    StopLimit,
}

impl OrderType {
    /// Parse an already-uppercased token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "MARKET" => Some(OrderType::Market),
            "LIMIT" => Some(OrderType::Limit),
            "STOP" => Some(OrderType::Stop),
            "STOP_LIMIT" => Some(OrderType::StopLimit),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
    SellShort,
    BuyToCover,
}

impl OrderSide {
    /// Parse an already-uppercased token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "BUY" => Some(OrderSide::Buy),
            "SELL" => Some(OrderSide::Sell),
            "SELL_SHORT" => Some(OrderSide::SellShort),
            "BUY_TO_COVER" => Some(OrderSide::BuyToCover),
            _ => None,
        }
    }

    /// Whether the side takes liquidity from the ask.
    pub fn is_buy(&self) -> bool {
        matches!(self, OrderSide::Buy | OrderSide::BuyToCover)
    }

    /// Signed position delta for a fill of `quantity`.
    pub fn position_delta(&self, quantity: f64) -> f64 {
        if self.is_buy() {
            quantity
        } else {
            -quantity
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
            OrderSide::SellShort => write!(f, "SELL_SHORT"),
            OrderSide::BuyToCover => write!(f, "BUY_TO_COVER"),
        }
    }
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Good for the trading day
    Day,
    /// Good till cancelled
    Gtc,
    /// Immediate or cancel
    Ioc,
}

impl TimeInForce {
    /// Parse an already-uppercased token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "DAY" => Some(TimeInForce::Day),
            "GTC" => Some(TimeInForce::Gtc),
            "IOC" => Some(TimeInForce::Ioc),
            _ => None,
        }
    }
}

impl Default for TimeInForce {
    fn default() -> Self {
        TimeInForce::Day
    }
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::Day => write!(f, "DAY"),
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Parked: waiting for a trigger or a fillable limit price
    Open,
    /// Completely filled
    Filled,
    /// Refused with a reason; still recorded in the account history
    Rejected,
    /// Cancelled
    Canceled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "OPEN"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// Outcome of trigger evaluation for stop-style orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerState {
    /// Market and limit orders skip trigger evaluation
    NotRequired,
    /// A STOP traded through and now executes as a market order
    TriggeredToMarket,
    /// A STOP_LIMIT traded through and now executes as a limit order
    TriggeredToLimit,
    /// Referenced by downstream consumers; the evaluator never produces it
    PendingLimit,
}

// =============================================================================
// Records
// =============================================================================

/// An order as recorded in the account history (newest first).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// `ORD-<ts>-<rand4>`
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    /// Normalized request token; uppercase, possibly unsupported on rejects
    #[serde(rename = "type")]
    pub order_type: String,
    /// Normalized request token
    pub side: String,
    /// Normalized request token
    pub tif: String,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_price: Option<f64>,
    pub fees: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_state: Option<TriggerState>,
    /// What the order executed as after trigger promotion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<OrderType>,
}

/// One executed trade. A filled order produces exactly one fill.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    /// `FIL-<ts>-<rand4>`
    pub id: String,
    pub order_id: String,
    pub account_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub notional: f64,
    pub fees: f64,
    pub timestamp: i64,
}

// =============================================================================
// Intake
// =============================================================================

/// Raw order input as submitted by a caller. Everything is optional here:
/// the engine normalizes and validates, and bad input becomes a REJECTED
/// order rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(rename = "type", default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub tif: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub limit_price: Option<f64>,
    #[serde(default)]
    pub stop_price: Option<f64>,
    /// Maintenance-margin guard bypass used by forced liquidation. Skipped
    /// by serde so external payloads can never set it.
    #[serde(skip)]
    pub bypass_margin_check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_tokens() {
        assert_eq!(serde_json::to_string(&OrderType::StopLimit).unwrap(), "\"STOP_LIMIT\"");
        assert_eq!(serde_json::to_string(&OrderSide::SellShort).unwrap(), "\"SELL_SHORT\"");
        assert_eq!(serde_json::to_string(&OrderSide::BuyToCover).unwrap(), "\"BUY_TO_COVER\"");
        assert_eq!(serde_json::to_string(&TimeInForce::Ioc).unwrap(), "\"IOC\"");
        assert_eq!(serde_json::to_string(&OrderStatus::Rejected).unwrap(), "\"REJECTED\"");
        assert_eq!(
            serde_json::to_string(&TriggerState::TriggeredToMarket).unwrap(),
            "\"TRIGGERED_TO_MARKET\""
        );
    }

    #[test]
    fn test_token_parsing() {
        assert_eq!(OrderType::parse("STOP_LIMIT"), Some(OrderType::StopLimit));
        assert_eq!(OrderType::parse("TRAILING_STOP"), None);
        assert_eq!(OrderSide::parse("BUY_TO_COVER"), Some(OrderSide::BuyToCover));
        assert_eq!(OrderSide::parse("SHORT"), None);
        assert_eq!(TimeInForce::parse("GTC"), Some(TimeInForce::Gtc));
        assert_eq!(TimeInForce::parse("FOK"), None);
    }

    #[test]
    fn test_side_direction() {
        assert!(OrderSide::Buy.is_buy());
        assert!(OrderSide::BuyToCover.is_buy());
        assert!(!OrderSide::Sell.is_buy());
        assert!(!OrderSide::SellShort.is_buy());
        assert_eq!(OrderSide::SellShort.position_delta(20.0), -20.0);
        assert_eq!(OrderSide::BuyToCover.position_delta(20.0), 20.0);
    }

    #[test]
    fn test_bypass_flag_is_stripped_from_input() {
        let raw = r#"{"type":"MARKET","side":"BUY","symbol":"AAPL","quantity":5,"bypassMarginCheck":true,"_bypassMarginCheck":true}"#;
        let request: OrderRequest = serde_json::from_str(raw).unwrap();
        assert!(!request.bypass_margin_check);
    }
}
