//! Position & Cash Ledger
//!
//! Pure application functions for the account ledger: the signed-position
//! update with weighted-average cost, the cash side of a fill, T+N
//! business-day settlement, and monetary rounding. The execution engine
//! calls these twice per trade: once on a throwaway copy of the account to
//! simulate the post-trade state, then on the real account.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use tracing::debug;

use crate::types::{Account, OrderSide, PendingSettlement, Position, SettlementDirection};

/// Round a monetary value to 6 decimal places.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Apply a signed quantity delta at `price` to the position book.
///
/// Same-sign trades average in; opposite-sign trades reduce at the held
/// average; an exact close deletes the entry; a trade that crosses zero
/// reseeds the average at the fill price for the residual.
pub fn apply_position_delta(
    positions: &mut BTreeMap<String, Position>,
    symbol: &str,
    delta: f64,
    price: f64,
) {
    if delta == 0.0 {
        return;
    }
    match positions.get_mut(symbol) {
        None => {
            positions.insert(
                symbol.to_string(),
                Position {
                    symbol: symbol.to_string(),
                    quantity: delta,
                    avg_price: round6(price),
                },
            );
        }
        Some(position) => {
            let held = position.quantity;
            if held.signum() == delta.signum() {
                let combined = held + delta;
                position.avg_price = round6(
                    (held.abs() * position.avg_price + delta.abs() * price) / combined.abs(),
                );
                position.quantity = combined;
                return;
            }
            let remaining = held + delta;
            if remaining == 0.0 {
                positions.remove(symbol);
            } else if remaining.signum() == held.signum() {
                // Reducing trade: quantity shrinks, average cost is kept.
                position.quantity = remaining;
            } else {
                // Crossed zero: the residual opens at the fill price.
                position.quantity = remaining;
                position.avg_price = round6(price);
            }
        }
    }
}

/// Record the cash side of a fill: buys reserve the notional against a
/// future debit, sells accrue unsettled cash against a future credit, and
/// fees accrue either way.
pub fn apply_cash_movement(
    account: &mut Account,
    side: OrderSide,
    notional: f64,
    fees: f64,
    settle_at: i64,
    symbol: &str,
) {
    if side.is_buy() {
        account.reserved_cash = round6(account.reserved_cash + notional);
        account.pending_settlements.push(PendingSettlement {
            amount: notional,
            direction: SettlementDirection::Debit,
            settle_at,
            symbol: symbol.to_string(),
        });
    } else {
        account.unsettled_cash = round6(account.unsettled_cash + notional);
        account.pending_settlements.push(PendingSettlement {
            amount: notional,
            direction: SettlementDirection::Credit,
            settle_at,
            symbol: symbol.to_string(),
        });
    }
    account.fees_due = round6(account.fees_due + fees);
}

/// Settle every pending entry due at `now_ms` (FIFO), then drain accrued
/// fees out of settled cash.
pub fn settle_due(account: &mut Account, now_ms: i64) {
    let mut remaining = Vec::with_capacity(account.pending_settlements.len());
    for entry in account.pending_settlements.drain(..) {
        if entry.settle_at > now_ms {
            remaining.push(entry);
            continue;
        }
        match entry.direction {
            SettlementDirection::Debit => {
                account.settled_cash = round6(account.settled_cash - entry.amount);
                account.reserved_cash = round6((account.reserved_cash - entry.amount).max(0.0));
            }
            SettlementDirection::Credit => {
                account.settled_cash = round6(account.settled_cash + entry.amount);
                account.unsettled_cash = round6(account.unsettled_cash - entry.amount);
            }
        }
        debug!(
            "Settled {:?} of {} for {} on account {}",
            entry.direction, entry.amount, entry.symbol, account.id
        );
    }
    account.pending_settlements = remaining;

    if account.fees_due != 0.0 {
        account.settled_cash = round6(account.settled_cash - account.fees_due);
        account.fees_due = 0.0;
    }
}

/// `business_days` business days after `from`, skipping weekends.
pub fn next_business_day(from: DateTime<Utc>, business_days: u32) -> DateTime<Utc> {
    let mut date = from;
    for _ in 0..business_days {
        date += Duration::days(1);
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
        }
    }
    date
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn book_with(symbol: &str, quantity: f64, avg_price: f64) -> BTreeMap<String, Position> {
        let mut positions = BTreeMap::new();
        positions.insert(
            symbol.to_string(),
            Position {
                symbol: symbol.to_string(),
                quantity,
                avg_price,
            },
        );
        positions
    }

    #[test]
    fn test_round6() {
        assert_eq!(round6(1.2345678), 1.234568);
        assert_eq!(round6(-1.2345674), -1.234567);
        assert_eq!(round6(0.0), 0.0);
    }

    #[test]
    fn test_open_new_position() {
        let mut positions = BTreeMap::new();
        apply_position_delta(&mut positions, "AAPL", 5.0, 190.0);
        let p = &positions["AAPL"];
        assert_eq!(p.quantity, 5.0);
        assert_eq!(p.avg_price, 190.0);
    }

    #[test]
    fn test_same_sign_averages_in() {
        let mut positions = book_with("AAPL", 10.0, 100.0);
        apply_position_delta(&mut positions, "AAPL", 5.0, 130.0);
        let p = &positions["AAPL"];
        assert_eq!(p.quantity, 15.0);
        // (10*100 + 5*130) / 15 = 110
        assert_eq!(p.avg_price, 110.0);
    }

    #[test]
    fn test_short_averages_in() {
        let mut positions = book_with("TSLA", -10.0, 200.0);
        apply_position_delta(&mut positions, "TSLA", -10.0, 220.0);
        let p = &positions["TSLA"];
        assert_eq!(p.quantity, -20.0);
        assert_eq!(p.avg_price, 210.0);
    }

    #[test]
    fn test_reducing_trade_keeps_average() {
        let mut positions = book_with("AAPL", 10.0, 100.0);
        apply_position_delta(&mut positions, "AAPL", -4.0, 150.0);
        let p = &positions["AAPL"];
        assert_eq!(p.quantity, 6.0);
        assert_eq!(p.avg_price, 100.0);
    }

    #[test]
    fn test_exact_close_removes_position() {
        let mut positions = book_with("AAPL", 10.0, 100.0);
        apply_position_delta(&mut positions, "AAPL", -10.0, 150.0);
        assert!(!positions.contains_key("AAPL"));
    }

    #[test]
    fn test_sign_flip_reseeds_average() {
        let mut positions = book_with("AAPL", 10.0, 100.0);
        apply_position_delta(&mut positions, "AAPL", -25.0, 150.0);
        let p = &positions["AAPL"];
        assert_eq!(p.quantity, -15.0);
        assert_eq!(p.avg_price, 150.0);
    }

    #[test]
    fn test_cash_movement_buy_reserves() {
        let mut account = Account::new(
            "ACC-1-test".to_string(),
            0,
            1000.0,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        );
        apply_cash_movement(&mut account, OrderSide::Buy, 400.0, 1.5, 999, "AAPL");
        assert_eq!(account.reserved_cash, 400.0);
        assert_eq!(account.fees_due, 1.5);
        assert_eq!(account.pending_settlements.len(), 1);
        assert_eq!(
            account.pending_settlements[0].direction,
            SettlementDirection::Debit
        );
    }

    #[test]
    fn test_cash_movement_sell_accrues_unsettled() {
        let mut account = Account::new(
            "ACC-1-test".to_string(),
            0,
            1000.0,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        );
        apply_cash_movement(&mut account, OrderSide::SellShort, 400.0, 1.5, 999, "TSLA");
        assert_eq!(account.unsettled_cash, 400.0);
        assert_eq!(account.reserved_cash, 0.0);
        assert_eq!(
            account.pending_settlements[0].direction,
            SettlementDirection::Credit
        );
    }

    #[test]
    fn test_settlement_moves_cash_and_drains_fees() {
        let mut account = Account::new(
            "ACC-1-test".to_string(),
            0,
            1000.0,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        );
        apply_cash_movement(&mut account, OrderSide::Buy, 400.0, 2.0, 100, "AAPL");
        apply_cash_movement(&mut account, OrderSide::Sell, 150.0, 1.0, 200, "AAPL");

        // Only the debit is due.
        settle_due(&mut account, 100);
        assert_eq!(account.settled_cash, 1000.0 - 400.0 - 3.0);
        assert_eq!(account.reserved_cash, 0.0);
        assert_eq!(account.fees_due, 0.0);
        assert_eq!(account.pending_settlements.len(), 1);

        // Now the credit.
        settle_due(&mut account, 200);
        assert_eq!(account.settled_cash, 1000.0 - 400.0 - 3.0 + 150.0);
        assert_eq!(account.unsettled_cash, 0.0);
        assert!(account.pending_settlements.is_empty());
    }

    #[test]
    fn test_next_business_day_skips_weekend() {
        // 2024-03-07 is a Thursday; T+2 lands on Monday the 11th.
        let thursday = Utc.with_ymd_and_hms(2024, 3, 7, 15, 0, 0).unwrap();
        let settle = next_business_day(thursday, 2);
        assert_eq!(settle.date_naive().to_string(), "2024-03-11");
        assert_eq!(settle.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_next_business_day_from_weekend() {
        // From a Saturday, one business day is Monday.
        let saturday = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let settle = next_business_day(saturday, 1);
        assert_eq!(settle.weekday(), Weekday::Mon);
    }
}
