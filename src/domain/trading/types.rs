use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// One order sent to (or tracked from) a broker. `clientOrderId` is the
/// idempotency key — retrying an order with the same id must never produce
/// two broker-side orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_order_id: String,
    pub broker_order_id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    pub signal_id: Option<String>,
    pub submitted_at: i64,
    pub filled_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderInvariantViolation(pub &'static str);

impl Order {
    pub fn check_invariants(&self) -> Result<(), OrderInvariantViolation> {
        if self.filled_quantity > self.quantity {
            return Err(OrderInvariantViolation("filledQuantity must not exceed quantity"));
        }
        match (self.status, self.filled_at) {
            (OrderStatus::Filled, None) => {
                Err(OrderInvariantViolation("FILLED order must carry filledAt"))
            }
            (s, Some(_)) if s != OrderStatus::Filled && s != OrderStatus::PartiallyFilled => {
                Err(OrderInvariantViolation("only FILLED/PARTIALLY_FILLED orders carry filledAt"))
            }
            _ => Ok(()),
        }
    }
}

/// A closed round-trip: entry and exit of the same position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub quantity: Decimal,
    pub pnl: Decimal,
    pub entry_timestamp: i64,
    pub exit_timestamp: Option<i64>,
    pub strategy_used: Option<String>,
    pub regime_detected: Option<String>,
    pub entry_reason: Option<String>,
    pub exit_reason: Option<String>,
    pub fees: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_order() -> Order {
        Order {
            id: "o1".into(),
            client_order_id: "c1".into(),
            broker_order_id: None,
            symbol: "MNQ".into(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: dec!(10),
            filled_quantity: dec!(0),
            limit_price: None,
            stop_price: None,
            status: OrderStatus::Pending,
            signal_id: Some("s1".into()),
            submitted_at: 1000,
            filled_at: None,
        }
    }

    #[test]
    fn pending_order_with_no_fill_passes() {
        assert!(base_order().check_invariants().is_ok());
    }

    #[test]
    fn filled_quantity_over_quantity_fails() {
        let mut o = base_order();
        o.filled_quantity = dec!(20);
        assert!(o.check_invariants().is_err());
    }

    #[test]
    fn filled_status_without_filled_at_fails() {
        let mut o = base_order();
        o.status = OrderStatus::Filled;
        o.filled_quantity = dec!(10);
        assert!(o.check_invariants().is_err());
    }

    #[test]
    fn filled_status_with_filled_at_passes() {
        let mut o = base_order();
        o.status = OrderStatus::Filled;
        o.filled_quantity = dec!(10);
        o.filled_at = Some(2000);
        assert!(o.check_invariants().is_ok());
    }
}
