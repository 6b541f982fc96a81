//! Broker Router: the single interface the engine talks to regardless of
//! which venue a symbol actually trades on, plus the pure routing function
//! that decides which adapter a symbol belongs to.

use crate::domain::errors::BrokerError;
use crate::domain::signal::{AssetClass, Direction};
use crate::domain::trading::{OrderType, Position};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerType {
    Futures,
    Equity,
}

/// Normalized order status every adapter must map its native vocabulary
/// onto. `Rejected` is the only one that also surfaces as a hard error
/// (`BrokerError::OrderRejected`) rather than a status on a successful
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizedOrderStatus {
    Pending,
    Open,
    Filled,
    PartiallyFilled,
    Cancelled,
    Rejected,
    Expired,
}

/// What the engine sends to a broker, independent of venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedOrder {
    pub client_order_id: String,
    pub symbol: String,
    pub asset_class: AssetClass,
    pub direction: Direction,
    pub quantity: Decimal,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub signal_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub broker_order_id: String,
    pub client_order_id: String,
    pub status: NormalizedOrderStatus,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub submitted_at: i64,
}

#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    fn broker_type(&self) -> BrokerType;
    fn asset_class(&self) -> AssetClass;
    fn supported_symbols(&self) -> &[String];

    async fn authenticate(&self) -> Result<(), BrokerError>;
    async fn get_account(&self) -> Result<crate::domain::trading::AggregatedAccount, BrokerError>;
    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError>;
    async fn place_order(&self, order: UnifiedOrder) -> Result<OrderResult, BrokerError>;
    async fn cancel_order(&self, broker_order_id: &str) -> Result<(), BrokerError>;
    async fn get_order_status(&self, broker_order_id: &str) -> Result<OrderResult, BrokerError>;
}

/// Futures roots recognized before checking for a contract-month suffix.
/// A symbol outside this set always routes to equities, even if it
/// happens to end in something that looks like a contract month.
const FUTURES_ROOTS: &[&str] = &[
    "ES", "MES", "NQ", "MNQ", "YM", "MYM", "RTY", "M2K", "CL", "MCL", "GC", "MGC", "SI", "ZB", "ZN", "ZF", "ZT",
];

const CONTRACT_MONTH_CODES: &[u8] = b"FGHJKMNQUVXZ";

/// `^[A-Z]{1,3}[FGHJKMNQUVXZ][0-9]{1,2}$` against a known futures root.
/// `MNQXYZ` has the MNQ root but fails the contract-month shape, so it
/// still routes to equities.
fn is_futures_contract(symbol: &str) -> bool {
    let bytes = symbol.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return false;
    }
    for &root in FUTURES_ROOTS {
        let root_bytes = root.as_bytes();
        if bytes.len() <= root_bytes.len() || &bytes[..root_bytes.len()] != root_bytes {
            continue;
        }
        let rest = &bytes[root_bytes.len()..];
        if rest.len() < 2 || rest.len() > 3 {
            continue;
        }
        let month_code = rest[0];
        let year_digits = &rest[1..];
        if CONTRACT_MONTH_CODES.contains(&month_code) && year_digits.iter().all(|b| b.is_ascii_digit()) {
            return true;
        }
    }
    false
}

/// Routes a symbol to the asset class its broker adapter must handle.
/// Exact futures-root match (bare continuous contract) or root-plus-
/// contract-month both route to `Futures`; everything else, including a
/// futures root with an unrecognized suffix, routes to `Equity`.
pub fn route_asset_class(symbol: &str) -> AssetClass {
    if FUTURES_ROOTS.contains(&symbol) || is_futures_contract(symbol) {
        AssetClass::Futures
    } else {
        AssetClass::Equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_futures_root_routes_to_futures() {
        assert_eq!(route_asset_class("ES"), AssetClass::Futures);
        assert_eq!(route_asset_class("MNQ"), AssetClass::Futures);
    }

    #[test]
    fn contract_month_form_routes_to_futures() {
        assert_eq!(route_asset_class("ESH25"), AssetClass::Futures);
        assert_eq!(route_asset_class("MNQZ4"), AssetClass::Futures);
    }

    #[test]
    fn futures_root_with_unrecognized_suffix_routes_to_equity() {
        assert_eq!(route_asset_class("MNQXYZ"), AssetClass::Equity);
    }

    #[test]
    fn ordinary_equity_symbols_route_to_equity() {
        assert_eq!(route_asset_class("AAPL"), AssetClass::Equity);
        assert_eq!(route_asset_class("TQQQ"), AssetClass::Equity);
        assert_eq!(route_asset_class("SPY"), AssetClass::Equity);
    }
}
