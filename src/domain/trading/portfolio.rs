use super::types::Trade;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
}

/// Cash-plus-positions view of one broker account. `cash`, `positions`, and
/// `trade_history` are the only mutable state; equity and P&L are always
/// derived, never stored, so they can't drift out of sync with a fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: Decimal,
    pub positions: HashMap<String, Position>,
    pub realized_pnl: Decimal,
    pub trade_history: Vec<Trade>,
    pub starting_cash: Decimal,
    pub max_equity: Decimal,
    pub day_trades_count: u64,
}

impl Portfolio {
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            cash: starting_cash,
            positions: HashMap::new(),
            realized_pnl: Decimal::ZERO,
            trade_history: Vec::new(),
            starting_cash,
            max_equity: starting_cash,
            day_trades_count: 0,
        }
    }

    pub fn total_equity(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        let mut equity = self.cash;
        for (symbol, position) in &self.positions {
            let price = current_prices.get(symbol).copied().unwrap_or(position.average_price);
            equity += position.quantity * price;
        }
        equity
    }

    pub fn unrealized_pnl(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        let mut unrealized = Decimal::ZERO;
        for (symbol, position) in &self.positions {
            if let Some(&current_price) = current_prices.get(symbol) {
                unrealized += position.quantity * (current_price - position.average_price);
            }
        }
        unrealized
    }

    pub fn total_pnl(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        self.realized_pnl + self.unrealized_pnl(current_prices)
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.realized_pnl += trade.pnl;
        self.trade_history.push(trade);
    }

    /// Tracks the high-water mark; the risk module's drawdown calculation
    /// reads this rather than recomputing a max over trade history.
    pub fn update_max_equity(&mut self, current_prices: &HashMap<String, Decimal>) {
        let equity = self.total_equity(current_prices);
        if equity > self.max_equity {
            self.max_equity = equity;
        }
    }
}

/// Cross-broker snapshot: the engine's risk checks operate on this, not on
/// any single broker's native account payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregatedAccount {
    pub equity: Decimal,
    pub cash: Decimal,
    pub buying_power: Decimal,
    pub day_trades_remaining: Option<u32>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::{OrderSide, Trade};
    use rust_decimal_macros::dec;

    #[test]
    fn total_equity_includes_position_value() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio.positions.insert(
            "AAPL".to_string(),
            Position {
                symbol: "AAPL".to_string(),
                quantity: dec!(10),
                average_price: dec!(100),
            },
        );
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), dec!(110));
        assert_eq!(portfolio.total_equity(&prices), dec!(11100));
    }

    #[test]
    fn unrealized_pnl_profit_and_loss() {
        let mut portfolio = Portfolio::new(dec!(0));
        portfolio.positions.insert(
            "TSLA".to_string(),
            Position {
                symbol: "TSLA".to_string(),
                quantity: dec!(5),
                average_price: dec!(200),
            },
        );
        let mut prices = HashMap::new();
        prices.insert("TSLA".to_string(), dec!(180));
        assert_eq!(portfolio.unrealized_pnl(&prices), dec!(-100));
    }

    #[test]
    fn record_trade_updates_realized_pnl() {
        let mut portfolio = Portfolio::new(dec!(0));
        let trade = Trade {
            id: "1".to_string(),
            symbol: "NVDA".to_string(),
            side: OrderSide::Buy,
            entry_price: dec!(100),
            exit_price: Some(dec!(120)),
            quantity: dec!(10),
            pnl: dec!(200),
            entry_timestamp: 1000,
            exit_timestamp: Some(2000),
            strategy_used: None,
            regime_detected: None,
            entry_reason: None,
            exit_reason: None,
            fees: dec!(0),
        };
        portfolio.record_trade(trade);
        assert_eq!(portfolio.realized_pnl, dec!(200));
        assert_eq!(portfolio.trade_history.len(), 1);
    }

    #[test]
    fn max_equity_only_ratchets_upward() {
        let mut portfolio = Portfolio::new(dec!(10000));
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), dec!(100));
        portfolio.positions.insert(
            "AAPL".to_string(),
            Position {
                symbol: "AAPL".to_string(),
                quantity: dec!(10),
                average_price: dec!(90),
            },
        );
        portfolio.update_max_equity(&prices);
        assert_eq!(portfolio.max_equity, dec!(11000));

        prices.insert("AAPL".to_string(), dec!(50));
        portfolio.update_max_equity(&prices);
        assert_eq!(portfolio.max_equity, dec!(11000));
    }
}
