//! The Signal entity. The Signal Manager is the exclusive creator of
//! Signals; nothing else constructs one directly.

use crate::domain::market::MarketRegime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Futures,
    Equity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    Momentum,
    MeanReversion,
    Breakout,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStatus {
    Active,
    Executed,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub asset_class: AssetClass,
    pub timeframe: String,
    pub direction: Direction,
    /// In [0, 1].
    pub strength: f64,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Option<Decimal>,
    pub source: SignalSource,
    pub regime: MarketRegime,
    pub reasons: Vec<String>,
    pub indicators: HashMap<String, f64>,
    pub status: SignalStatus,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalInvariantViolation(pub &'static str);

impl Signal {
    /// Checks the universal Signal invariant: `stopLoss != entryPrice`, and
    /// for LONG `stopLoss < entryPrice` (and `takeProfit > entryPrice` if
    /// set); inverted for SHORT.
    pub fn check_invariants(&self) -> Result<(), SignalInvariantViolation> {
        if self.stop_loss == self.entry_price {
            return Err(SignalInvariantViolation("stopLoss must not equal entryPrice"));
        }
        match self.direction {
            Direction::Long => {
                if self.stop_loss >= self.entry_price {
                    return Err(SignalInvariantViolation("LONG stopLoss must be below entryPrice"));
                }
                if let Some(tp) = self.take_profit
                    && tp <= self.entry_price
                {
                    return Err(SignalInvariantViolation("LONG takeProfit must be above entryPrice"));
                }
            }
            Direction::Short => {
                if self.stop_loss <= self.entry_price {
                    return Err(SignalInvariantViolation("SHORT stopLoss must be above entryPrice"));
                }
                if let Some(tp) = self.take_profit
                    && tp >= self.entry_price
                {
                    return Err(SignalInvariantViolation("SHORT takeProfit must be below entryPrice"));
                }
            }
            Direction::Neutral => {}
        }
        Ok(())
    }

    /// A signal is valid only while `now < expiresAt` AND `now - timestamp
    /// <= 5 min`.
    pub fn is_valid(&self, now_ms: i64) -> bool {
        const FIVE_MINUTES_MS: i64 = 5 * 60 * 1000;
        now_ms < self.expires_at && now_ms - self.timestamp <= FIVE_MINUTES_MS
    }

    /// Status transitions only forward: ACTIVE -> {EXECUTED, EXPIRED, CANCELLED}.
    pub fn can_transition_to(&self, next: SignalStatus) -> bool {
        matches!(
            (self.status, next),
            (SignalStatus::Active, SignalStatus::Executed)
                | (SignalStatus::Active, SignalStatus::Expired)
                | (SignalStatus::Active, SignalStatus::Cancelled)
        )
    }
}
