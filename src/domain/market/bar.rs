//! Price bars and quotes: the raw material every indicator and strategy
//! consumes. Both are plain data — no behavior, no mutation once produced.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. Immutable once produced; a sequence of bars for a given
/// (symbol, timeframe) is ordered strictly increasing by `timestamp` (ms
/// since epoch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PriceBar {
    pub fn new(
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// A point-in-time quote. Ephemeral — never persisted, no ordering
/// invariant across calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub last: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bars_carry_their_own_ordering_key() {
        let a = PriceBar::new(1_000, dec!(100), dec!(101), dec!(99), dec!(100.5), dec!(1000));
        let b = PriceBar::new(2_000, dec!(100.5), dec!(102), dec!(100), dec!(101), dec!(1100));
        assert!(a.timestamp < b.timestamp);
    }
}
