//! Bollinger-band + RSI-extreme mean reversion strategy. Trades against the
//! prevailing move: a close at or beyond a band combined with an RSI
//! extreme reading is read as exhaustion, not continuation. Only fires in
//! `Ranging` or `Volatile` regimes — a genuine trend can pin price at a band
//! for many bars without reverting.

use super::traits::{build_signal, Strategy, StrategyInput};
use crate::domain::errors::EngineError;
use crate::domain::indicators::{atr, bollinger, bollinger_bands, require_len, rsi, Direction};
use crate::domain::market::MarketRegime;
use crate::domain::signal::{Signal, SignalSource};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct MeanReversionStrategy {
    pub bb_period: usize,
    pub bb_k: f64,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub atr_stop_multiplier: f64,
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self {
            bb_period: 20,
            bb_k: 2.0,
            rsi_period: 14,
            atr_period: 14,
            atr_stop_multiplier: 1.5,
        }
    }
}

/// RSI beyond the extreme threshold (25/75) -- stricter than the 30/70
/// `rsi::project` uses elsewhere, since mean reversion needs genuine
/// exhaustion, not just a mild oversold/overbought reading.
fn rsi_extreme(rsi_value: f64) -> crate::domain::indicators::SignalProjection {
    use crate::domain::indicators::SignalProjection;
    if rsi_value < 25.0 {
        SignalProjection { direction: Direction::Long, strength: ((25.0 - rsi_value) / 25.0).clamp(0.0, 1.0) }
    } else if rsi_value > 75.0 {
        SignalProjection { direction: Direction::Short, strength: ((rsi_value - 75.0) / 25.0).clamp(0.0, 1.0) }
    } else {
        SignalProjection::neutral()
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn source(&self) -> SignalSource {
        SignalSource::MeanReversion
    }

    fn evaluate(&self, input: &StrategyInput) -> Result<Vec<Signal>, EngineError> {
        if !matches!(input.regime, MarketRegime::Ranging | MarketRegime::Volatile) {
            return Ok(vec![]);
        }

        let need = self.bb_period.max(self.rsi_period + 1).max(self.atr_period * 2 + 1);
        require_len(input.bars.len(), need)?;

        let closes: Vec<f64> = input.bars.iter().map(|b| b.close.to_f64().unwrap_or(0.0)).collect();
        let highs: Vec<f64> = input.bars.iter().map(|b| b.high.to_f64().unwrap_or(0.0)).collect();
        let lows: Vec<f64> = input.bars.iter().map(|b| b.low.to_f64().unwrap_or(0.0)).collect();

        let bb = bollinger_bands(&closes, self.bb_period, self.bb_k)?;
        let bb_proj = bollinger::project(&bb);

        let rsi_value = rsi(&closes, self.rsi_period)?;
        let rsi_proj = rsi_extreme(rsi_value);

        let direction = match (bb_proj.direction, rsi_proj.direction) {
            (Direction::Long, Direction::Long) => Direction::Long,
            (Direction::Short, Direction::Short) => Direction::Short,
            _ => Direction::Neutral,
        };

        if direction == Direction::Neutral {
            return Ok(vec![]);
        }

        let strength = ((bb_proj.strength + rsi_proj.strength) / 2.0).clamp(0.0, 1.0);
        let atr_value = atr(&highs, &lows, &closes, self.atr_period)?;
        let last_close = *closes.last().expect("require_len guarantees non-empty");
        let entry = Decimal::from_f64(last_close).unwrap_or_default();
        let stop_distance = Decimal::from_f64(atr_value * self.atr_stop_multiplier).unwrap_or_default();
        let take_profit = Decimal::from_f64(bb.middle);

        let stop_loss = match direction {
            Direction::Long => entry - stop_distance,
            Direction::Short => entry + stop_distance,
            Direction::Neutral => unreachable!("filtered above"),
        };

        let mut indicators = HashMap::new();
        indicators.insert("rsi".to_string(), rsi_value);
        indicators.insert("bb_percentile".to_string(), bb.band_percentile);
        indicators.insert("atr".to_string(), atr_value);

        let reasons = vec![
            format!("bollinger band percentile {:.2}", bb.band_percentile),
            format!("rsi {:.1}", rsi_value),
            format!("regime {:?} favors reversion", input.regime),
        ];

        Ok(build_signal(
            input,
            self.source(),
            direction,
            strength,
            entry,
            stop_loss,
            take_profit,
            reasons,
            indicators,
        )
        .into_iter()
        .collect())
    }
}
