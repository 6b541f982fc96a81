//! EMA-cross + MACD + RSI-band momentum strategy. Confirms direction across
//! all three before emitting a candidate; a single indicator disagreeing
//! with the other two kills the signal rather than averaging through it.

use super::traits::{build_signal, Strategy, StrategyInput};
use crate::domain::errors::EngineError;
use crate::domain::indicators::moving_average::ema_series;
use crate::domain::indicators::{atr, macd, require_len, rsi, Direction};
use crate::domain::market::MarketRegime;
use crate::domain::signal::SignalSource;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct MomentumStrategy {
    pub fast_period: usize,
    pub slow_period: usize,
    pub macd_signal_period: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    /// Stop distance in multiples of ATR.
    pub atr_stop_multiplier: f64,
    /// Reward:risk ratio used to set the take-profit distance.
    pub reward_ratio: f64,
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            macd_signal_period: 9,
            rsi_period: 14,
            atr_period: 14,
            atr_stop_multiplier: 1.0,
            reward_ratio: 2.0,
        }
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn source(&self) -> SignalSource {
        SignalSource::Momentum
    }

    fn evaluate(&self, input: &StrategyInput) -> Result<Vec<Signal>, EngineError> {
        let need = self.slow_period + self.macd_signal_period + 1;
        require_len(input.bars.len(), need.max(self.atr_period * 2 + 1))?;

        let closes: Vec<f64> = input.bars.iter().map(|b| b.close.to_f64().unwrap_or(0.0)).collect();
        let highs: Vec<f64> = input.bars.iter().map(|b| b.high.to_f64().unwrap_or(0.0)).collect();
        let lows: Vec<f64> = input.bars.iter().map(|b| b.low.to_f64().unwrap_or(0.0)).collect();

        let fast_ema = ema_series(&closes, self.fast_period)?;
        let slow_ema = ema_series(&closes, self.slow_period)?;
        let ema_direction = match fast_ema.last().zip(slow_ema.last()) {
            Some((f, s)) if f > s => Direction::Long,
            Some((f, s)) if f < s => Direction::Short,
            _ => Direction::Neutral,
        };

        let macd_out = macd(&closes, self.fast_period, self.slow_period, self.macd_signal_period)?;
        let macd_proj = crate::domain::indicators::macd::project(&macd_out);

        // Momentum confirms via RSI's 50 midline (trend continuation), not
        // the 30/70 extremes Mean Reversion uses for contrarian entries -
        // those would flip a strong uptrend's RSI reading (pinned near 100)
        // into a SHORT vote and fight the EMA/MACD trend signal.
        let rsi_value = rsi(&closes, self.rsi_period)?;
        let rsi_direction = if rsi_value > 50.0 {
            Direction::Long
        } else if rsi_value < 50.0 {
            Direction::Short
        } else {
            Direction::Neutral
        };
        let rsi_strength = ((rsi_value - 50.0).abs() / 50.0).clamp(0.0, 1.0);

        let directions = [ema_direction, macd_proj.direction, rsi_direction];
        let agreed = if directions.iter().all(|d| *d == Direction::Long || *d == Direction::Neutral)
            && directions.contains(&Direction::Long)
        {
            Direction::Long
        } else if directions.iter().all(|d| *d == Direction::Short || *d == Direction::Neutral)
            && directions.contains(&Direction::Short)
        {
            Direction::Short
        } else {
            Direction::Neutral
        };

        let direction = match (agreed, input.regime) {
            (Direction::Long, MarketRegime::TrendDown) => Direction::Neutral,
            (Direction::Short, MarketRegime::TrendUp) => Direction::Neutral,
            (d, _) => d,
        };

        if direction == Direction::Neutral {
            return Ok(vec![]);
        }

        let strength = ((macd_proj.strength + rsi_strength) / 2.0).clamp(0.0, 1.0);
        let atr_value = atr(&highs, &lows, &closes, self.atr_period)?;
        let last_close = *closes.last().expect("require_len guarantees non-empty");
        let entry = Decimal::from_f64(last_close).unwrap_or_default();
        let stop_distance = Decimal::from_f64(atr_value * self.atr_stop_multiplier).unwrap_or_default();
        let reward_distance = Decimal::from_f64(atr_value * self.atr_stop_multiplier * self.reward_ratio)
            .unwrap_or_default();

        let (stop_loss, take_profit) = match direction {
            Direction::Long => (entry - stop_distance, Some(entry + reward_distance)),
            Direction::Short => (entry + stop_distance, Some(entry - reward_distance)),
            Direction::Neutral => unreachable!("filtered above"),
        };

        let mut indicators = HashMap::new();
        indicators.insert("rsi".to_string(), rsi_value);
        indicators.insert("macd_histogram".to_string(), macd_out.histogram);
        indicators.insert("atr".to_string(), atr_value);

        let reasons = vec![
            format!("ema{}/ema{} cross {:?}", self.fast_period, self.slow_period, ema_direction),
            format!("macd histogram {:.4}", macd_out.histogram),
            format!("rsi {:.1}", rsi_value),
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

use crate::domain::signal::Signal;
