//! Bollinger-squeeze breakout strategy. Requires ADX/DI confirmation that
//! directional movement actually backs the break — a price poking outside
//! the bands on falling volume and flat DI is noise, not a breakout.

use super::traits::{build_signal, Strategy, StrategyInput};
use crate::domain::errors::EngineError;
use crate::domain::indicators::{adx, atr, bollinger_bands, require_len, volume_profile, Direction};
use crate::domain::signal::{Signal, SignalSource};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct BreakoutStrategy {
    pub bb_period: usize,
    pub bb_k: f64,
    pub adx_period: usize,
    pub volume_period: usize,
    pub atr_period: usize,
    pub atr_stop_multiplier: f64,
    pub reward_ratio: f64,
    /// Relative volume a breakout bar must clear to be taken seriously.
    pub min_rvol: f64,
}

impl Default for BreakoutStrategy {
    fn default() -> Self {
        Self {
            bb_period: 20,
            bb_k: 2.0,
            adx_period: 14,
            volume_period: 20,
            atr_period: 14,
            atr_stop_multiplier: 2.0,
            reward_ratio: 2.0,
            min_rvol: 1.2,
        }
    }
}

impl Strategy for BreakoutStrategy {
    fn name(&self) -> &'static str {
        "breakout"
    }

    fn source(&self) -> SignalSource {
        SignalSource::Breakout
    }

    fn evaluate(&self, input: &StrategyInput) -> Result<Vec<Signal>, EngineError> {
        let need = (self.bb_period + 1)
            .max(self.adx_period * 2 + 1)
            .max(self.volume_period)
            .max(self.atr_period + 1);
        require_len(input.bars.len(), need)?;

        let closes: Vec<f64> = input.bars.iter().map(|b| b.close.to_f64().unwrap_or(0.0)).collect();
        let highs: Vec<f64> = input.bars.iter().map(|b| b.high.to_f64().unwrap_or(0.0)).collect();
        let lows: Vec<f64> = input.bars.iter().map(|b| b.low.to_f64().unwrap_or(0.0)).collect();
        let volumes: Vec<f64> = input.bars.iter().map(|b| b.volume.to_f64().unwrap_or(0.0)).collect();

        let bb = bollinger_bands(&closes, self.bb_period, self.bb_k)?;
        if !bb.squeeze && bb.band_percentile > 0.0 && bb.band_percentile < 1.0 {
            // No recent consolidation and price isn't beyond a band: nothing
            // to break out of.
            return Ok(vec![]);
        }

        let price_direction = if bb.band_percentile >= 1.0 {
            Direction::Long
        } else if bb.band_percentile <= 0.0 {
            Direction::Short
        } else {
            Direction::Neutral
        };
        if price_direction == Direction::Neutral {
            return Ok(vec![]);
        }

        // A close that's been pinned beyond a band for many bars would keep
        // re-firing; require the previous bar to have still been inside the
        // bands so this only fires on the bar that actually crosses.
        let prev_bb = bollinger_bands(&closes[..closes.len() - 1], self.bb_period, self.bb_k)?;
        let prev_was_inside = prev_bb.band_percentile > 0.0 && prev_bb.band_percentile < 1.0;
        if !prev_was_inside {
            return Ok(vec![]);
        }

        let adx_out = adx(&highs, &lows, &closes, self.adx_period)?;
        let di_direction = if adx_out.plus_di > adx_out.minus_di {
            Direction::Long
        } else if adx_out.minus_di > adx_out.plus_di {
            Direction::Short
        } else {
            Direction::Neutral
        };

        let volume = volume_profile(&volumes, self.volume_period)?;

        if price_direction != di_direction || volume.rvol < self.min_rvol {
            return Ok(vec![]);
        }
        let direction = price_direction;

        let adx_proj = adx::project(&adx_out);
        let strength = adx_proj.strength.max(0.5).clamp(0.0, 1.0);

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
        indicators.insert("adx".to_string(), adx_out.adx);
        indicators.insert("rvol".to_string(), volume.rvol);
        indicators.insert("bb_percentile".to_string(), bb.band_percentile);
        indicators.insert("atr".to_string(), atr_value);

        let reasons = vec![
            format!("bollinger squeeze={} percentile={:.2}", bb.squeeze, bb.band_percentile),
            format!("adx {:.1} with di dominance {:?}", adx_out.adx, di_direction),
            format!("rvol {:.2}", volume.rvol),
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
