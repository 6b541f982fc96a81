use super::{Direction, SignalProjection, require_len};
use crate::domain::errors::EngineError;

/// Wilder's RSI. Fails with `InsufficientData` when `prices.len() < period + 1`
/// (need at least `period` deltas). If the average loss is zero the series
/// has no down moves and RSI is defined as 100, never a division by zero.
pub fn rsi(prices: &[f64], period: usize) -> Result<f64, EngineError> {
    require_len(prices.len(), period + 1)?;

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain: f64 = deltas[..period].iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss: f64 =
        deltas[..period].iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    for delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Ok(100.0);
    }

    let rs = avg_gain / avg_loss;
    Ok(100.0 - (100.0 / (1.0 + rs)))
}

/// RSI < 30 is oversold (LONG bias), > 70 is overbought (SHORT bias).
/// Strength scales linearly with distance past the threshold, capped at 1.0.
pub fn project(rsi_value: f64) -> SignalProjection {
    if rsi_value < 30.0 {
        SignalProjection {
            direction: Direction::Long,
            strength: ((30.0 - rsi_value) / 30.0).min(1.0).max(0.0),
        }
    } else if rsi_value > 70.0 {
        SignalProjection {
            direction: Direction::Short,
            strength: ((rsi_value - 70.0) / 30.0).min(1.0).max(0.0),
        }
    } else {
        SignalProjection::neutral()
    }
}
