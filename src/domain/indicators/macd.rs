use super::moving_average::ema_series;
use super::{Direction, SignalProjection, require_len};
use crate::domain::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub previous_histogram: Option<f64>,
}

/// `macd = EMA_fast - EMA_slow`, `signal = EMA(macd, signal_period)`,
/// `histogram = macd - signal`. Needs enough bars to seed both EMAs plus the
/// signal-line smoothing.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal_period: usize) -> Result<MacdOutput, EngineError> {
    require_len(prices.len(), slow + signal_period)?;

    let fast_series = ema_series(prices, fast)?;
    let slow_series = ema_series(prices, slow)?;
    let macd_series: Vec<f64> = fast_series
        .iter()
        .zip(slow_series.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_series = ema_series(&macd_series, signal_period)?;
    let histogram_series: Vec<f64> = macd_series
        .iter()
        .zip(signal_series.iter())
        .map(|(m, s)| m - s)
        .collect();

    let histogram = *histogram_series.last().expect("non-empty");
    let previous_histogram = if histogram_series.len() >= 2 {
        Some(histogram_series[histogram_series.len() - 2])
    } else {
        None
    };

    Ok(MacdOutput {
        macd: *macd_series.last().expect("non-empty"),
        signal: *signal_series.last().expect("non-empty"),
        histogram,
        previous_histogram,
    })
}

/// A sign change in the histogram (momentum reversing) projects strength
/// 0.7; a same-sign histogram (trend continuing) projects strength 0.5.
pub fn project(output: &MacdOutput) -> SignalProjection {
    let direction = if output.histogram > 0.0 {
        Direction::Long
    } else if output.histogram < 0.0 {
        Direction::Short
    } else {
        return SignalProjection::neutral();
    };

    let sign_changed = output
        .previous_histogram
        .map(|prev| prev.signum() != output.histogram.signum())
        .unwrap_or(false);

    SignalProjection {
        direction,
        strength: if sign_changed { 0.7 } else { 0.5 },
    }
}
