use super::require_len;
use crate::domain::errors::EngineError;

/// Simple moving average of the last `period` prices.
pub fn sma(prices: &[f64], period: usize) -> Result<f64, EngineError> {
    require_len(prices.len(), period)?;
    let window = &prices[prices.len() - period..];
    Ok(window.iter().sum::<f64>() / period as f64)
}

/// Full SMA series (length `prices.len() - period + 1`), one value per
/// window.
pub fn sma_series(prices: &[f64], period: usize) -> Result<Vec<f64>, EngineError> {
    require_len(prices.len(), period)?;
    Ok(prices
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect())
}

/// Exponential moving average, seeded with `prices[0]` and smoothed forward
/// with multiplier `2 / (period + 1)`, matching the engine's EMA contract.
pub fn ema(prices: &[f64], period: usize) -> Result<f64, EngineError> {
    require_len(prices.len(), period)?;
    let series = ema_series(prices, period)?;
    Ok(*series.last().expect("ema_series non-empty when len >= period"))
}

/// Full EMA series, same length as `prices`.
pub fn ema_series(prices: &[f64], period: usize) -> Result<Vec<f64>, EngineError> {
    require_len(prices.len(), 1)?;
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut prev = prices[0];
    out.push(prev);
    for &p in &prices[1..] {
        prev = (p - prev) * multiplier + prev;
        out.push(prev);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_of_flat_series() {
        let prices = vec![10.0; 20];
        assert_eq!(sma(&prices, 10).unwrap(), 10.0);
    }

    #[test]
    fn sma_insufficient_data() {
        let prices = vec![1.0, 2.0];
        assert!(sma(&prices, 5).is_err());
    }

    #[test]
    fn ema_seeded_with_first_price() {
        let prices = vec![100.0, 100.0, 100.0];
        assert_eq!(ema(&prices, 5).unwrap(), 100.0);
    }

    #[test]
    fn ema_reacts_to_trend() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let short = ema(&prices, 5).unwrap();
        let long = ema(&prices, 20).unwrap();
        // A faster EMA tracks the latest (higher) prices more closely in an uptrend.
        assert!(short > long);
    }
}
