use super::require_len;
use crate::domain::errors::EngineError;

/// Average True Range, Wilder-smoothed. `highs`, `lows`, `closes` must be
/// the same length and aligned index-for-index.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Result<f64, EngineError> {
    require_len(highs.len(), period + 1)?;
    require_len(lows.len(), period + 1)?;
    require_len(closes.len(), period + 1)?;

    let true_ranges: Vec<f64> = (1..highs.len())
        .map(|i| {
            let high_low = highs[i] - lows[i];
            let high_close = (highs[i] - closes[i - 1]).abs();
            let low_close = (lows[i] - closes[i - 1]).abs();
            high_low.max(high_close).max(low_close)
        })
        .collect();

    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    for tr in &true_ranges[period..] {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
    }

    Ok(atr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_has_zero_atr() {
        let highs = vec![101.0; 20];
        let lows = vec![99.0; 20];
        let closes = vec![100.0; 20];
        let value = atr(&highs, &lows, &closes, 14).unwrap();
        // high-low range is constant 2.0 every bar; true range never collapses to 0.
        assert_eq!(value, 2.0);
    }

    #[test]
    fn insufficient_data() {
        let highs = vec![101.0; 5];
        let lows = vec![99.0; 5];
        let closes = vec![100.0; 5];
        assert!(atr(&highs, &lows, &closes, 14).is_err());
    }

    #[test]
    fn never_nan() {
        let highs = vec![101.0; 20];
        let lows = vec![99.0; 20];
        let closes = vec![100.0; 20];
        assert!(atr(&highs, &lows, &closes, 14).unwrap().is_finite());
    }
}
