use super::require_len;
use crate::domain::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub bandwidth: f64,
    /// True when this bar's bandwidth is below 50% of the mean bandwidth
    /// over the calculated series.
    pub squeeze: bool,
    /// Where the latest close sits within the bands, in `[0, 1]` (0 = lower
    /// band, 1 = upper band); used by Mean Reversion's extremity check.
    pub band_percentile: f64,
}

/// Bollinger Bands over the trailing `period` closes with `k` standard
/// deviations. Needs the full series (not just the latest window) to
/// determine whether the latest bar is in a squeeze relative to the mean
/// bandwidth.
pub fn bollinger_bands(prices: &[f64], period: usize, k: f64) -> Result<BollingerBands, EngineError> {
    require_len(prices.len(), period)?;

    let bandwidths_and_bands: Vec<(f64, f64, f64, f64)> = prices
        .windows(period)
        .map(|window| {
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / period as f64;
            let sigma = variance.sqrt();
            let upper = mean + k * sigma;
            let lower = mean - k * sigma;
            let bandwidth = if mean.abs() > f64::EPSILON {
                2.0 * k * sigma / mean
            } else {
                0.0
            };
            (upper, mean, lower, bandwidth)
        })
        .collect();

    let mean_bandwidth =
        bandwidths_and_bands.iter().map(|(_, _, _, bw)| bw).sum::<f64>() / bandwidths_and_bands.len() as f64;

    let (upper, middle, lower, bandwidth) = *bandwidths_and_bands
        .last()
        .expect("non-empty: require_len guarantees at least one window");

    let squeeze = mean_bandwidth > f64::EPSILON && bandwidth < 0.5 * mean_bandwidth;

    let latest_close = *prices.last().expect("non-empty");
    let range = upper - lower;
    let band_percentile = if range > f64::EPSILON {
        ((latest_close - lower) / range).clamp(0.0, 1.0)
    } else {
        0.5
    };

    Ok(BollingerBands {
        upper,
        middle,
        lower,
        bandwidth,
        squeeze,
        band_percentile,
    })
}

/// At-band strength 0.8: close at or beyond the lower band projects LONG,
/// at or beyond the upper band projects SHORT. Inside the bands, neutral.
pub fn project(bb: &BollingerBands) -> super::SignalProjection {
    use super::{Direction, SignalProjection};

    if bb.band_percentile <= 0.0 {
        SignalProjection {
            direction: Direction::Long,
            strength: 0.8,
        }
    } else if bb.band_percentile >= 1.0 {
        SignalProjection {
            direction: Direction::Short,
            strength: 0.8,
        }
    } else {
        SignalProjection::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_has_zero_bandwidth() {
        let prices = vec![100.0; 25];
        let bb = bollinger_bands(&prices, 20, 2.0).unwrap();
        assert_eq!(bb.bandwidth, 0.0);
        assert!(bb.upper.is_finite() && bb.lower.is_finite());
    }

    #[test]
    fn detects_squeeze_after_expansion() {
        // Volatile first half, flat-out second half: the last window's
        // bandwidth should sit well below the series mean.
        let mut prices: Vec<f64> = Vec::new();
        for i in 0..40 {
            prices.push(100.0 + if i % 2 == 0 { 5.0 } else { -5.0 });
        }
        for _ in 0..25 {
            prices.push(100.0);
        }
        let bb = bollinger_bands(&prices, 20, 2.0).unwrap();
        assert!(bb.squeeze);
    }

    #[test]
    fn band_percentile_at_lower_band_is_near_zero() {
        let mut prices = vec![100.0; 20];
        prices.push(90.0);
        let bb = bollinger_bands(&prices, 20, 2.0).unwrap();
        assert!(bb.band_percentile < 0.3);
    }

    #[test]
    fn project_is_neutral_inside_bands() {
        let prices = vec![100.0; 25];
        let bb = bollinger_bands(&prices, 20, 2.0).unwrap();
        assert_eq!(project(&bb).strength, 0.0);
    }

    #[test]
    fn project_at_upper_band_projects_short() {
        let mut prices = vec![100.0; 20];
        prices.push(130.0);
        let bb = bollinger_bands(&prices, 20, 2.0).unwrap();
        let proj = project(&bb);
        assert_eq!(proj.direction, super::super::Direction::Short);
        assert_eq!(proj.strength, 0.8);
    }
}
