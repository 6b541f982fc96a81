//! Market regime classification, used by the Signal Manager to gate signal
//! direction (no LONG in a down-trend, no SHORT in an up-trend) and by
//! Breakout to require ADX/DI confirmation.

use super::bar::PriceBar;
use crate::domain::errors::EngineError;
use crate::domain::indicators::{adx, atr};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketRegime {
    TrendUp,
    TrendDown,
    Ranging,
    Volatile,
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeDetector {
    pub adx_period: usize,
    pub atr_period: usize,
    /// ADX at or above this magnitude is classified as trending.
    pub trend_adx_threshold: f64,
    /// ATR as a percentage of price at or above this is classified volatile,
    /// provided the series isn't already trending.
    pub volatility_atr_pct_threshold: f64,
}

impl Default for RegimeDetector {
    fn default() -> Self {
        Self {
            adx_period: 14,
            atr_period: 14,
            trend_adx_threshold: 25.0,
            volatility_atr_pct_threshold: 2.0,
        }
    }
}

impl RegimeDetector {
    pub fn detect(&self, bars: &[PriceBar]) -> Result<MarketRegime, EngineError> {
        use rust_decimal::prelude::ToPrimitive;

        let highs: Vec<f64> = bars.iter().map(|b| b.high.to_f64().unwrap_or(0.0)).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low.to_f64().unwrap_or(0.0)).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close.to_f64().unwrap_or(0.0)).collect();

        let adx_out = adx(&highs, &lows, &closes, self.adx_period)?;
        let atr_value = atr(&highs, &lows, &closes, self.atr_period)?;
        let last_close = *closes.last().expect("adx succeeded implies non-empty");
        let atr_pct = if last_close.abs() > f64::EPSILON {
            atr_value / last_close * 100.0
        } else {
            0.0
        };

        if adx_out.adx >= self.trend_adx_threshold {
            return Ok(if adx_out.plus_di >= adx_out.minus_di {
                MarketRegime::TrendUp
            } else {
                MarketRegime::TrendDown
            });
        }

        if atr_pct >= self.volatility_atr_pct_threshold {
            return Ok(MarketRegime::Volatile);
        }

        Ok(MarketRegime::Ranging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(i: i64, close: f64) -> PriceBar {
        use rust_decimal::prelude::FromPrimitive;
        PriceBar::new(
            i * 60_000,
            rust_decimal::Decimal::from_f64(close).unwrap(),
            rust_decimal::Decimal::from_f64(close + 1.0).unwrap(),
            rust_decimal::Decimal::from_f64(close - 1.0).unwrap(),
            rust_decimal::Decimal::from_f64(close).unwrap(),
            dec!(1000),
        )
    }

    #[test]
    fn strong_uptrend_classifies_trend_up() {
        let bars: Vec<PriceBar> = (0..60).map(|i| bar(i, 100.0 + i as f64)).collect();
        let detector = RegimeDetector::default();
        assert_eq!(detector.detect(&bars).unwrap(), MarketRegime::TrendUp);
    }

    #[test]
    fn flat_series_classifies_ranging() {
        let bars: Vec<PriceBar> = (0..60).map(|i| bar(i, 100.0)).collect();
        let detector = RegimeDetector::default();
        assert_eq!(detector.detect(&bars).unwrap(), MarketRegime::Ranging);
    }

    #[test]
    fn insufficient_bars_is_insufficient_data() {
        let bars: Vec<PriceBar> = (0..5).map(|i| bar(i, 100.0)).collect();
        let detector = RegimeDetector::default();
        assert!(detector.detect(&bars).is_err());
    }
}
