//! Signal Manager: orchestrates regime detection, the time filter, every
//! enabled strategy, and the weighted combination of their candidates into
//! zero or more final Signals per symbol per tick. The only component that
//! constructs a Signal bound for persistence with `status = ACTIVE`.

use crate::domain::errors::EngineError;
use crate::domain::market::{MarketRegime, PriceBar, RegimeDetector};
use crate::domain::signal::{AssetClass, Direction, Signal, SignalSource, SignalStatus};
use crate::domain::strategies::{BreakoutStrategy, MeanReversionStrategy, MomentumStrategy, Strategy, StrategyInput};
use std::collections::HashMap;

use super::time_filter::TimeFilter;

#[derive(Debug, Clone, Copy)]
pub struct StrategyWeight {
    pub enabled: bool,
    pub weight: f64,
}

impl Default for StrategyWeight {
    fn default() -> Self {
        Self { enabled: true, weight: 1.0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SignalManagerConfig {
    pub momentum: StrategyWeight,
    pub mean_reversion: StrategyWeight,
    pub breakout: StrategyWeight,
    pub enable_regime_filter: bool,
    pub enable_time_filter: bool,
    pub min_strength: f64,
    pub max_signals_per_symbol: usize,
    pub signal_ttl_ms: i64,
}

impl Default for SignalManagerConfig {
    fn default() -> Self {
        Self {
            momentum: StrategyWeight { enabled: true, weight: 0.4 },
            mean_reversion: StrategyWeight { enabled: true, weight: 0.3 },
            breakout: StrategyWeight { enabled: true, weight: 0.3 },
            enable_regime_filter: true,
            enable_time_filter: true,
            min_strength: 0.6,
            max_signals_per_symbol: 3,
            signal_ttl_ms: 60 * 60 * 1000,
        }
    }
}

pub struct SignalManager {
    pub config: SignalManagerConfig,
    pub regime_detector: RegimeDetector,
    pub time_filter: TimeFilter,
    momentum: MomentumStrategy,
    mean_reversion: MeanReversionStrategy,
    breakout: BreakoutStrategy,
}

impl SignalManager {
    pub fn new(config: SignalManagerConfig, regime_detector: RegimeDetector, time_filter: TimeFilter) -> Self {
        Self {
            config,
            regime_detector,
            time_filter,
            momentum: MomentumStrategy::default(),
            mean_reversion: MeanReversionStrategy::default(),
            breakout: BreakoutStrategy::default(),
        }
    }

    /// Regime consistency gate: no LONG in a down-trend, no SHORT in an
    /// up-trend. Both directions are allowed in RANGING/VOLATILE.
    fn regime_allows(regime: MarketRegime, direction: Direction) -> bool {
        match (regime, direction) {
            (MarketRegime::TrendDown, Direction::Long) => false,
            (MarketRegime::TrendUp, Direction::Short) => false,
            _ => true,
        }
    }

    fn weight_for(&self, source: SignalSource) -> StrategyWeight {
        match source {
            SignalSource::Momentum => self.config.momentum,
            SignalSource::MeanReversion => self.config.mean_reversion,
            SignalSource::Breakout => self.config.breakout,
            SignalSource::Manual => StrategyWeight { enabled: true, weight: 1.0 },
        }
    }

    /// One tick, one symbol. Returns the final signals to persist, already
    /// capped and ordered strongest-first. Strategy `InsufficientData`
    /// errors are swallowed -- a symbol that can't evaluate this tick just
    /// emits nothing, not a hard failure for the whole batch.
    pub fn evaluate_symbol(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        timeframe: &str,
        bars: &[PriceBar],
        now_ms: i64,
        now_utc: chrono::DateTime<chrono::Utc>,
    ) -> Vec<Signal> {
        let regime = match self.regime_detector.detect(bars) {
            Ok(r) => r,
            Err(EngineError::InsufficientData { .. }) => return vec![],
        };

        if self.config.enable_time_filter && !self.time_filter.allows(asset_class, now_utc) {
            return vec![];
        }

        let input = StrategyInput {
            symbol,
            asset_class,
            timeframe,
            bars,
            regime,
            now_ms,
            min_strength: 0.0, // combination happens before the strength gate
            signal_ttl_ms: self.config.signal_ttl_ms,
        };

        let strategies: [(&dyn Strategy, bool); 3] = [
            (&self.momentum as &dyn Strategy, self.config.momentum.enabled),
            (&self.mean_reversion as &dyn Strategy, self.config.mean_reversion.enabled),
            (&self.breakout as &dyn Strategy, self.config.breakout.enabled),
        ];

        let mut candidates = Vec::new();
        for (strategy, enabled) in strategies {
            if !enabled {
                continue;
            }
            if let Ok(signals) = strategy.evaluate(&input) {
                candidates.extend(signals);
            }
        }

        let mut by_direction: HashMap<Direction, Vec<Signal>> = HashMap::new();
        for candidate in candidates {
            by_direction.entry(candidate.direction).or_default().push(candidate);
        }

        let mut combined = Vec::new();
        for (direction, group) in by_direction {
            if direction == Direction::Neutral {
                continue;
            }
            if self.config.enable_regime_filter && !Self::regime_allows(regime, direction) {
                continue;
            }

            let combined_strength: f64 = group.iter().map(|s| self.weight_for(s.source).weight * s.strength).sum();
            if combined_strength < self.config.min_strength {
                continue;
            }

            let strongest = group.iter().max_by(|a, b| a.strength.total_cmp(&b.strength)).expect("group is non-empty");
            let mut reasons = Vec::new();
            let mut indicators = HashMap::new();
            for s in &group {
                reasons.extend(s.reasons.iter().cloned());
                indicators.extend(s.indicators.iter().map(|(k, v)| (k.clone(), *v)));
            }

            combined.push(Signal {
                id: uuid::Uuid::new_v4().to_string(),
                symbol: symbol.to_string(),
                asset_class,
                timeframe: timeframe.to_string(),
                direction,
                strength: combined_strength.clamp(0.0, 1.0),
                entry_price: strongest.entry_price,
                stop_loss: strongest.stop_loss,
                take_profit: strongest.take_profit,
                source: strongest.source,
                regime,
                reasons,
                indicators,
                status: SignalStatus::Active,
                timestamp: now_ms,
                expires_at: now_ms + self.config.signal_ttl_ms,
            });
        }

        combined.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        combined.truncate(self.config.max_signals_per_symbol);
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Timeframe;
    use chrono::TimeZone;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;

    fn flat_bars(n: usize, price: f64) -> Vec<PriceBar> {
        (0..n)
            .map(|i| {
                PriceBar::new(
                    i as i64 * 300_000,
                    Decimal::from_f64(price).unwrap(),
                    Decimal::from_f64(price + 0.2).unwrap(),
                    Decimal::from_f64(price - 0.2).unwrap(),
                    Decimal::from_f64(price).unwrap(),
                    Decimal::from_f64(1000.0).unwrap(),
                )
            })
            .collect()
    }

    fn midday_tuesday() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap()
    }

    fn manager() -> SignalManager {
        SignalManager::new(
            SignalManagerConfig::default(),
            RegimeDetector::default(),
            super::super::time_filter::TimeFilter::new(super::super::time_filter::TimeFilterConfig::default()),
        )
    }

    #[test]
    fn insufficient_bars_emits_nothing() {
        let manager = manager();
        let bars = flat_bars(5, 100.0);
        let signals = manager.evaluate_symbol("MNQ", AssetClass::Futures, Timeframe::FiveMin.as_str(), &bars, 1_000_000, midday_tuesday());
        assert!(signals.is_empty());
    }

    #[test]
    fn flat_market_emits_nothing() {
        let manager = manager();
        let bars = flat_bars(60, 100.0);
        let signals = manager.evaluate_symbol("MNQ", AssetClass::Futures, Timeframe::FiveMin.as_str(), &bars, 1_000_000, midday_tuesday());
        assert!(signals.is_empty());
    }

    #[test]
    fn time_filter_rejection_suppresses_all_strategies() {
        let manager = manager();
        let bars = flat_bars(60, 100.0);
        let weekend = chrono::Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let signals = manager.evaluate_symbol("MNQ", AssetClass::Futures, Timeframe::FiveMin.as_str(), &bars, 1_000_000, weekend);
        assert!(signals.is_empty());
    }

    #[test]
    fn caps_at_max_signals_per_symbol() {
        let mut config = SignalManagerConfig::default();
        config.max_signals_per_symbol = 1;
        let manager = SignalManager::new(
            config,
            RegimeDetector::default(),
            super::super::time_filter::TimeFilter::new(super::super::time_filter::TimeFilterConfig::default()),
        );
        let bars = flat_bars(60, 100.0);
        let signals = manager.evaluate_symbol("MNQ", AssetClass::Futures, Timeframe::FiveMin.as_str(), &bars, 1_000_000, midday_tuesday());
        assert!(signals.len() <= 1);
    }
}
