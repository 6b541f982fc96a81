use super::validator_trait::{RiskValidator, ValidationContext, ValidationResult};
use crate::domain::exposure::{compute_exposure, ExposureLimits};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Projects the candidate order onto the current position book and checks
/// whether it would push gross/net/group exposure past the hard limit.
/// Warnings below the limit are surfaced, never blocking.
pub struct ExposureValidator {
    pub limits: ExposureLimits,
    pub current_positions: HashMap<String, Decimal>,
}

impl RiskValidator for ExposureValidator {
    fn name(&self) -> &'static str {
        "exposure"
    }

    fn priority(&self) -> u32 {
        40
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        let mut projected = self.current_positions.clone();
        let signed_value = match ctx.signal.direction {
            crate::domain::signal::Direction::Long => ctx.order_value,
            crate::domain::signal::Direction::Short => -ctx.order_value,
            crate::domain::signal::Direction::Neutral => Decimal::ZERO,
        };
        *projected.entry(ctx.signal.symbol.clone()).or_insert(Decimal::ZERO) += signed_value;

        let report = compute_exposure(&projected, ctx.equity, &self.limits);
        if !report.breaches.is_empty() {
            return ValidationResult::block(report.breaches.join("; "));
        }
        let mut result = ValidationResult::allow();
        result.warnings = report.warnings;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::circuit_breaker::CircuitBreakerState;
    use crate::domain::risk::risk_config::RiskConfig;
    use crate::domain::risk::state::RiskState;
    use crate::domain::signal::{AssetClass, Direction, Signal, SignalSource, SignalStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn signal() -> Signal {
        Signal {
            id: "s".into(),
            symbol: "ESH25".into(),
            asset_class: AssetClass::Futures,
            timeframe: "5Min".into(),
            direction: Direction::Long,
            strength: 0.8,
            entry_price: dec!(5000),
            stop_loss: dec!(4900),
            take_profit: None,
            source: SignalSource::Momentum,
            regime: crate::domain::market::MarketRegime::TrendUp,
            reasons: vec![],
            indicators: std::collections::HashMap::new(),
            status: SignalStatus::Active,
            timestamp: 0,
            expires_at: 300_000,
        }
    }

    #[test]
    fn breaching_group_limit_blocks() {
        let sig = signal();
        let state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let config = RiskConfig::default();
        let mut positions = HashMap::new();
        positions.insert("ESM25".to_string(), dec!(45000));
        let validator = ExposureValidator {
            limits: ExposureLimits::default(),
            current_positions: positions,
        };
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(10),
            order_value: dec!(10000),
            equity: dec!(100000),
            buying_power: dec!(100000),
            open_position_count: 1,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        assert_eq!(
            validator.validate(&ctx).decision,
            super::super::validator_trait::Decision::Block
        );
    }
}
