use super::validator_trait::{RiskValidator, ValidationContext, ValidationResult};
use crate::domain::risk::risk_config::RiskConfig;
use rust_decimal::Decimal;

/// Caps order value at `maxPositionSizePct` of equity. Never blocks — an
/// oversized candidate gets its quantity halved once rather than rejected.
/// This is a single downgrade, not an iterative re-check against the cap:
/// a large enough overage can still leave the halved order above the cap,
/// and that's accepted as-is rather than looped back through.
pub struct PositionSizeValidator;

impl RiskValidator for PositionSizeValidator {
    fn name(&self) -> &'static str {
        "max_position_pct"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        let cap = ctx.equity * Decimal::try_from(ctx.config.max_position_size_pct).unwrap_or_default();
        if ctx.order_value <= cap {
            return ValidationResult::allow();
        }
        let halved_quantity = (ctx.quantity / Decimal::TWO).round_dp(2);
        ValidationResult::reduce(
            halved_quantity,
            format!(
                "order value {} exceeds {}% of equity cap {}; position size reduced to {}",
                ctx.order_value,
                ctx.config.max_position_size_pct * 100.0,
                cap,
                halved_quantity
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::circuit_breaker::CircuitBreakerState;
    use crate::domain::risk::state::RiskState;
    use crate::domain::signal::{AssetClass, Direction, Signal, SignalSource, SignalStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn signal() -> Signal {
        Signal {
            id: "s".into(),
            symbol: "MNQ".into(),
            asset_class: AssetClass::Futures,
            timeframe: "5Min".into(),
            direction: Direction::Long,
            strength: 0.8,
            entry_price: dec!(100),
            stop_loss: dec!(95),
            take_profit: None,
            source: SignalSource::Momentum,
            regime: crate::domain::market::MarketRegime::TrendUp,
            reasons: vec![],
            indicators: HashMap::new(),
            status: SignalStatus::Active,
            timestamp: 0,
            expires_at: 300_000,
        }
    }

    #[test]
    fn within_cap_allows() {
        let sig = signal();
        let state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let config = RiskConfig::default();
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(50),
            order_value: dec!(5000),
            equity: dec!(100000),
            buying_power: dec!(100000),
            open_position_count: 0,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        assert_eq!(
            PositionSizeValidator.validate(&ctx).decision,
            super::super::validator_trait::Decision::Allow
        );
    }

    #[test]
    fn over_cap_halves_quantity() {
        let sig = signal();
        let state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let config = RiskConfig::default(); // 10% of 100000 = 10000
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(200),
            order_value: dec!(20000),
            equity: dec!(100000),
            buying_power: dec!(100000),
            open_position_count: 0,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        let result = PositionSizeValidator.validate(&ctx);
        assert_eq!(result.decision, super::super::validator_trait::Decision::Reduce);
        assert_eq!(result.adjusted_quantity.unwrap(), dec!(100));
    }

    /// The spec's worked scenario: a massively oversized order gets halved
    /// exactly once, even though the result still clears the cap by a wide
    /// margin — there's no iterative re-check back against it.
    #[test]
    fn large_overage_is_halved_not_clamped_to_cap() {
        let sig = signal();
        let state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let mut config = RiskConfig::default();
        config.max_position_size_pct = 0.20;
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(18),
            order_value: dec!(270000),
            equity: dec!(100000),
            buying_power: dec!(300000),
            open_position_count: 0,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        let result = PositionSizeValidator.validate(&ctx);
        assert_eq!(result.decision, super::super::validator_trait::Decision::Reduce);
        assert_eq!(result.adjusted_quantity.unwrap(), dec!(9.00));
    }
}
