use super::validator_trait::{RiskValidator, ValidationContext, ValidationResult};
use crate::domain::risk::risk_config::RiskConfig;

/// Hard affordability check. Unlike the position-size cap this blocks
/// outright rather than reducing — an order the account can't pay for at
/// any size is a broker rejection waiting to happen.
pub struct BuyingPowerValidator;

impl RiskValidator for BuyingPowerValidator {
    fn name(&self) -> &'static str {
        "buying_power"
    }

    fn priority(&self) -> u32 {
        30
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        if ctx.order_value > ctx.buying_power {
            return ValidationResult::block(format!(
                "order value {} exceeds buying power {}",
                ctx.order_value, ctx.buying_power
            ));
        }
        ValidationResult::allow()
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
    fn insufficient_buying_power_blocks() {
        let sig = signal();
        let state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let config = RiskConfig::default();
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(100),
            order_value: dec!(10000),
            equity: dec!(100000),
            buying_power: dec!(5000),
            open_position_count: 0,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        assert_eq!(
            BuyingPowerValidator.validate(&ctx).decision,
            super::super::validator_trait::Decision::Block
        );
    }
}
