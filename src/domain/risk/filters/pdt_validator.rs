use super::validator_trait::{RiskValidator, ValidationContext, ValidationResult};
use crate::domain::risk::risk_config::RiskConfig;
use crate::domain::signal::AssetClass;

/// Maps an equities symbol a PDT block should redirect the trader toward
/// its correlated, non-PDT futures contract.
fn futures_substitute(symbol: &str) -> Option<&'static str> {
    match symbol {
        "TQQQ" | "QQQ" => Some("MNQ"),
        "SPY" => Some("MES"),
        "IWM" => Some("M2K"),
        _ => None,
    }
}

/// Pattern day trading guard. Equities only -- futures contracts aren't
/// subject to PDT, so this is a no-op for `AssetClass::Futures`. Blocks a
/// new entry once the rolling day-trade count is exhausted; exits are not
/// gated here (the risk manager routes closing orders around the chain
/// entirely).
pub struct PdtValidator;

impl RiskValidator for PdtValidator {
    fn name(&self) -> &'static str {
        "pattern_day_trading"
    }

    fn priority(&self) -> u32 {
        50
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        if ctx.signal.asset_class != AssetClass::Equity {
            return ValidationResult::allow();
        }
        let effective_limit = ctx.config.max_day_trades.saturating_sub(ctx.config.pdt_reserve_day_trades);
        if ctx.state.day_trades_used + 1 > effective_limit {
            let mut reason = format!(
                "pattern day trading limit reached ({}/{}, reserve {})",
                ctx.state.day_trades_used, ctx.config.max_day_trades, ctx.config.pdt_reserve_day_trades
            );
            if let Some(sub) = futures_substitute(&ctx.signal.symbol) {
                reason.push_str(&format!("; consider the paired futures symbol {sub} instead"));
            }
            return ValidationResult::block(reason);
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
            symbol: "AAPL".into(),
            asset_class: AssetClass::Equity,
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
    fn exhausted_day_trades_blocks() {
        let sig = signal();
        let mut state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let config = RiskConfig::default();
        state.day_trades_used = config.max_day_trades;
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(1),
            order_value: dec!(100),
            equity: dec!(100000),
            buying_power: dec!(100000),
            open_position_count: 0,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        assert_eq!(PdtValidator.validate(&ctx).decision, super::super::validator_trait::Decision::Block);
    }

    #[test]
    fn remaining_day_trades_allows() {
        let sig = signal();
        let state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let config = RiskConfig::default();
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(1),
            order_value: dec!(100),
            equity: dec!(100000),
            buying_power: dec!(100000),
            open_position_count: 0,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        assert_eq!(PdtValidator.validate(&ctx).decision, super::super::validator_trait::Decision::Allow);
    }

    #[test]
    fn futures_signals_bypass_pdt_entirely() {
        let mut sig = signal();
        sig.asset_class = AssetClass::Futures;
        sig.symbol = "MNQ".into();
        let mut state = RiskState::new(dec!(100000), NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), 0);
        let config = RiskConfig::default();
        state.day_trades_used = config.max_day_trades;
        let ctx = ValidationContext {
            signal: &sig,
            quantity: dec!(1),
            order_value: dec!(100),
            equity: dec!(100000),
            buying_power: dec!(100000),
            open_position_count: 0,
            state: &state,
            config: &config,
            circuit_breaker_state: CircuitBreakerState::Closed,
            now_ms: 0,
        };
        assert_eq!(PdtValidator.validate(&ctx).decision, super::super::validator_trait::Decision::Allow);
    }
}
