//! The Risk Manager facade: volatility-adjusted position sizing feeding a
//! sequenced validator chain. This is the single entry point the engine
//! calls per signal; nothing downstream of `evaluate_order` re-derives
//! quantity or re-checks the circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::filters::{
    buying_power_validator::BuyingPowerValidator, circuit_breaker_validator::CircuitBreakerValidator,
    concurrent_position_validator::ConcurrentPositionValidator, exposure_validator::ExposureValidator,
    pdt_validator::PdtValidator, position_size_validator::PositionSizeValidator, Decision, RiskValidator,
    ValidationContext,
};
use super::risk_config::RiskConfig;
use super::state::RiskState;
use crate::domain::exposure::ExposureLimits;
use crate::domain::signal::Signal;
use crate::domain::trading::AggregatedAccount;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct RiskDecision {
    pub decision: Decision,
    /// Set on ALLOW/REDUCE; `None` on BLOCK.
    pub position_size: Option<Decimal>,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
    /// Name of every validator that ran, in order, for audit purposes.
    pub checks: Vec<&'static str>,
}

/// Volatility-adjusted, signal-weighted position sizing (spec formula):
/// `riskAmount / stopDistance`, scaled by `0.5 + 0.5 * strength`, clamped to
/// the configured min/max order value, rounded to 2 decimal places.
///
/// Returns `Decimal::ZERO` when `equity <= 0` or `stopDistance <= 0` -- the
/// caller treats either as an immediate REDUCE rather than running the rest
/// of the chain against a meaningless size.
pub fn compute_position_size(
    equity: Decimal,
    entry_price: Decimal,
    stop_loss: Decimal,
    strength: f64,
    config: &RiskConfig,
) -> Decimal {
    if equity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let stop_distance = (entry_price - stop_loss).abs();
    if stop_distance <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let risk_amount = equity * Decimal::from_f64(config.risk_per_trade_pct).unwrap_or_default();
    let base_qty = risk_amount / stop_distance;
    let scale = Decimal::from_f64(0.5 + 0.5 * strength.clamp(0.0, 1.0)).unwrap_or(Decimal::new(5, 1));
    let qty = base_qty * scale;

    if entry_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let min_qty = config.min_order_value / entry_price;
    let max_qty = config.max_order_value / entry_price;
    let clamped = qty.clamp(min_qty, max_qty);
    clamped.round_dp(2)
}

pub struct RiskManager {
    pub config: RiskConfig,
    pub circuit_breaker: CircuitBreaker,
    pub exposure_limits: ExposureLimits,
}

impl RiskManager {
    pub fn new(config: RiskConfig, exposure_limits: ExposureLimits) -> Self {
        let circuit_breaker = CircuitBreaker::new(config.cooldown_minutes);
        Self {
            config,
            circuit_breaker,
            exposure_limits,
        }
    }

    /// Runs the full sequenced chain of spec §4.4: circuit breaker ->
    /// concurrent-position limit -> position sizing -> max-position-percent
    /// -> exposure -> PDT. `current_positions` is the symbol -> signed
    /// notional book the exposure check projects the candidate onto.
    pub fn evaluate_order(
        &self,
        signal: &Signal,
        account: &AggregatedAccount,
        state: &RiskState,
        open_position_count: usize,
        current_positions: &HashMap<String, Decimal>,
        now_ms: i64,
    ) -> RiskDecision {
        let cb_state = self.circuit_breaker.current_state(state, now_ms);

        let provisional_qty =
            compute_position_size(account.equity, signal.entry_price, signal.stop_loss, signal.strength, &self.config);

        if provisional_qty.is_zero() {
            return RiskDecision {
                decision: Decision::Reduce,
                position_size: Some(Decimal::ZERO),
                reason: Some("cannot size position: non-positive equity or zero stop distance".to_string()),
                warnings: vec![],
                checks: vec!["position_sizing"],
            };
        }

        let order_value = provisional_qty * signal.entry_price;

        let ctx = ValidationContext {
            signal,
            quantity: provisional_qty,
            order_value,
            equity: account.equity,
            buying_power: account.buying_power,
            open_position_count,
            state,
            config: &self.config,
            circuit_breaker_state: cb_state,
            now_ms,
        };

        let concurrent = ConcurrentPositionValidator;
        let size = PositionSizeValidator;
        let buying_power = BuyingPowerValidator;
        let pdt = PdtValidator;
        let cb = CircuitBreakerValidator;
        let exposure = ExposureValidator {
            limits: self.exposure_limits.clone(),
            current_positions: current_positions.clone(),
        };

        let validators: [&dyn RiskValidator; 6] = [&cb, &concurrent, &size, &buying_power, &pdt, &exposure];
        let checks = validators.iter().map(|v| v.name()).collect();
        let outcome = super::filters::run_chain(&validators, ctx);

        // `run_chain` only distinguishes Allow/Block internally; a chain
        // that allowed but trimmed the quantity along the way is reported
        // up as REDUCE so callers can tell "got exactly what it asked for"
        // from "got less".
        let decision = match outcome.decision {
            Decision::Allow if outcome.final_quantity < provisional_qty => Decision::Reduce,
            other => other,
        };

        RiskDecision {
            decision,
            position_size: match decision {
                Decision::Block => None,
                _ => Some(outcome.final_quantity),
            },
            reason: outcome.reason,
            warnings: outcome.warnings,
            checks,
        }
    }
}
