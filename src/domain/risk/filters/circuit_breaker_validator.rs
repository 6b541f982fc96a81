use super::validator_trait::{Decision, RiskValidator, ValidationContext, ValidationResult};
use crate::domain::risk::circuit_breaker::CircuitBreakerState;
use crate::domain::risk::risk_config::RiskConfig;

/// Gate zero: nothing else runs while the breaker is OPEN. RESETTABLE still
/// blocks here too — a cooldown elapsing isn't the same as someone clearing
/// it, see `CircuitBreaker::reset`.
pub struct CircuitBreakerValidator;

impl RiskValidator for CircuitBreakerValidator {
    fn name(&self) -> &'static str {
        "circuit_breaker"
    }

    fn priority(&self) -> u32 {
        0
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        match ctx.circuit_breaker_state {
            CircuitBreakerState::Closed => ValidationResult::allow(),
            CircuitBreakerState::Open | CircuitBreakerState::Resettable => {
                let reason = ctx
                    .state
                    .circuit_breaker_reason
                    .clone()
                    .unwrap_or_else(|| "circuit breaker engaged".to_string());
                ValidationResult::block(format!("circuit breaker open: {reason}"))
            }
        }
    }
}
