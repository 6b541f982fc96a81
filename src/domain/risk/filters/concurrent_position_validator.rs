use super::validator_trait::{RiskValidator, ValidationContext, ValidationResult};
use crate::domain::risk::risk_config::RiskConfig;

pub struct ConcurrentPositionValidator;

impl RiskValidator for ConcurrentPositionValidator {
    fn name(&self) -> &'static str {
        "concurrent_position_limit"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        if ctx.open_position_count >= ctx.config.max_concurrent_positions {
            return ValidationResult::block(format!(
                "at concurrent position limit ({}/{})",
                ctx.open_position_count, ctx.config.max_concurrent_positions
            ));
        }
        ValidationResult::allow()
    }
}
