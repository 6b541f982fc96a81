pub mod buying_power_validator;
pub mod circuit_breaker_validator;
pub mod concurrent_position_validator;
pub mod exposure_validator;
pub mod pdt_validator;
pub mod position_size_validator;
pub mod validator_trait;

pub use validator_trait::{Decision, RiskValidator, ValidationContext, ValidationResult};

/// Outcome of running the full chain: either the (possibly reduced)
/// quantity to trade, or the reason trading was blocked. Warnings
/// accumulate from every validator that ran before a block, or from all of
/// them on an allow.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub decision: Decision,
    pub final_quantity: rust_decimal::Decimal,
    pub blocked_by: Option<&'static str>,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

/// Runs validators in ascending `priority()` order. A `Block` stops the
/// chain immediately; a `Reduce` updates the context's quantity for every
/// subsequent validator (so a later exposure check sees the already-reduced
/// size, not the original).
pub fn run_chain(validators: &[&dyn RiskValidator], mut ctx: ValidationContext) -> ChainOutcome {
    let mut ordered: Vec<&&dyn RiskValidator> = validators.iter().collect();
    ordered.sort_by_key(|v| v.priority());

    let mut warnings = Vec::new();
    let mut quantity = ctx.quantity;

    for validator in ordered {
        if !validator.is_enabled(ctx.config) {
            continue;
        }
        let result = validator.validate(&ctx);
        warnings.extend(result.warnings);

        match result.decision {
            Decision::Block => {
                return ChainOutcome {
                    decision: Decision::Block,
                    final_quantity: rust_decimal::Decimal::ZERO,
                    blocked_by: Some(validator.name()),
                    reason: result.reason,
                    warnings,
                };
            }
            Decision::Reduce => {
                if let Some(adjusted) = result.adjusted_quantity {
                    quantity = adjusted;
                    ctx.quantity = quantity;
                    ctx.order_value = quantity * ctx.signal.entry_price;
                }
            }
            Decision::Allow => {}
        }
    }

    ChainOutcome {
        decision: Decision::Allow,
        final_quantity: quantity,
        blocked_by: None,
        reason: None,
        warnings,
    }
}
