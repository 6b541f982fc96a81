use crate::domain::risk::circuit_breaker::CircuitBreakerState;
use crate::domain::risk::risk_config::RiskConfig;
use crate::domain::risk::state::RiskState;
use crate::domain::signal::Signal;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reduce,
    Block,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub decision: Decision,
    /// Set only on `Reduce`: the quantity the chain should continue with
    /// instead of the signal's requested size.
    pub adjusted_quantity: Option<Decimal>,
    /// Set only on `Block`.
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            adjusted_quantity: None,
            reason: None,
            warnings: Vec::new(),
        }
    }

    pub fn reduce(quantity: Decimal, warning: impl Into<String>) -> Self {
        Self {
            decision: Decision::Reduce,
            adjusted_quantity: Some(quantity),
            reason: None,
            warnings: vec![warning.into()],
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Block,
            adjusted_quantity: None,
            reason: Some(reason.into()),
            warnings: Vec::new(),
        }
    }
}

/// Everything one validator needs to judge a candidate order. `quantity` is
/// the size computed so far by the chain (the sizing stage's output, then
/// any upstream validator's `Reduce`), not necessarily the signal's.
pub struct ValidationContext<'a> {
    pub signal: &'a Signal,
    pub quantity: Decimal,
    pub order_value: Decimal,
    pub equity: Decimal,
    pub buying_power: Decimal,
    pub open_position_count: usize,
    pub state: &'a RiskState,
    pub config: &'a RiskConfig,
    pub circuit_breaker_state: CircuitBreakerState,
    pub now_ms: i64,
}

pub trait RiskValidator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower runs first. The circuit breaker gate is 0; later gates get
    /// progressively higher numbers so the chain fails fast on the
    /// cheapest, most disqualifying checks.
    fn priority(&self) -> u32;

    fn is_enabled(&self, _config: &RiskConfig) -> bool {
        true
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationResult;
}
