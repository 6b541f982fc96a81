// Risk management domain
pub mod circuit_breaker;
pub mod filters;
pub mod manager;
pub mod risk_config;
pub mod state;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerState, TriggerType};
pub use manager::{RiskDecision, RiskManager};
pub use risk_config::RiskConfig;
pub use state::RiskState;
