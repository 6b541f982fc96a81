//! Domain error taxonomy.
//!
//! Mirrors the error kinds named in the engine's error-handling design: each
//! concern gets its own `thiserror` enum rather than one grab-bag type, so
//! callers can match on what actually went wrong instead of parsing strings.

use rust_decimal::Decimal;
use thiserror::Error;

/// Raised by indicators and strategies. Never propagated as a hard failure —
/// the Signal Manager swallows it and skips the symbol for the tick.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("insufficient data: need {need} bars, have {have}")]
    InsufficientData { need: usize, have: usize },
}

/// Startup / update-time configuration failures. Refuse to start rather than
/// run with an invalid risk posture.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Risk-state and risk-manager invariant failures that are not themselves a
/// BLOCK decision (those are returned as data, not errors) but indicate the
/// engine is being asked to evaluate against corrupt or impossible state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskError {
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
    #[error("equity must be positive, got {equity}")]
    NonPositiveEquity { equity: Decimal },
}

/// Broker adapter failures. Only `OrderRejected` is allowed to propagate past
/// an adapter boundary uncaught; the rest are handled by the retry policy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrokerError {
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("authentication failed: {0}")]
    AuthError(String),
    #[error("order rejected: {0}")]
    OrderRejected(String),
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("unrecognized broker response shape: {0}")]
    InvalidResponse(String),
}

/// Repository failures. Always surfaced, never swallowed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("storage error: {0}")]
    Failed(String),
}
