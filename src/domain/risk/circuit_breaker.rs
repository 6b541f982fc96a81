//! Circuit breaker state machine: CLOSED -> OPEN -> RESETTABLE -> CLOSED.
//! Cooldown elapsing moves OPEN to RESETTABLE automatically; moving
//! RESETTABLE back to CLOSED always takes an explicit `reset` call, so a
//! halted engine never silently resumes trading.

use super::risk_config::RiskConfig;
use super::state::RiskState;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    Closed,
    Open,
    Resettable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    DailyLoss,
    WeeklyLoss,
    Drawdown,
    ConsecutiveLosses,
    Manual,
}

impl TriggerType {
    /// DAILY_LOSS/WEEKLY_LOSS halt indefinitely (only a new trading
    /// day/week clears them via `roll_to_new_day`); the rest serve a timed
    /// cooldown.
    pub fn is_indefinite(&self) -> bool {
        matches!(self, TriggerType::DailyLoss | TriggerType::WeeklyLoss)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            TriggerType::DailyLoss => "daily loss limit breached",
            TriggerType::WeeklyLoss => "weekly loss limit breached",
            TriggerType::Drawdown => "max drawdown from peak equity breached",
            TriggerType::ConsecutiveLosses => "consecutive loss limit reached",
            TriggerType::Manual => "manually triggered",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreaker {
    pub cooldown_minutes: i64,
}

impl CircuitBreaker {
    pub fn new(cooldown_minutes: i64) -> Self {
        Self { cooldown_minutes }
    }

    /// Checks `state` against `config`'s thresholds without mutating
    /// anything; the first breached condition wins, evaluated in severity
    /// order (loss limits before drawdown before streak).
    pub fn check_triggers(&self, state: &RiskState, config: &RiskConfig) -> Option<TriggerType> {
        if state.daily_pnl() < Decimal::ZERO && state.daily_pnl_pct().abs() >= config.max_daily_loss_pct * 100.0 {
            return Some(TriggerType::DailyLoss);
        }
        if state.weekly_pnl() < Decimal::ZERO && state.weekly_pnl_pct().abs() >= config.max_weekly_loss_pct * 100.0
        {
            return Some(TriggerType::WeeklyLoss);
        }
        if state.drawdown_pct() >= config.max_drawdown_pct * 100.0 {
            return Some(TriggerType::Drawdown);
        }
        if state.consecutive_losses as usize >= config.consecutive_loss_limit {
            return Some(TriggerType::ConsecutiveLosses);
        }
        None
    }

    pub fn trip(&self, state: &mut RiskState, trigger: TriggerType, now_ms: i64) {
        state.circuit_breaker_triggered = true;
        state.circuit_breaker_reason = Some(trigger.reason().to_string());
        state.circuit_breaker_until = if trigger.is_indefinite() {
            None
        } else {
            Some(now_ms + self.cooldown_minutes * 60_000)
        };
    }

    pub fn current_state(&self, state: &RiskState, now_ms: i64) -> CircuitBreakerState {
        if !state.circuit_breaker_triggered {
            return CircuitBreakerState::Closed;
        }
        match state.circuit_breaker_until {
            None => CircuitBreakerState::Open,
            Some(until) if now_ms < until => CircuitBreakerState::Open,
            Some(_) => CircuitBreakerState::Resettable,
        }
    }

    /// Clears the breaker unconditionally. Callers should check
    /// `current_state` is `Resettable` first; this method itself does not
    /// enforce that so a MANUAL override (e.g. an operator command) can
    /// still force a reset out of OPEN.
    pub fn reset(&self, state: &mut RiskState) {
        state.circuit_breaker_triggered = false;
        state.circuit_breaker_until = None;
        state.circuit_breaker_reason = None;
    }
}
