use crate::domain::errors::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Risk management configuration. Every percentage is a fraction (0.02 ==
/// 2%), matching the engine's other config surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_position_size_pct: f64,
    pub max_daily_loss_pct: f64,
    pub max_weekly_loss_pct: f64,
    pub max_drawdown_pct: f64,
    pub consecutive_loss_limit: usize,
    /// Cooldown applied to non-loss-duration circuit breaker triggers
    /// (DRAWDOWN, CONSECUTIVE_LOSSES, MANUAL). DAILY_LOSS/WEEKLY_LOSS
    /// trigger an indefinite halt instead (see `CircuitBreaker`).
    pub cooldown_minutes: i64,
    pub min_order_value: Decimal,
    pub max_order_value: Decimal,
    /// Signals below this strength are suppressed before reaching the risk
    /// manager.
    pub min_strength: f64,
    pub signal_ttl_ms: i64,
    pub max_concurrent_positions: usize,
    /// Pattern day trading limit over a rolling 5 trading-day window.
    pub max_day_trades: u32,
    /// Day trades held back as a buffer before the PDT check blocks; the
    /// chain blocks once `day_trades_used + 1 > max_day_trades -
    /// pdt_reserve_day_trades`, not only once the raw limit is hit.
    pub pdt_reserve_day_trades: u32,
    /// Fraction of equity risked per trade; position sizing divides this by
    /// the signal's stop distance to get quantity.
    pub risk_per_trade_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size_pct: 0.10,
            max_daily_loss_pct: 0.03,
            max_weekly_loss_pct: 0.07,
            max_drawdown_pct: 0.15,
            consecutive_loss_limit: 4,
            cooldown_minutes: 60,
            min_order_value: Decimal::new(500, 0),
            max_order_value: Decimal::new(50_000, 0),
            min_strength: 0.6,
            signal_ttl_ms: 5 * 60 * 1000,
            max_concurrent_positions: 5,
            max_day_trades: 3,
            pdt_reserve_day_trades: 0,
            risk_per_trade_pct: 0.01,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_position_size_pct <= 0.0 || self.max_position_size_pct > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "max_position_size_pct must be in (0, 1], got {}",
                self.max_position_size_pct
            )));
        }
        if self.max_daily_loss_pct <= 0.0 || self.max_daily_loss_pct > 0.5 {
            return Err(ConfigError::Invalid(format!(
                "max_daily_loss_pct must be in (0, 0.5], got {}",
                self.max_daily_loss_pct
            )));
        }
        if self.max_weekly_loss_pct <= 0.0 || self.max_weekly_loss_pct > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "max_weekly_loss_pct must be in (0, 1], got {}",
                self.max_weekly_loss_pct
            )));
        }
        if self.max_drawdown_pct <= 0.0 || self.max_drawdown_pct > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "max_drawdown_pct must be in (0, 1], got {}",
                self.max_drawdown_pct
            )));
        }
        if self.consecutive_loss_limit == 0 {
            return Err(ConfigError::Invalid("consecutive_loss_limit must be > 0".into()));
        }
        // Open question: minOrderValue > maxOrderValue is a startup error,
        // not silently clamped.
        if self.min_order_value > self.max_order_value {
            return Err(ConfigError::Invalid(format!(
                "min_order_value ({}) exceeds max_order_value ({})",
                self.min_order_value, self.max_order_value
            )));
        }
        if self.pdt_reserve_day_trades > self.max_day_trades {
            return Err(ConfigError::Invalid(format!(
                "pdt_reserve_day_trades ({}) exceeds max_day_trades ({})",
                self.pdt_reserve_day_trades, self.max_day_trades
            )));
        }
        if self.max_concurrent_positions == 0 {
            return Err(ConfigError::Invalid("max_concurrent_positions must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.min_strength) {
            return Err(ConfigError::Invalid(format!(
                "min_strength must be in [0, 1], got {}",
                self.min_strength
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RiskConfig::default().validate().is_ok());
    }

    #[test]
    fn min_order_value_above_max_is_rejected() {
        let mut cfg = RiskConfig::default();
        cfg.min_order_value = Decimal::new(60_000, 0);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_consecutive_loss_limit_is_rejected() {
        let mut cfg = RiskConfig::default();
        cfg.consecutive_loss_limit = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_pct_is_rejected() {
        let mut cfg = RiskConfig::default();
        cfg.max_drawdown_pct = 1.5;
        assert!(cfg.validate().is_err());
    }
}
