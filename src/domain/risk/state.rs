use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Singleton mutable risk state. There is exactly one row of this (id
/// "global"); the Risk Manager is the only writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub id: String,
    pub start_of_day_equity: Decimal,
    pub start_of_week_equity: Decimal,
    pub peak_equity: Decimal,
    pub current_equity: Decimal,
    pub consecutive_losses: u32,
    pub consecutive_wins: u32,
    pub today_trade_count: u32,
    pub day_trades_used: u32,
    pub circuit_breaker_triggered: bool,
    /// `None` for an indefinite halt (DAILY_LOSS/WEEKLY_LOSS); `Some(ms)`
    /// for a cooldown-timed halt (DRAWDOWN/CONSECUTIVE_LOSSES/MANUAL).
    pub circuit_breaker_until: Option<i64>,
    pub circuit_breaker_reason: Option<String>,
    pub trading_day: NaiveDate,
    pub last_updated: i64,
}

impl RiskState {
    pub fn new(starting_equity: Decimal, today: NaiveDate, now_ms: i64) -> Self {
        Self {
            id: "global".to_string(),
            start_of_day_equity: starting_equity,
            start_of_week_equity: starting_equity,
            peak_equity: starting_equity,
            current_equity: starting_equity,
            consecutive_losses: 0,
            consecutive_wins: 0,
            today_trade_count: 0,
            day_trades_used: 0,
            circuit_breaker_triggered: false,
            circuit_breaker_until: None,
            circuit_breaker_reason: None,
            trading_day: today,
            last_updated: now_ms,
        }
    }

    pub fn daily_pnl(&self) -> Decimal {
        self.current_equity - self.start_of_day_equity
    }

    pub fn daily_pnl_pct(&self) -> f64 {
        pct_of(self.daily_pnl(), self.start_of_day_equity)
    }

    pub fn weekly_pnl(&self) -> Decimal {
        self.current_equity - self.start_of_week_equity
    }

    pub fn weekly_pnl_pct(&self) -> f64 {
        pct_of(self.weekly_pnl(), self.start_of_week_equity)
    }

    pub fn drawdown(&self) -> Decimal {
        self.peak_equity - self.current_equity
    }

    pub fn drawdown_pct(&self) -> f64 {
        pct_of(self.drawdown(), self.peak_equity)
    }

    pub fn day_trades_remaining(&self, max_day_trades: u32) -> u32 {
        max_day_trades.saturating_sub(self.day_trades_used)
    }

    /// Updates `currentEquity` and ratchets `peakEquity`; never called with
    /// a roll to a new day, that's `roll_to_new_day`'s job.
    pub fn update_equity(&mut self, equity: Decimal, now_ms: i64) {
        self.current_equity = equity;
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        self.last_updated = now_ms;
    }

    pub fn record_trade_result(&mut self, pnl: Decimal, now_ms: i64) {
        self.today_trade_count += 1;
        if pnl > Decimal::ZERO {
            self.consecutive_wins += 1;
            self.consecutive_losses = 0;
        } else if pnl < Decimal::ZERO {
            self.consecutive_losses += 1;
            self.consecutive_wins = 0;
        }
        self.last_updated = now_ms;
    }

    /// Resets the daily reference point; called once per new trading day.
    /// `start_of_week_equity` only resets on a Monday rollover.
    pub fn roll_to_new_day(&mut self, today: NaiveDate, is_new_week: bool, now_ms: i64) {
        self.start_of_day_equity = self.current_equity;
        if is_new_week {
            self.start_of_week_equity = self.current_equity;
        }
        self.today_trade_count = 0;
        self.day_trades_used = 0;
        self.trading_day = today;
        self.last_updated = now_ms;
    }
}

fn pct_of(numerator: Decimal, denominator: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    if denominator.is_zero() {
        return 0.0;
    }
    (numerator / denominator).to_f64().unwrap_or(0.0) * 100.0
}
