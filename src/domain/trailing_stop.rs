//! Trailing-Stop Engine. Holds per-position state and, on each price tick,
//! ratchets the stop in the trade's favor and never against it. This never
//! touches a broker directly -- it reports the stop level the order-
//! management layer should translate into a modify-order request.

use crate::domain::signal::Direction;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct TrailingStopState {
    pub position_id: String,
    pub symbol: String,
    pub side: Direction,
    pub entry_price: Decimal,
    pub initial_stop: Decimal,
    pub current_stop: Decimal,
    pub highest_price: Decimal,
    pub lowest_price: Decimal,
    pub activated: bool,
    pub last_update: i64,
}

impl TrailingStopState {
    pub fn new(position_id: String, symbol: String, side: Direction, entry_price: Decimal, initial_stop: Decimal, now_ms: i64) -> Self {
        Self {
            position_id,
            symbol,
            side,
            entry_price,
            initial_stop,
            current_stop: initial_stop,
            highest_price: entry_price,
            lowest_price: entry_price,
            activated: false,
            last_update: now_ms,
        }
    }

    fn profit_pct(&self, current_price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        match self.side {
            Direction::Long => (current_price - self.entry_price) / self.entry_price,
            Direction::Short => (self.entry_price - current_price) / self.entry_price,
            Direction::Neutral => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrailingStopConfig {
    pub enabled: bool,
    /// Fraction of current price to trail by once activated.
    pub trail_pct: f64,
    /// Fraction profit required before the trail activates.
    pub activation_pct: f64,
    /// Floor on how tight the trail may sit relative to entry.
    pub min_trail_pct: f64,
}

impl Default for TrailingStopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trail_pct: 0.01,
            activation_pct: 0.005,
            min_trail_pct: 0.002,
        }
    }
}

/// Advances `state` one price tick. Returns `true` if the stop was
/// triggered (the position should be closed at market).
///
/// Order of operations per tick: update the high/low watermark, check for
/// activation, then -- only once activated -- compute a candidate stop and
/// commit it only if it is strictly favorable (the ratchet invariant).
pub fn on_price_tick(state: &mut TrailingStopState, current_price: Decimal, config: &TrailingStopConfig, now_ms: i64) -> bool {
    state.last_update = now_ms;

    match state.side {
        Direction::Long => {
            if current_price > state.highest_price {
                state.highest_price = current_price;
            }
        }
        Direction::Short => {
            if current_price < state.lowest_price || state.lowest_price.is_zero() {
                state.lowest_price = current_price;
            }
        }
        Direction::Neutral => {}
    }

    if !config.enabled {
        return check_trigger(state, current_price);
    }

    let profit_pct = state.profit_pct(current_price);
    let activation_pct = Decimal::try_from(config.activation_pct).unwrap_or_default();
    if !state.activated && profit_pct >= activation_pct {
        state.activated = true;
    }

    if state.activated {
        let trail_pct = Decimal::try_from(config.trail_pct).unwrap_or_default();
        let min_trail_pct = Decimal::try_from(config.min_trail_pct).unwrap_or_default();

        match state.side {
            Direction::Long => {
                let trailing_price = state.highest_price.max(current_price);
                let candidate = (trailing_price - current_price * trail_pct)
                    .max(state.entry_price * (Decimal::ONE + min_trail_pct))
                    .max(state.initial_stop);
                if candidate > state.current_stop {
                    state.current_stop = candidate;
                }
            }
            Direction::Short => {
                let trailing_price = if state.lowest_price.is_zero() {
                    current_price
                } else {
                    state.lowest_price.min(current_price)
                };
                let candidate = (trailing_price + current_price * trail_pct)
                    .min(state.entry_price * (Decimal::ONE - min_trail_pct))
                    .min(state.initial_stop);
                if candidate < state.current_stop {
                    state.current_stop = candidate;
                }
            }
            Direction::Neutral => {}
        }
    }

    check_trigger(state, current_price)
}

fn check_trigger(state: &TrailingStopState, current_price: Decimal) -> bool {
    match state.side {
        Direction::Long => current_price <= state.current_stop,
        Direction::Short => current_price >= state.current_stop,
        Direction::Neutral => false,
    }
}
